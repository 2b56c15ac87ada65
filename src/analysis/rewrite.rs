use crate::elements::{Element, ElementKind};
use crate::error::{AnalyseError, SimError};
use crate::sim::{Link, ModelBuilder, NamedSignal, NodeId, SignalId};
use tracing::debug;

type Result<T> = std::result::Result<T, AnalyseError>;

/// Truth tables of more inputs than this are refused.
pub const MAX_INPUTS_ALLOWED: usize = 24;
/// Every output becomes one bit of a 64 bit row word in the hex export.
pub const MAX_OUTPUTS_ALLOWED: usize = 64;

/// Runs rewrite `pass` and logs how it changed the size of the circuit.
pub(super) fn run_pass<T, F>(b: &mut ModelBuilder, pass: F, name: &'static str) -> Result<T>
where
    F: FnOnce(&mut ModelBuilder) -> Result<T>,
{
    let old_len = b.len();
    let result = pass(b)?;
    debug!(
        pass = name,
        old_size = old_len,
        new_size = b.len(),
        "analysis rewrite"
    );
    Ok(result)
}

/// Runs every rewrite, in order, leaving a circuit without any state and only 1 bit
/// inputs and outputs.
pub(super) fn rewrite(b: &mut ModelBuilder) -> Result<()> {
    run_pass(b, single_clock_pass, "single clock")?;
    run_pass(b, replace_jk_pass, "jk flip-flop replacement")?;
    run_pass(b, replace_t_pass, "t flip-flop replacement")?;
    run_pass(b, binary_inputs_pass, "input splitting")?;
    run_pass(b, unique_inputs_pass, "unique inputs")?;
    run_pass(b, binary_outputs_pass, "output splitting")?;
    run_pass(b, only_d_flip_flops_pass, "state check")?;
    let flip_flops = run_pass(b, explode_flip_flops_pass, "flip-flop explosion")?;
    run_pass(
        b,
        |b| turn_off_flip_flops_pass(b, flip_flops),
        "flip-flop removal",
    )?;
    check_counts(b)
}

/// Returns the only clock of the circuit.
fn the_clock(b: &ModelBuilder) -> Result<SignalId> {
    match b.clocks() {
        [clock] => Ok(clock.signal),
        clocks => Err(AnalyseError::SingleClockNecessary {
            found: clocks.len(),
        }),
    }
}

/// Checks that the clock input of flip-flop `node` is the clock of the circuit.
fn check_clock(b: &ModelBuilder, node: NodeId, clock_port: usize) -> Result<()> {
    let clock = the_clock(b)?;
    let n = b.node(node)?;
    if n.inputs[clock_port] != clock {
        return Err(AnalyseError::FlipFlopNeedsClock {
            label: n.name().to_string(),
        });
    }
    Ok(())
}

fn nodes_of_kind<F: Fn(&ElementKind) -> bool>(b: &ModelBuilder, f: F) -> Vec<NodeId> {
    b.nodes
        .iter()
        .filter(|(_, n)| f(n.kind()))
        .map(|(i, _)| i.into())
        .collect()
}

pub(super) fn single_clock_pass(b: &mut ModelBuilder) -> Result<()> {
    if b.clocks().len() > 1 {
        return Err(AnalyseError::SingleClockNecessary {
            found: b.clocks().len(),
        });
    }
    Ok(())
}

/// Replaces every JK flip-flop with a D flip-flop fed by `(J & ~Q) | (~K & Q)`.
pub(super) fn replace_jk_pass(b: &mut ModelBuilder) -> Result<()> {
    for node in nodes_of_kind(b, |k| matches!(k, ElementKind::JkFlipFlop)) {
        check_clock(b, node, 1)?;
        let (j, c, k) = {
            let n = b.node(node)?;
            (n.inputs[0], n.inputs[1], n.inputs[2])
        };
        let (q, nq) = {
            let n = b.node(node)?;
            (n.outputs[0], n.outputs[1])
        };
        let element = b.remove_node(node).ok_or(SimError::UnknownNode { node })?;

        let set = b.and2(j, nq)?;
        let nk = b.not(k)?;
        let hold = b.and2(nk, q)?;
        let d = b.or2(set, hold)?;
        b.add_wired(
            Element::new(ElementKind::DFlipFlop).label(element.label),
            &[d, c],
            &[q, nq],
        )?;
    }
    Ok(())
}

/// Replaces every T flip-flop with a D flip-flop fed by `T ^ Q`, or `~Q` if it has no
/// enable input.
pub(super) fn replace_t_pass(b: &mut ModelBuilder) -> Result<()> {
    for node in nodes_of_kind(b, |k| matches!(k, ElementKind::TFlipFlop { .. })) {
        let enable = matches!(b.node(node)?.kind(), ElementKind::TFlipFlop { enable: true });
        let clock_port = enable as usize;
        check_clock(b, node, clock_port)?;
        let (inputs, q, nq) = {
            let n = b.node(node)?;
            (n.inputs.clone(), n.outputs[0], n.outputs[1])
        };
        let element = b.remove_node(node).ok_or(SimError::UnknownNode { node })?;

        let d = if enable { b.xor2(inputs[0], q)? } else { nq };
        b.add_wired(
            Element::new(ElementKind::DFlipFlop).label(element.label),
            &[d, inputs[clock_port]],
            &[q, nq],
        )?;
    }
    Ok(())
}

/// Replaces every multi bit input with 1 bit inputs `name0`, `name1`... combined into
/// the original signal.
pub(super) fn binary_inputs_pass(b: &mut ModelBuilder) -> Result<()> {
    let inputs = std::mem::take(&mut b.names.inputs);
    for input in inputs {
        let bits = b.signal_ref(input.signal).bits();
        if bits == 1 {
            b.names.inputs.push(input);
            continue;
        }
        let mut parts = Vec::with_capacity(bits as usize);
        for i in 0..bits {
            let name = format!("{}{}", input.name, i);
            let part = b.signal(name.clone(), 1)?;
            b.names.inputs.push(NamedSignal::new(name, part));
            parts.push(part);
        }
        b.driven[input.signal.0] = false;
        b.add_wired(ElementKind::n_to_one(bits), &parts, &[input.signal])?;
    }
    Ok(())
}

pub(super) fn unique_inputs_pass(b: &mut ModelBuilder) -> Result<()> {
    let inputs = b.inputs();
    for (i, input) in inputs.iter().enumerate() {
        if inputs[i + 1..].iter().any(|other| other.name == input.name) {
            return Err(AnalyseError::VariableUsedTwice {
                name: input.name.clone(),
            });
        }
    }
    Ok(())
}

/// Replaces every multi bit output with 1 bit outputs `name0`, `name1`... split off the
/// original signal.
pub(super) fn binary_outputs_pass(b: &mut ModelBuilder) -> Result<()> {
    let outputs = std::mem::take(&mut b.names.outputs);
    for output in outputs {
        let bits = b.signal_ref(output.signal).bits();
        if bits == 1 {
            b.names.outputs.push(output);
            continue;
        }
        let (_, parts) = b.add(ElementKind::one_to_n(bits), &[output.signal])?;
        for (i, part) in parts.iter().enumerate() {
            let name = format!("{}{}", output.name, i);
            b.signals[part.0].rename(name.clone());
            b.names.outputs.push(NamedSignal::new(name, *part));
        }
    }
    Ok(())
}

pub(super) fn only_d_flip_flops_pass(b: &mut ModelBuilder) -> Result<()> {
    for (_, node) in b.nodes.iter() {
        if node.has_state() && !matches!(node.kind(), ElementKind::DFlipFlop) {
            return Err(AnalyseError::CannotAnalyse {
                kind: node.kind().name(),
            });
        }
    }
    Ok(())
}

/// Splits every multi bit D flip-flop into 1 bit flip-flops labeled `label0`, `label1`...
///
/// Returns every D flip-flop of the circuit, all of them 1 bit wide.
pub(super) fn explode_flip_flops_pass(b: &mut ModelBuilder) -> Result<Vec<NodeId>> {
    let mut flip_flops = Vec::new();
    for node in nodes_of_kind(b, |k| matches!(k, ElementKind::DFlipFlop)) {
        let bits = b.node(node)?.element.bits;
        if bits == 1 {
            flip_flops.push(node);
            continue;
        }
        check_clock(b, node, 1)?;
        let (d, clock, q, nq) = {
            let n = b.node(node)?;
            (n.inputs[0], n.inputs[1], n.outputs[0], n.outputs[1])
        };
        let element = b.remove_node(node).ok_or(SimError::UnknownNode { node })?;

        let (_, ds) = b.add(ElementKind::one_to_n(bits), &[d])?;
        let mut qs = Vec::with_capacity(bits as usize);
        let mut nqs = Vec::with_capacity(bits as usize);
        for (i, d) in ds.iter().enumerate() {
            let label = format!("{}{}", element.label, i);
            let (ff, outputs) = b.add(
                Element::new(ElementKind::DFlipFlop).label(label),
                &[*d, clock],
            )?;
            qs.push(outputs[0]);
            nqs.push(outputs[1]);
            flip_flops.push(ff);
        }
        b.add_wired(ElementKind::n_to_one(bits), &qs, &[q])?;
        b.add_wired(ElementKind::n_to_one(bits), &nqs, &[nq])?;
    }
    Ok(flip_flops)
}

/// Removes the 1 bit D flip-flops: Q becomes the input variable `labeln`, D the output
/// `labeln+1` and ~Q is derived from Q.
pub(super) fn turn_off_flip_flops_pass(b: &mut ModelBuilder, flip_flops: Vec<NodeId>) -> Result<()> {
    for (i, node) in flip_flops.into_iter().enumerate() {
        check_clock(b, node, 1)?;
        let (d, q, nq) = {
            let n = b.node(node)?;
            (n.inputs[0], n.outputs[0], n.outputs[1])
        };
        let element = b.remove_node(node).ok_or(SimError::UnknownNode { node })?;

        let mut label = element.label;
        if label.is_empty() {
            return Err(AnalyseError::FlipFlopWithoutLabel);
        }
        if !label.ends_with('n') {
            label.push('n');
        }

        b.names
            .outputs
            .insert(i, NamedSignal::new(format!("{}+1", label), d));
        if b.inputs().iter().any(|input| input.name == label) {
            return Err(AnalyseError::VariableUsedTwice { name: label });
        }
        b.names.inputs.push(NamedSignal::new(label, q));
        b.driven[q.0] = true;
        b.link(q, nq, Link::invert)?;
    }
    Ok(())
}

fn check_counts(b: &ModelBuilder) -> Result<()> {
    let inputs = b.inputs().len();
    if inputs == 0 {
        return Err(AnalyseError::NoInputs);
    }
    if inputs > MAX_INPUTS_ALLOWED {
        return Err(AnalyseError::TooManyInputs {
            max: MAX_INPUTS_ALLOWED,
            found: inputs,
        });
    }
    let outputs = b.outputs().len();
    if outputs == 0 {
        return Err(AnalyseError::NoOutputs);
    }
    if outputs > MAX_OUTPUTS_ALLOWED {
        return Err(AnalyseError::TooManyOutputs {
            max: MAX_OUTPUTS_ALLOWED,
            found: outputs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Model, SimConfig};

    /// Runs `m` through every combination of `inputs`, two clock edges each, and records
    /// the outputs.
    fn clocked_trace(m: &mut Model, inputs: &[SignalId], outputs: &[SignalId]) -> Vec<Vec<u64>> {
        let mut trace = Vec::new();
        for row in 0..1u64 << inputs.len() {
            for (i, input) in inputs.iter().enumerate() {
                m.set_value(*input, (row >> i) & 1).unwrap();
            }
            m.do_step().unwrap();
            for _ in 0..2 {
                m.toggle_clocks().unwrap();
                m.toggle_clocks().unwrap();
                trace.push(outputs.iter().map(|o| m.value(*o)).collect());
            }
        }
        trace
    }

    fn compare_rewrite(kind: ElementKind, inputs: usize, pass: fn(&mut ModelBuilder) -> Result<()>) {
        let mut b = ModelBuilder::new();
        let c = b.clock("C").unwrap();
        let ins: Vec<SignalId> = (0..inputs)
            .map(|i| b.input(format!("i{}", i), 1).unwrap())
            .collect();
        let mut ports = ins.clone();
        let clock_port = if inputs == 0 { 0 } else { 1 };
        ports.insert(clock_port, c);
        let (_, outs) = b.add(Element::new(kind).label("ff"), &ports).unwrap();

        let mut rewritten = b.clone();
        pass(&mut rewritten).unwrap();
        assert!(nodes_of_kind(&rewritten, |k| matches!(k, ElementKind::DFlipFlop)).len() == 1);

        let mut native = b.build(SimConfig::default());
        native.init().unwrap();
        let mut replaced = rewritten.build(SimConfig::default());
        replaced.init().unwrap();

        let expected = clocked_trace(&mut native, &ins, &outs);
        assert_eq!(clocked_trace(&mut replaced, &ins, &outs), expected);
    }

    #[test]
    fn test_jk_rewrite_equivalence() {
        compare_rewrite(ElementKind::JkFlipFlop, 2, replace_jk_pass);
    }

    #[test]
    fn test_t_rewrite_equivalence() {
        compare_rewrite(ElementKind::TFlipFlop { enable: true }, 1, replace_t_pass);
        compare_rewrite(ElementKind::TFlipFlop { enable: false }, 0, replace_t_pass);
    }

    #[test]
    fn test_flip_flop_needs_clock() {
        let mut b = ModelBuilder::new();
        b.clock("C").unwrap();
        let j = b.input("J", 1).unwrap();
        let other = b.input("other", 1).unwrap();
        b.add(
            Element::new(ElementKind::JkFlipFlop).label("ff"),
            &[j, other, j],
        )
        .unwrap();
        assert_eq!(
            replace_jk_pass(&mut b),
            Err(AnalyseError::FlipFlopNeedsClock { label: "ff".into() })
        );
    }

    #[test]
    fn test_binary_inputs_and_outputs() {
        let mut b = ModelBuilder::new();
        let x = b.input("X", 3).unwrap();
        let y = b.not(x).unwrap();
        b.output("Y", y);
        binary_inputs_pass(&mut b).unwrap();
        binary_outputs_pass(&mut b).unwrap();

        let names: Vec<_> = b.inputs().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["X0", "X1", "X2"]);
        let names: Vec<_> = b.outputs().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Y0", "Y1", "Y2"]);

        let inputs: Vec<_> = b.inputs().iter().map(|i| i.signal).collect();
        let outputs: Vec<_> = b.outputs().iter().map(|o| o.signal).collect();
        let mut m = b.build(SimConfig::default());
        m.init().unwrap();
        m.set_value(inputs[1], 1).unwrap();
        m.do_step().unwrap();
        assert_eq!(m.value(x), 0b010);
        let bits: Vec<_> = outputs.iter().map(|o| m.value(*o)).collect();
        assert_eq!(bits, [1, 0, 1]);
    }
}
