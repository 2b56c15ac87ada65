use super::config::SimConfig;
use super::handles::*;
use super::net::Link;
use super::node::{Inputs, Node, Outputs};
use super::signal::{check_width, Signal, Value};
use super::Model;
use crate::data_structures::Slab;
use crate::elements::{Element, ElementKind, GateType, Ports};
use crate::error::{Result, SimError};
use casey::pascal;
use concat_idents::concat_idents;
use tracing::debug;

use GateType::*;

/// Creates gatename2 and gatenamex constructors for every fan in gate.
/// The constructors create gates with 2 and n inputs respectively.
macro_rules! gate_constructors {
    ($name:ident,$($rest:ident),*) => {
        gate_constructors!($name);
        gate_constructors!($($rest),*);
    };
    ($name:ident) => {
        concat_idents!(name2 = $name, 2 {
            /// Returns the output of a new gate with inputs `a` and `b`, as wide as `a`.
            pub fn name2(&mut self, a: SignalId, b: SignalId) -> Result<SignalId> {
                self.gate(pascal!($name), &[a, b])
            }
        });

        concat_idents!(namex = $name, x {
            /// Returns the output of a new gate with one input per signal in `inputs`,
            /// as wide as the first one.
            pub fn namex(&mut self, inputs: &[SignalId]) -> Result<SignalId> {
                self.gate(pascal!($name), inputs)
            }
        });
    };
}

/// A clock source, a 1 bit signal toggled from outside the model.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Clock {
    pub label: String,
    pub signal: SignalId,
    /// Frequency in Hz if the clock runs in real time.
    pub frequency: Option<u32>,
}

/// Signals registered under a name.
#[derive(Clone, Debug, Default)]
pub(crate) struct Names {
    pub inputs: Vec<NamedSignal>,
    pub outputs: Vec<NamedSignal>,
    pub probes: Vec<NamedSignal>,
    pub clocks: Vec<Clock>,
}

/// Wires a circuit together and turns it into a [Model].
///
/// Every connection is validated when it is made, widths and input counts have to match
/// the element and a signal may only have a single writer.
///
/// # Example
/// ```
/// # use digisim::{ModelBuilder, SimConfig};
/// let mut b = ModelBuilder::new();
/// let a = b.input("A", 1).unwrap();
/// let c = b.input("B", 1).unwrap();
/// let y = b.and2(a, c).unwrap();
/// b.output("Y", y);
///
/// let mut model = b.build(SimConfig::default());
/// model.init().unwrap();
///
/// model.set_input("A", 1).unwrap();
/// model.set_input("B", 1).unwrap();
/// model.do_step().unwrap();
/// assert_eq!(model.value(y), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    pub(crate) signals: Vec<Signal>,
    pub(crate) driven: Vec<bool>,
    pub(crate) nodes: Slab<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) names: Names,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns a new undriven signal.
    pub fn signal<S: Into<String>>(&mut self, name: S, bits: u8) -> Result<SignalId> {
        let signal = Signal::try_new(name, bits)?;
        let id = SignalId(self.signals.len());
        self.signals.push(signal);
        self.driven.push(false);
        Ok(id)
    }

    /// Returns a new signal registered as a circuit input.
    ///
    /// Inputs count as driven, nothing else may write them.
    pub fn input<S: Into<String>>(&mut self, name: S, bits: u8) -> Result<SignalId> {
        let name = name.into();
        let id = self.signal(name.clone(), bits)?;
        self.driven[id.0] = true;
        self.names.inputs.push(NamedSignal::new(name, id));
        Ok(id)
    }

    /// Registers `signal` as a circuit output.
    pub fn output<S: Into<String>>(&mut self, name: S, signal: SignalId) {
        self.names.outputs.push(NamedSignal::new(name, signal));
    }

    /// Registers `signal` so it can be found by name while the model runs.
    pub fn probe<S: Into<String>>(&mut self, name: S, signal: SignalId) {
        self.names.probes.push(NamedSignal::new(name, signal));
    }

    /// Returns the output of a new clock, toggled by [Model::toggle_clocks].
    pub fn clock<S: Into<String>>(&mut self, label: S) -> Result<SignalId> {
        self.add_clock(label.into(), None)
    }

    /// Returns the output of a new clock running at `frequency` Hz, at least 1.
    pub fn real_time_clock<S: Into<String>>(
        &mut self,
        label: S,
        frequency: u32,
    ) -> Result<SignalId> {
        self.add_clock(label.into(), Some(frequency.max(1)))
    }

    fn add_clock(&mut self, label: String, frequency: Option<u32>) -> Result<SignalId> {
        let signal = self.signal(label.clone(), 1)?;
        self.driven[signal.0] = true;
        self.names.clocks.push(Clock {
            label,
            signal,
            frequency,
        });
        Ok(signal)
    }

    /// Returns the output of a new constant.
    pub fn constant(&mut self, value: u64, bits: u8) -> Result<SignalId> {
        let (_, outputs) = self.add(Element::new(ElementKind::Const { value }).bits(bits), &[])?;
        Ok(outputs[0])
    }

    /// Adds `element` reading from `inputs`, returns its [NodeId] and its new output signals.
    ///
    /// Output signals are named after the element, with the port name appended for
    /// elements with more than one output.
    pub fn add<E: Into<Element>>(
        &mut self,
        element: E,
        inputs: &[SignalId],
    ) -> Result<(NodeId, Outputs)> {
        let element = normalized(element.into());
        let ports = self.check_inputs(&element, inputs)?;

        let single = ports.outputs.len() == 1;
        let mut outputs = Outputs::new();
        for (port, bits) in ports.outputs.iter().enumerate() {
            let name = if single {
                element.name().to_string()
            } else {
                format!("{}.{}", element.name(), element.kind.output_name(port))
            };
            outputs.push(self.signal(name, *bits)?);
        }
        let node = self.insert(element, inputs.into(), outputs.clone());
        Ok((node, outputs))
    }

    /// Adds `element` reading from `inputs` and driving the existing signals in `outputs`.
    pub fn add_wired<E: Into<Element>>(
        &mut self,
        element: E,
        inputs: &[SignalId],
        outputs: &[SignalId],
    ) -> Result<NodeId> {
        let element = normalized(element.into());
        let ports = self.check_inputs(&element, inputs)?;
        if ports.outputs.len() != outputs.len() {
            return Err(SimError::OutputCountMismatch {
                node: element.name().to_string(),
                expected: ports.outputs.len(),
                found: outputs.len(),
            });
        }
        for (port, (output, bits)) in outputs.iter().zip(&ports.outputs).enumerate() {
            let signal = &self.signals[output.0];
            signal.check_bits(*bits, element.name(), port)?;
            if self.driven[output.0] {
                return Err(SimError::MultipleWriters {
                    signal: signal.name().to_string(),
                });
            }
        }
        Ok(self.insert(element, inputs.into(), outputs.into()))
    }

    fn check_inputs(
        &self,
        element: &Element,
        inputs: &[SignalId],
    ) -> Result<Ports> {
        check_width(element.bits as u32)?;
        let ports = element
            .kind
            .ports(element.bits, inputs.len(), element.name())?;
        for (port, (input, bits)) in inputs.iter().zip(&ports.inputs).enumerate() {
            self.signals[input.0].check_bits(*bits, element.name(), port)?;
        }
        Ok(ports)
    }

    fn insert(&mut self, element: Element, inputs: Inputs, outputs: Outputs) -> NodeId {
        for output in &outputs {
            self.driven[output.0] = true;
        }
        self.nodes.insert(Node::new(element, inputs, outputs)).into()
    }

    /// Connects input `port` of `node` to `signal`.
    pub fn set_input(&mut self, node: NodeId, port: usize, signal: SignalId) -> Result<()> {
        let bits = self.signals[signal.0].bits();
        let n = self
            .nodes
            .get_mut(node.into())
            .ok_or(SimError::UnknownNode { node })?;
        let ports = n
            .element
            .kind
            .ports(n.element.bits, n.inputs.len(), n.element.name())?;
        match ports.inputs.get(port) {
            Some(expected) if *expected == bits => {
                n.inputs[port] = signal;
                Ok(())
            }
            Some(expected) => Err(SimError::BitsMismatch {
                node: n.element.name().to_string(),
                port,
                expected: *expected,
                found: bits,
            }),
            None => Err(SimError::InputCountMismatch {
                node: n.element.name().to_string(),
                expected: ports.inputs.len(),
                found: port + 1,
            }),
        }
    }

    /// Removes `node`, its output signals stay and become undriven.
    pub fn remove_node(&mut self, node: NodeId) -> Option<Element> {
        let node = self.nodes.remove(node.into())?;
        for output in &node.outputs {
            self.driven[output.0] = false;
        }
        Some(node.element)
    }

    /// Derives `to` from `from`: whenever `from` changes `map` is applied and the result
    /// written to `to` immediately.
    pub fn link(&mut self, from: SignalId, to: SignalId, map: fn(Value) -> Value) -> Result<LinkId> {
        if self.driven[to.0] {
            return Err(SimError::MultipleWriters {
                signal: self.signals[to.0].name().to_string(),
            });
        }
        self.driven[to.0] = true;
        self.links.push(Link { from, to, map });
        Ok(LinkId(self.links.len() - 1))
    }

    fn gate(&mut self, ty: GateType, inputs: &[SignalId]) -> Result<SignalId> {
        let bits = inputs.first().map_or(1, |s| self.signals[s.0].bits());
        let (_, outputs) = self.add(Element::new(ElementKind::Gate(ty)).bits(bits), inputs)?;
        Ok(outputs[0])
    }

    gate_constructors!(and, or, nand, nor, xor, xnor);

    /// Returns the output of a new not gate, as wide as `a`.
    pub fn not(&mut self, a: SignalId) -> Result<SignalId> {
        let bits = self.signals[a.0].bits();
        let (_, outputs) = self.add(Element::new(ElementKind::Not).bits(bits), &[a])?;
        Ok(outputs[0])
    }

    pub fn signal_ref(&self, signal: SignalId) -> &Signal {
        &self.signals[signal.0]
    }

    /// Returns the element of `node`, if it still exists.
    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.into()).map(|n| &n.element)
    }

    pub(crate) fn node(&self, node: NodeId) -> Result<&Node> {
        self.nodes
            .get(node.into())
            .ok_or(SimError::UnknownNode { node })
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn inputs(&self) -> &[NamedSignal] {
        &self.names.inputs
    }

    pub fn outputs(&self) -> &[NamedSignal] {
        &self.names.outputs
    }

    pub fn clocks(&self) -> &[Clock] {
        &self.names.clocks
    }

    /// Returns a new [Model] created from `self`.
    ///
    /// Nodes are compacted in slot order: a slot freed by [ModelBuilder::remove_node] is
    /// taken by the next node added, so that node runs where the removed one was. Observers
    /// are registered in the same order, which keeps scheduling deterministic.
    pub fn build(self, config: SimConfig) -> Model {
        let ModelBuilder {
            mut signals,
            nodes,
            links,
            names,
            ..
        } = self;

        let slots = nodes.total_len();
        let nodes: Vec<Node> = nodes.into_iter().map(|(_, node)| node).collect();
        for signal in &mut signals {
            signal.clear_observers();
        }
        for (i, node) in nodes.iter().enumerate() {
            for (port, input) in node.inputs.iter().enumerate() {
                if node.kind().is_sensitive(port) {
                    signals[input.0].add_observer(Observer::Node(ni!(i)));
                }
            }
        }
        for (i, link) in links.iter().enumerate() {
            signals[link.from.0].add_observer(Observer::Link(LinkId(i)));
        }
        debug!(
            nodes = nodes.len(),
            freed = slots - nodes.len(),
            signals = signals.len(),
            links = links.len(),
            "built model"
        );

        Model::new(nodes, signals, links, names, config)
    }
}

/// Flip-flops with fixed width ignore the width they were given.
fn normalized(mut element: Element) -> Element {
    if matches!(
        element.kind,
        ElementKind::JkFlipFlop | ElementKind::TFlipFlop { .. }
    ) {
        element.bits = 1;
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Pull;

    #[test]
    fn test_gate_constructors() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 4).unwrap();
        let y = b.input("y", 4).unwrap();
        let z = b.input("z", 4).unwrap();
        let o = b.nand2(x, y).unwrap();
        assert_eq!(b.signal_ref(o).bits(), 4);
        assert_eq!(b.signal_ref(o).name(), "Nand");
        b.xorx(&[x, y, z]).unwrap();
        b.not(o).unwrap();
        assert_eq!(b.len(), 3);

        assert_eq!(
            b.andx(&[]),
            Err(SimError::InputCountMismatch {
                node: "And".into(),
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn test_bits_checked_when_wiring() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 4).unwrap();
        let c = b.input("c", 1).unwrap();
        assert_eq!(
            b.or2(x, c),
            Err(SimError::BitsMismatch {
                node: "Or".into(),
                port: 1,
                expected: 4,
                found: 1
            })
        );
        assert_eq!(b.signal("s", 0), Err(SimError::InvalidBits { bits: 0 }));
        assert_eq!(
            b.add(Element::new(ElementKind::Not).bits(65), &[x]),
            Err(SimError::InvalidBits { bits: 65 })
        );
    }

    #[test]
    fn test_output_names() {
        let mut b = ModelBuilder::new();
        let d = b.input("d", 1).unwrap();
        let c = b.clock("C").unwrap();
        let (_, outs) = b
            .add(Element::new(ElementKind::DFlipFlop).label("ff"), &[d, c])
            .unwrap();
        assert_eq!(b.signal_ref(outs[0]).name(), "ff.Q");
        assert_eq!(b.signal_ref(outs[1]).name(), "ff.~Q");
    }

    #[test]
    fn test_single_writer() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 1).unwrap();
        let s = b.signal("s", 1).unwrap();
        b.add_wired(ElementKind::Not, &[a], &[s]).unwrap();
        assert_eq!(
            b.add_wired(ElementKind::Not, &[a], &[s]),
            Err(SimError::MultipleWriters { signal: "s".into() })
        );
        assert_eq!(
            b.link(a, s, Link::copy),
            Err(SimError::MultipleWriters { signal: "s".into() })
        );
        let clock = b.clock("C").unwrap();
        assert!(b.add_wired(ElementKind::Not, &[a], &[clock]).is_err());
    }

    #[test]
    fn test_inputs_are_driven() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 1).unwrap();
        let x = b.input("x", 1).unwrap();
        assert_eq!(
            b.add_wired(ElementKind::Not, &[a], &[x]),
            Err(SimError::MultipleWriters { signal: "x".into() })
        );
        assert_eq!(
            b.link(a, x, Link::copy),
            Err(SimError::MultipleWriters { signal: "x".into() })
        );
        assert!(b.is_empty());
    }

    #[test]
    fn test_remove_frees_outputs() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 1).unwrap();
        let s = b.signal("s", 1).unwrap();
        let n = b.add_wired(ElementKind::Not, &[a], &[s]).unwrap();
        assert_eq!(b.remove_node(n), Some(Element::new(ElementKind::Not)));
        assert_eq!(b.remove_node(n), None);
        assert!(b.link(a, s, Link::copy).is_ok());
        assert_eq!(
            b.set_input(n, 0, a),
            Err(SimError::UnknownNode { node: n })
        );
    }

    #[test]
    fn test_build_compacts_in_slot_order() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 1).unwrap();
        let first = b.add(Element::new(ElementKind::Not).label("first"), &[a]).unwrap().0;
        b.add(Element::new(ElementKind::Not).label("second"), &[a])
            .unwrap();
        b.remove_node(first);
        b.add(Element::new(ElementKind::Not).label("third"), &[a])
            .unwrap();
        b.add(Element::new(ElementKind::Not).label("fourth"), &[a])
            .unwrap();

        let m = b.build(SimConfig::default());
        let order: Vec<&str> = (0..m.len()).map(|i| m.node_name(ni!(i))).collect();
        assert_eq!(order, ["third", "second", "fourth"]);
    }

    #[test]
    fn test_set_input() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 2).unwrap();
        let c = b.input("c", 2).unwrap();
        let wide = b.input("w", 3).unwrap();
        let (n, _) = b
            .add(Element::new(ElementKind::Bus { pull: Pull::Down }).bits(2), &[a, a])
            .unwrap();
        b.set_input(n, 1, c).unwrap();
        assert!(matches!(
            b.set_input(n, 0, wide),
            Err(SimError::BitsMismatch { port: 0, .. })
        ));
        assert!(matches!(
            b.set_input(n, 2, c),
            Err(SimError::InputCountMismatch { .. })
        ));
    }

    #[test]
    fn test_jk_is_one_bit() {
        let mut b = ModelBuilder::new();
        let j = b.input("j", 1).unwrap();
        let c = b.clock("C").unwrap();
        let (n, outs) = b
            .add(Element::new(ElementKind::JkFlipFlop).bits(8), &[j, c, j])
            .unwrap();
        assert_eq!(b.element(n).map(|e| e.bits), Some(1));
        assert_eq!(b.signal_ref(outs[0]).bits(), 1);
    }
}
