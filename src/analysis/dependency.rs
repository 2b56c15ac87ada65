use crate::data_structures::NodeSet;
use crate::error::AnalyseError;
use crate::sim::{Model, NodeId, Observer, SignalId};

/// Finds the signals every input of a model can reach.
///
/// Backtracking fails on combinational loops and on signals observed by anything the
/// analyser can't follow, like a [watch](Model::watch).
#[derive(Debug, Clone)]
pub struct DependencyAnalyser {
    inputs: Vec<SignalId>,
    reached: Vec<NodeSet>,
}

struct Walker<'a> {
    model: &'a Model,
    on_path: NodeSet,
    done: NodeSet,
    reached: NodeSet,
    max_depth: usize,
}

impl<'a> Walker<'a> {
    fn new(model: &'a Model, max_depth: usize) -> Self {
        Self {
            model,
            on_path: NodeSet::new(model.len()),
            done: NodeSet::new(model.len()),
            reached: NodeSet::new(model.signals().len()),
            max_depth,
        }
    }

    fn visit_signal(&mut self, signal: SignalId, depth: usize) -> Result<(), AnalyseError> {
        self.reached.insert(signal.0);
        let model = self.model;
        for observer in model.signal(signal).observers() {
            match *observer {
                Observer::Node(node) => self.visit_node(node, depth + 1)?,
                Observer::Link(link) => {
                    if depth >= self.max_depth {
                        return Err(AnalyseError::BacktrackLoop {
                            node: model.signal(signal).name().to_string(),
                        });
                    }
                    self.visit_signal(model.link(link).to, depth + 1)?
                }
                Observer::Watch(_) => {
                    return Err(AnalyseError::BacktrackImpossible {
                        observer: observer.kind_name(),
                    })
                }
            }
        }
        Ok(())
    }

    fn visit_node(&mut self, node: NodeId, depth: usize) -> Result<(), AnalyseError> {
        if self.on_path.contains(node.0) || depth > self.max_depth {
            return Err(AnalyseError::BacktrackLoop {
                node: self.model.node_name(node).to_string(),
            });
        }
        if self.done.contains(node.0) {
            return Ok(());
        }
        self.on_path.insert(node.0);
        let model = self.model;
        for output in model.node_outputs(node) {
            self.visit_signal(*output, depth)?;
        }
        self.on_path.remove(node.0);
        self.done.insert(node.0);
        Ok(())
    }
}

impl DependencyAnalyser {
    /// Follows every signal reachable from each of `inputs`, at most `max_depth` nodes deep.
    pub fn new(model: &Model, inputs: &[SignalId], max_depth: usize) -> Result<Self, AnalyseError> {
        let mut reached = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut walker = Walker::new(model, max_depth);
            walker.visit_signal(*input, 0)?;
            reached.push(walker.reached);
        }
        Ok(Self {
            inputs: inputs.to_vec(),
            reached,
        })
    }

    /// Returns the inputs `output` depends on, in the order they were given.
    pub fn inputs_of(&self, output: SignalId) -> Vec<SignalId> {
        self.inputs
            .iter()
            .zip(&self.reached)
            .filter(|(_, reached)| reached.contains(output.0))
            .map(|(input, _)| *input)
            .collect()
    }

    /// Returns true if `output` can be reached from `input`.
    pub fn depends_on(&self, output: SignalId, input: SignalId) -> bool {
        self.inputs
            .iter()
            .position(|i| *i == input)
            .map_or(false, |i| self.reached[i].contains(output.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ElementKind, GateType};
    use crate::sim::{ModelBuilder, SimConfig};

    #[test]
    fn test_reachability() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 1).unwrap();
        let y = b.input("y", 1).unwrap();
        let z = b.input("z", 1).unwrap();
        let xy = b.and2(x, y).unwrap();
        let nz = b.not(z).unwrap();
        let m = b.build(SimConfig::default());

        let d = DependencyAnalyser::new(&m, &[x, y, z], 10).unwrap();
        assert_eq!(d.inputs_of(xy), vec![x, y]);
        assert_eq!(d.inputs_of(nz), vec![z]);
        assert!(d.depends_on(xy, y));
        assert!(!d.depends_on(xy, z));
    }

    #[test]
    fn test_links_are_followed() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 1).unwrap();
        let derived = b.signal("derived", 1).unwrap();
        b.link(x, derived, crate::sim::Link::invert).unwrap();
        let out = b.not(derived).unwrap();
        let m = b.build(SimConfig::default());

        let d = DependencyAnalyser::new(&m, &[x], 10).unwrap();
        assert_eq!(d.inputs_of(out), vec![x]);
    }

    #[test]
    fn test_latch_is_a_loop() {
        let mut b = ModelBuilder::new();
        let s = b.input("S", 1).unwrap();
        let r = b.input("R", 1).unwrap();
        let q = b.signal("Q", 1).unwrap();
        let nq = b.signal("~Q", 1).unwrap();
        b.add_wired(
            Element::new(ElementKind::Gate(GateType::Nor)).label("top"),
            &[s, nq],
            &[q],
        )
        .unwrap();
        b.add_wired(
            Element::new(ElementKind::Gate(GateType::Nor)).label("bottom"),
            &[r, q],
            &[nq],
        )
        .unwrap();
        let m = b.build(SimConfig::default());

        assert_eq!(
            DependencyAnalyser::new(&m, &[s, r], 100).unwrap_err(),
            AnalyseError::BacktrackLoop { node: "top".into() }
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 1).unwrap();
        let mut s = x;
        for _ in 0..5 {
            s = b.not(s).unwrap();
        }
        let m = b.build(SimConfig::default());
        assert!(DependencyAnalyser::new(&m, &[x], 5).is_ok());
        assert!(matches!(
            DependencyAnalyser::new(&m, &[x], 4),
            Err(AnalyseError::BacktrackLoop { .. })
        ));
    }

    #[test]
    fn test_watch_cant_be_followed() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 1).unwrap();
        let y = b.not(x).unwrap();
        let mut m = b.build(SimConfig::default());
        m.watch(y, |_, _| {});

        assert_eq!(
            DependencyAnalyser::new(&m, &[x], 10).unwrap_err(),
            AnalyseError::BacktrackImpossible { observer: "Watch" }
        );
    }
}
