use super::handles::SignalId;
use super::net::{Net, Schedule};
use super::signal::Value;
use crate::elements::{Element, ElementKind, NodeState};
use crate::error::{Result, SimError};
use smallvec::SmallVec;

/// Amount of inputs kept inline before spilling into the heap.
const NODE_INPUTS_SMALLVEC_SIZE: usize = 4;
/// Amount of outputs kept inline before spilling into the heap.
const NODE_OUTPUTS_SMALLVEC_SIZE: usize = 2;

pub type Inputs = SmallVec<[SignalId; NODE_INPUTS_SMALLVEC_SIZE]>;
pub type Outputs = SmallVec<[SignalId; NODE_OUTPUTS_SMALLVEC_SIZE]>;

/// An element wired into a model.
///
/// Evaluation happens in two phases: [Node::read_inputs] takes a snapshot of every input
/// and [Node::write_outputs] computes the outputs from that snapshot only, so a node never
/// sees a half updated set of inputs.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub element: Element,
    pub inputs: Inputs,
    pub outputs: Outputs,
    state: NodeState,
    snapshot: SmallVec<[Value; NODE_INPUTS_SMALLVEC_SIZE]>,
}

impl Node {
    pub fn new(element: Element, inputs: Inputs, outputs: Outputs) -> Self {
        let state = element.kind.initial_state(element.bits);
        Self {
            element,
            inputs,
            outputs,
            state,
            snapshot: SmallVec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ElementKind {
        &self.element.kind
    }

    pub fn name(&self) -> &str {
        self.element.name()
    }

    pub fn has_state(&self) -> bool {
        self.element.kind.has_state()
    }

    pub fn read_inputs(&mut self, net: &Net) {
        self.snapshot.clear();
        self.snapshot
            .extend(self.inputs.iter().map(|input| net.get(*input)));
        self.element
            .kind
            .read(&self.snapshot, &mut self.state, self.element.bits);
    }

    pub fn write_outputs(&self, net: &mut Net, schedule: &mut Schedule) -> Result<()> {
        let values = self
            .element
            .kind
            .write(&self.snapshot, &self.state, self.element.bits)
            .map_err(|_| SimError::BusConflict {
                signal: net.signal(self.outputs[0]).name().to_string(),
            })?;
        for (output, value) in self.outputs.iter().zip(values) {
            net.set(*output, value, schedule)?;
        }
        Ok(())
    }
}
