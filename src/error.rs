//! Error types for wiring, simulating and analysing circuits.
//!
//! [SimError] covers everything that can go wrong while a circuit is wired and run,
//! [AnalyseError] the checks performed before a truth table is derived and
//! [HarnessError] the failed expectations of a [TestExecuter](crate::testing::TestExecuter).

use crate::sim::NodeId;
use thiserror::Error;

/// Result type alias using [SimError].
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while wiring or simulating a circuit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    // ============ Wiring Errors ============
    /// A signal connected to a node port has the wrong width.
    #[error("{node}: input {port} has {found} bits, expected {expected}")]
    BitsMismatch {
        node: String,
        port: usize,
        expected: u8,
        found: u8,
    },

    /// Signals are 1 to 64 bits wide.
    #[error("invalid bit width {bits}, must be between 1 and 64")]
    InvalidBits { bits: u32 },

    /// Inputs were connected to an element that has none.
    #[error("{node} has no inputs available")]
    NoInputsAvailable { node: String },

    /// The number of connected inputs doesn't match the element.
    #[error("{node}: expected {expected} inputs, found {found}")]
    InputCountMismatch {
        node: String,
        expected: usize,
        found: usize,
    },

    /// A multiplexer needs exactly `2^selector_bits` data inputs.
    #[error("{node}: a selector with {selector_bits} bits needs {expected} inputs, found {found}")]
    SelectorInputCountMismatch {
        node: String,
        selector_bits: u8,
        expected: usize,
        found: usize,
    },

    /// The input and output groups of a splitter don't add up to the same width.
    #[error("{node}: splitter inputs have {input} bits but outputs have {output}")]
    SplitMismatch {
        node: String,
        input: u32,
        output: u32,
    },

    /// A selector, address or lookup table input count beyond what can be decoded.
    #[error("{node}: {bits} address bits, at most {max} are supported")]
    AddressTooWide { node: String, bits: u8, max: u8 },

    /// The number of pre-wired output signals doesn't match the element.
    #[error("{node}: expected {expected} outputs, found {found}")]
    OutputCountMismatch {
        node: String,
        expected: usize,
        found: usize,
    },

    /// The node was removed or never existed.
    #[error("node {node} doesn't exist")]
    UnknownNode { node: NodeId },

    /// A signal may only be written by a single node.
    #[error("signal '{signal}' is already driven by another node")]
    MultipleWriters { signal: String },

    /// No signal is registered under the given name.
    #[error("no signal named '{name}'")]
    UnknownSignal { name: String },

    // ============ Simulation Errors ============
    /// The network did not settle within the iteration budget.
    #[error(
        "network oscillates, not stable after {iterations} iterations, still changing: {}",
        .signals.join(", ")
    )]
    Oscillation {
        iterations: usize,
        signals: Vec<String>,
    },

    /// At most one clock may run fast enough to need a dedicated runner.
    #[error("more than one fast running clock")]
    MoreThanOneFastClock,

    /// A clock whose output drives nothing.
    #[error("clock '{label}' is not connected")]
    ClockNotConnected { label: String },

    /// Several drivers put different values on a bus.
    #[error("bus conflict on signal '{signal}'")]
    BusConflict { signal: String },

    /// [Model::init](crate::Model::init) has not been called yet.
    #[error("the model is not running, call init first")]
    NotRunning,
}

impl SimError {
    /// Returns true if the error was raised while wiring the circuit rather than running it.
    pub fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            SimError::BitsMismatch { .. }
                | SimError::InvalidBits { .. }
                | SimError::NoInputsAvailable { .. }
                | SimError::InputCountMismatch { .. }
                | SimError::SelectorInputCountMismatch { .. }
                | SimError::SplitMismatch { .. }
                | SimError::AddressTooWide { .. }
                | SimError::OutputCountMismatch { .. }
                | SimError::UnknownNode { .. }
                | SimError::MultipleWriters { .. }
        )
    }
}

/// Errors raised while turning a model into a truth table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyseError {
    #[error("the circuit has no inputs to analyse")]
    NoInputs,

    #[error("too many inputs, the maximum is {max} but {found} were found")]
    TooManyInputs { max: usize, found: usize },

    #[error("the circuit has no outputs to analyse")]
    NoOutputs,

    #[error("too many outputs, the maximum is {max} but {found} were found")]
    TooManyOutputs { max: usize, found: usize },

    #[error("a single clock is necessary to analyse flip-flops, found {found}")]
    SingleClockNecessary { found: usize },

    #[error("flip-flop '{label}' is not connected to the clock")]
    FlipFlopNeedsClock { label: String },

    #[error("a D flip-flop needs a label to name its state variable")]
    FlipFlopWithoutLabel,

    #[error("variable '{name}' is used twice")]
    VariableUsedTwice { name: String },

    #[error("cannot analyse node of kind {kind}")]
    CannotAnalyse { kind: &'static str },

    /// A combinational loop was found while following the signal graph.
    #[error("loop found while backtracking through node {node}")]
    BacktrackLoop { node: String },

    /// Something other than a node observes a signal, the graph can't be followed.
    #[error("backtracking of {observer} is impossible")]
    BacktrackImpossible { observer: &'static str },

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Errors raised by the [TestExecuter](crate::testing::TestExecuter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error("output {index} ({name}): expected {expected}, found {found}")]
    Mismatch {
        index: usize,
        name: String,
        expected: String,
        found: String,
    },

    #[error("row has {found} values, expected {expected}")]
    RowLength { expected: usize, found: usize },

    #[error("input {index} can't be set to 'don't care'")]
    DontCareInput { index: usize },

    #[error(transparent)]
    Sim(#[from] SimError),
}
