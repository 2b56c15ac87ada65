//! The closed set of node kinds and their evaluation.
//!
//! Every kind is described by an [ElementKind] tag. A node evaluates in two phases,
//! [ElementKind::read] captures clock edges into the node's [NodeState] and
//! [ElementKind::write] computes the outputs from the captured inputs.
mod arithmetic;
mod basic;
mod flipflops;
mod memory;
mod wiring;
pub use arithmetic::Calc;
pub use basic::GateType;
pub use memory::{DataField, HEX_HEADER};
pub use wiring::{split, Pull};
pub(crate) use wiring::Conflict;

use crate::data_structures::mask;
use crate::error::{Result, SimError};
use crate::sim::Value;
use flipflops::FlipFlopState;
use memory::{CounterState, RamState};
use smallvec::{smallvec, SmallVec};
use std::borrow::Cow;
use strum_macros::IntoStaticStr;

/// Widest address an element may decode: multiplexer selectors, RAM addresses and
/// lookup table inputs.
pub const MAX_ADDRESS_BITS: u8 = 24;

/// Output values produced by one evaluation of a node.
pub(crate) type Outputs = SmallVec<[Value; 2]>;

/// Kinds of nodes the simulator can evaluate.
///
/// Port lists are given as `[inputs] -> [outputs]`, `w` being the width of the element.
#[derive(Debug, Clone, Eq, PartialEq, Hash, IntoStaticStr)]
pub enum ElementKind {
    /// `[w; n] -> [w]`, n >= 1.
    Gate(GateType),
    /// `[w] -> [w]`
    Not,
    /// `[w] -> [w]`
    Delay,
    /// `[a: w, b: w, c_i: 1] -> [s: w, c_o: 1]`
    Add,
    /// `[w] -> [w]`, two's complement.
    Neg,
    /// `[w] -> [out]`, number of set bits.
    BitCount,
    /// `[sel: selector_bits, w; 2^selector_bits] -> [w]`
    Multiplexer { selector_bits: u8 },
    /// `[w, sel: 1] -> [w]`, high impedance while not selected.
    Driver { inverted: bool },
    /// Concatenates the input groups and cuts the result into the output groups.
    Splitter {
        inputs: SmallVec<[u8; 4]>,
        outputs: SmallVec<[u8; 4]>,
    },
    /// `[w; n] -> [w]`, resolves several high impedance capable drivers.
    Bus { pull: Pull },
    /// `[] -> [w]`
    Const { value: u64 },
    /// `[D: w, C: 1] -> [Q: w, ~Q: w]`
    DFlipFlop,
    /// `[J: 1, C: 1, K: 1] -> [Q: 1, ~Q: 1]`
    JkFlipFlop,
    /// `[T: 1, C: 1] -> [Q: 1, ~Q: 1]` with enable, `[C: 1] -> [Q: 1, ~Q: 1]` without.
    TFlipFlop { enable: bool },
    /// `[C: 1, clr: 1] -> [out: w, ovf: 1]`
    Counter,
    /// `[1; inputs] -> [w]`, the inputs address the table, first input lowest.
    LookUpTable { inputs: u8, data: DataField },
    /// `[A: addr_bits, D: w, str: 1, C: 1, ld: 1] -> [D: w]`
    RamDualPort { addr_bits: u8 },
}

use ElementKind::*;

/// Port widths of an element once its width and input count are known.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Ports {
    pub inputs: SmallVec<[u8; 4]>,
    pub outputs: SmallVec<[u8; 2]>,
}

/// Per node state kept between evaluations.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) enum NodeState {
    Stateless,
    Adder(Calc),
    FlipFlop(FlipFlopState),
    Counter(CounterState),
    Ram(RamState),
}

impl ElementKind {
    /// Returns a splitter from a single `bits` wide input to `bits` 1 bit outputs.
    pub fn one_to_n(bits: u8) -> Self {
        Splitter {
            inputs: smallvec![bits],
            outputs: (0..bits).map(|_| 1).collect(),
        }
    }

    /// Returns a splitter from `bits` 1 bit inputs to a single `bits` wide output.
    pub fn n_to_one(bits: u8) -> Self {
        Splitter {
            inputs: (0..bits).map(|_| 1).collect(),
            outputs: smallvec![bits],
        }
    }

    /// Returns a splitter with the given input and output groups.
    pub fn splitter(inputs: &[u8], outputs: &[u8]) -> Self {
        Splitter {
            inputs: inputs.into(),
            outputs: outputs.into(),
        }
    }

    /// Returns the name of the kind, gates are named after their [GateType].
    pub fn name(&self) -> &'static str {
        match self {
            Gate(ty) => ty.into(),
            kind => kind.into(),
        }
    }

    /// Returns true for elements whose outputs depend on history, not just current inputs.
    pub fn has_state(&self) -> bool {
        matches!(
            self,
            DFlipFlop | JkFlipFlop | TFlipFlop { .. } | Counter | RamDualPort { .. }
        )
    }

    /// Returns true if a change on input `port` has to schedule the node.
    ///
    /// Flip-flops only listen to their clock, their data inputs are sampled on the edge.
    pub fn is_sensitive(&self, port: usize) -> bool {
        match self {
            DFlipFlop | JkFlipFlop => port == 1,
            TFlipFlop { enable } => port == *enable as usize,
            _ => true,
        }
    }

    /// Index of the clock input, if the element has one.
    pub fn clock_port(&self) -> Option<usize> {
        match self {
            DFlipFlop | JkFlipFlop => Some(1),
            TFlipFlop { enable } => Some(*enable as usize),
            Counter => Some(0),
            RamDualPort { .. } => Some(3),
            _ => None,
        }
    }

    /// Returns the port widths of an element `bits` wide with `connected` inputs.
    ///
    /// `node` names the element in error messages.
    pub(crate) fn ports(&self, bits: u8, connected: usize, node: &str) -> Result<Ports> {
        let count = |expected: usize| -> Result<()> {
            if connected != expected {
                return Err(SimError::InputCountMismatch {
                    node: node.to_string(),
                    expected,
                    found: connected,
                });
            }
            Ok(())
        };
        let ports = |inputs: &[u8], outputs: &[u8]| Ports {
            inputs: inputs.into(),
            outputs: outputs.into(),
        };

        Ok(match self {
            Gate(_) | Bus { .. } => {
                if connected == 0 {
                    count(1)?;
                }
                Ports {
                    inputs: smallvec![bits; connected],
                    outputs: smallvec![bits],
                }
            }
            Not | Delay | Neg => {
                count(1)?;
                ports(&[bits], &[bits])
            }
            BitCount => {
                count(1)?;
                ports(&[bits], &[arithmetic::bit_count_width(bits)])
            }
            Add => {
                count(3)?;
                ports(&[bits, bits, 1], &[bits, 1])
            }
            Multiplexer { selector_bits } => {
                crate::sim::check_width(*selector_bits as u32)?;
                check_address(*selector_bits, node)?;
                let expected = 1usize << selector_bits;
                if connected != expected + 1 {
                    return Err(SimError::SelectorInputCountMismatch {
                        node: node.to_string(),
                        selector_bits: *selector_bits,
                        expected,
                        found: connected.saturating_sub(1),
                    });
                }
                let mut inputs: SmallVec<[u8; 4]> = smallvec![*selector_bits];
                inputs.extend((0..expected).map(|_| bits));
                Ports {
                    inputs,
                    outputs: smallvec![bits],
                }
            }
            Driver { .. } => {
                count(2)?;
                ports(&[bits, 1], &[bits])
            }
            Splitter { inputs, outputs } => {
                count(inputs.len())?;
                let input: u32 = inputs.iter().map(|b| *b as u32).sum();
                let output: u32 = outputs.iter().map(|b| *b as u32).sum();
                for group in inputs.iter().chain(outputs.iter()) {
                    crate::sim::check_width(*group as u32)?;
                }
                if input != output {
                    return Err(SimError::SplitMismatch {
                        node: node.to_string(),
                        input,
                        output,
                    });
                }
                crate::sim::check_width(input)?;
                Ports {
                    inputs: inputs.clone(),
                    outputs: outputs.iter().copied().collect(),
                }
            }
            Const { .. } => {
                if connected != 0 {
                    return Err(SimError::NoInputsAvailable {
                        node: node.to_string(),
                    });
                }
                ports(&[], &[bits])
            }
            DFlipFlop => {
                count(2)?;
                ports(&[bits, 1], &[bits, bits])
            }
            JkFlipFlop => {
                count(3)?;
                ports(&[1, 1, 1], &[1, 1])
            }
            TFlipFlop { enable: true } => {
                count(2)?;
                ports(&[1, 1], &[1, 1])
            }
            TFlipFlop { enable: false } => {
                count(1)?;
                ports(&[1], &[1, 1])
            }
            Counter => {
                count(2)?;
                ports(&[1, 1], &[bits, 1])
            }
            LookUpTable { inputs, .. } => {
                check_address(*inputs, node)?;
                count(*inputs as usize)?;
                Ports {
                    inputs: smallvec![1; *inputs as usize],
                    outputs: smallvec![bits],
                }
            }
            RamDualPort { addr_bits } => {
                crate::sim::check_width(*addr_bits as u32)?;
                check_address(*addr_bits, node)?;
                count(5)?;
                ports(&[*addr_bits, bits, 1, 1, 1], &[bits])
            }
        })
    }

    /// Returns the name of output `port`.
    pub fn output_name(&self, port: usize) -> Cow<'static, str> {
        let names: &[&'static str] = match self {
            Add => &["s", "c_o"],
            DFlipFlop | JkFlipFlop | TFlipFlop { .. } => &["Q", "~Q"],
            Counter => &["out", "ovf"],
            RamDualPort { .. } => &["D"],
            Splitter { .. } => return format!("out{}", port).into(),
            _ => &["out"],
        };
        names.get(port).copied().unwrap_or("out").into()
    }

    /// Returns the state a fresh node of this kind starts with.
    pub(crate) fn initial_state(&self, bits: u8) -> NodeState {
        match self {
            Add => NodeState::Adder(Calc::for_bits(bits)),
            DFlipFlop | JkFlipFlop | TFlipFlop { .. } => {
                NodeState::FlipFlop(FlipFlopState::default())
            }
            Counter => NodeState::Counter(CounterState::default()),
            RamDualPort { addr_bits } => NodeState::Ram(RamState::new(*addr_bits)),
            _ => NodeState::Stateless,
        }
    }

    /// First evaluation phase, samples clock edges from the input snapshot into `state`.
    pub(crate) fn read(&self, inputs: &[Value], state: &mut NodeState, bits: u8) {
        match (self, state) {
            (DFlipFlop, NodeState::FlipFlop(s)) => flipflops::read_d(inputs, s, mask(bits)),
            (JkFlipFlop, NodeState::FlipFlop(s)) => flipflops::read_jk(inputs, s),
            (TFlipFlop { enable }, NodeState::FlipFlop(s)) => {
                flipflops::read_t(inputs, s, *enable)
            }
            (Counter, NodeState::Counter(s)) => memory::read_counter(inputs, s, mask(bits)),
            (RamDualPort { .. }, NodeState::Ram(s)) => memory::read_ram(inputs, s),
            _ => {}
        }
    }

    /// Second evaluation phase, computes the outputs from the input snapshot and `state`.
    pub(crate) fn write(
        &self,
        inputs: &[Value],
        state: &NodeState,
        bits: u8,
    ) -> std::result::Result<Outputs, Conflict> {
        let m = mask(bits);
        let out = match (self, state) {
            (Gate(ty), _) => smallvec![Value::new(ty.eval(inputs, m))],
            (Not, _) => smallvec![basic::not(inputs[0], m)],
            (Delay, _) => smallvec![basic::delay(inputs[0])],
            (Add, state) => {
                let calc = match state {
                    NodeState::Adder(calc) => *calc,
                    _ => Calc::for_bits(bits),
                };
                let (sum, carry) = calc.calc(inputs[0].value, inputs[1].value, inputs[2].value);
                smallvec![Value::new(sum), Value::from_bool(carry)]
            }
            (Neg, _) => smallvec![Value::new(arithmetic::neg(inputs[0].value, m))],
            (BitCount, _) => smallvec![Value::new(arithmetic::bit_count(inputs[0].value & m))],
            (Multiplexer { .. }, _) => smallvec![wiring::multiplex(inputs)],
            (Driver { inverted }, _) => smallvec![wiring::drive(inputs[0], inputs[1], *inverted)],
            (Splitter { inputs: i, outputs: o }, _) => split(inputs, i, o),
            (Bus { pull }, _) => smallvec![wiring::resolve_bus(inputs, *pull, bits)?],
            (Const { value }, _) => smallvec![Value::new(*value & m)],
            (DFlipFlop | JkFlipFlop | TFlipFlop { .. }, NodeState::FlipFlop(s)) => {
                s.outputs(m).iter().copied().collect()
            }
            (Counter, NodeState::Counter(s)) => {
                smallvec![Value::new(s.count), Value::from_bool(s.overflow)]
            }
            (LookUpTable { data, .. }, _) => {
                smallvec![Value::new(data.get(memory::lookup_address(inputs)))]
            }
            (RamDualPort { .. }, NodeState::Ram(s)) => smallvec![memory::write_ram(s)],
            (kind, state) => unreachable!("{} evaluated with state {:?}", kind.name(), state),
        };
        Ok(out)
    }
}

fn check_address(bits: u8, node: &str) -> Result<()> {
    if bits > MAX_ADDRESS_BITS {
        return Err(SimError::AddressTooWide {
            node: node.to_string(),
            bits,
            max: MAX_ADDRESS_BITS,
        });
    }
    Ok(())
}

/// Description of an element to add to a [ModelBuilder](crate::ModelBuilder):
/// its kind, width and label.
///
/// # Example
/// ```
/// # use digisim::elements::{Element, ElementKind};
/// let adder = Element::new(ElementKind::Add).bits(8).label("sum");
/// assert_eq!(adder.name(), "sum");
///
/// let unnamed = Element::new(ElementKind::Neg);
/// assert_eq!(unnamed.name(), "Neg");
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) bits: u8,
    pub(crate) label: String,
}

impl Element {
    /// Returns a new 1 bit wide unlabeled element.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            bits: 1,
            label: String::new(),
        }
    }

    /// Sets the data width of the element.
    pub fn bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Returns the label, or the name of the kind if there is none.
    pub fn name(&self) -> &str {
        if self.label.is_empty() {
            self.kind.name()
        } else {
            &self.label
        }
    }
}

impl From<ElementKind> for Element {
    fn from(kind: ElementKind) -> Self {
        Element::new(kind)
    }
}
