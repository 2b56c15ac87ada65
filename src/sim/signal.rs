use super::handles::Observer;
use crate::data_structures::mask;
use crate::error::{Result, SimError};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};

/// Snapshot of the state of a [Signal]: a value plus the high impedance flag.
///
/// While `high_z` is set `value` is 0.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Value {
    pub value: u64,
    pub high_z: bool,
}

impl Value {
    /// The undriven state.
    pub const HIGH_Z: Value = Value {
        value: 0,
        high_z: true,
    };

    /// Returns a driven [Value].
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            high_z: false,
        }
    }

    /// Returns a driven 1 bit [Value].
    pub const fn from_bool(b: bool) -> Self {
        Self::new(b as u64)
    }

    /// Returns true if the lowest bit is set. High impedance reads as false.
    pub fn bool(&self) -> bool {
        self.value & 1 != 0
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::new(value)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.high_z {
            write!(f, "Z")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Amount of observers kept inline in a signal before spilling into the heap.
const SIGNAL_OBSERVERS_SMALLVEC_SIZE: usize = 2;

/// Observable multi bit value, the unit of data flow between nodes.
///
/// The stored value is always masked to the width of the signal and setters report
/// whether the state actually changed, which is what stops propagation once a network
/// reaches its fixed point. Observers are kept in registration order.
///
/// # Example
/// ```
/// # use digisim::Signal;
/// let mut s = Signal::new("data", 4);
///
/// assert_eq!(s.set_value(0b1_0110), true);
/// assert_eq!(s.value(), 0b0110);
///
/// // Same value again, nothing to propagate.
/// assert_eq!(s.set_value(0b0110), false);
///
/// assert_eq!(s.set_high_z(true), true);
/// assert_eq!(s.value(), 0);
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Signal {
    name: String,
    bits: u8,
    mask: u64,
    value: u64,
    high_z: bool,
    observers: SmallVec<[Observer; SIGNAL_OBSERVERS_SMALLVEC_SIZE]>,
}

impl Signal {
    /// Returns a new [Signal] of width `bits` with value 0.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is 0 or greater than 64, use [Signal::try_new] to get an error instead.
    pub fn new<S: Into<String>>(name: S, bits: u8) -> Self {
        match Self::try_new(name, bits) {
            Ok(signal) => signal,
            Err(e) => panic!("{}", e),
        }
    }

    /// Returns a new [Signal] of width `bits` with value 0.
    pub fn try_new<S: Into<String>>(name: S, bits: u8) -> Result<Self> {
        check_width(bits as u32)?;
        Ok(Self {
            name: name.into(),
            bits,
            mask: mask(bits),
            value: 0,
            high_z: false,
            observers: SmallVec::new(),
        })
    }

    /// Sets the value, masked to the width of the signal, and clears high impedance.
    ///
    /// Returns true if the state of the signal changed.
    pub fn set_value(&mut self, value: u64) -> bool {
        let value = value & self.mask;
        if value == self.value && !self.high_z {
            return false;
        }
        self.value = value;
        self.high_z = false;
        true
    }

    /// Sets the high impedance flag, the value reads as 0 while it is set.
    ///
    /// Returns true if the state of the signal changed.
    pub fn set_high_z(&mut self, high_z: bool) -> bool {
        if self.high_z == high_z {
            return false;
        }
        self.high_z = high_z;
        if high_z {
            self.value = 0;
        }
        true
    }

    /// Sets the whole state from a [Value], returns true if it changed.
    pub fn set(&mut self, value: Value) -> bool {
        if value.high_z {
            self.set_high_z(true)
        } else {
            self.set_value(value.value)
        }
    }

    /// Returns the current value, 0 if the signal is high impedance.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Returns true if the lowest bit of the value is set.
    pub fn bool_value(&self) -> bool {
        self.value & 1 != 0
    }

    pub fn is_high_z(&self) -> bool {
        self.high_z
    }

    /// Returns a snapshot of the state of the signal.
    pub fn get(&self) -> Value {
        Value {
            value: self.value,
            high_z: self.high_z,
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Registers `observer`, it will be notified after every registered before it.
    ///
    /// Registering the same observer twice is a no-op.
    pub fn add_observer(&mut self, observer: Observer) {
        if !self.has_observer(observer) {
            self.observers.push(observer);
        }
    }

    /// Unregisters `observer`, returns true if it was registered.
    pub fn remove_observer(&mut self, observer: Observer) -> bool {
        match self.observers.iter().position(|o| *o == observer) {
            Some(i) => {
                self.observers.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_observers(&mut self) {
        self.observers.clear();
    }

    pub fn has_observer(&self, observer: Observer) -> bool {
        self.observers.contains(&observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns the registered observers in notification order.
    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    pub(crate) fn observer(&self, i: usize) -> Observer {
        self.observers[i]
    }

    /// Checks that the signal is `expected` bits wide.
    ///
    /// `node` and `port` identify where the signal is being connected for the error message.
    pub fn check_bits(&self, expected: u8, node: &str, port: usize) -> Result<()> {
        if self.bits != expected {
            return Err(SimError::BitsMismatch {
                node: node.to_string(),
                port,
                expected,
                found: self.bits,
            });
        }
        Ok(())
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.get())
    }
}

/// Returns an error if `bits` is not a valid signal width.
pub(crate) fn check_width(bits: u32) -> Result<()> {
    if bits == 0 || bits > crate::data_structures::MAX_BITS as u32 {
        return Err(SimError::InvalidBits { bits });
    }
    Ok(())
}
