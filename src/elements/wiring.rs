use crate::data_structures::mask;
use crate::sim::Value;
use smallvec::SmallVec;
use strum_macros::{Display, IntoStaticStr};

/// What an undriven [Bus](super::ElementKind::Bus) reads as.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, IntoStaticStr)]
pub enum Pull {
    /// Stays high impedance.
    None,
    /// Reads as all ones.
    Up,
    /// Reads as all zeros.
    Down,
}

/// Returned when the drivers of a bus disagree.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Conflict;

/// Selects the data input addressed by the selector, `inputs[0]` is the selector.
pub(crate) fn multiplex(inputs: &[Value]) -> Value {
    let selected = inputs[0].value as usize + 1;
    Value::new(inputs.get(selected).map_or(0, |v| v.value))
}

/// Passes the input through while the select line is active, high impedance otherwise.
pub(crate) fn drive(input: Value, select: Value, inverted: bool) -> Value {
    if select.bool() != inverted {
        Value::new(input.value)
    } else {
        Value::HIGH_Z
    }
}

/// Concatenates the input groups, least significant first, and cuts the result into
/// the output groups.
///
/// Any high impedance input makes every output high impedance.
///
/// # Example
/// ```
/// # use digisim::elements::split;
/// # use digisim::Value;
/// let outputs = split(&[Value::new(0xab), Value::new(0xcd)], &[8, 8], &[4, 4, 4, 4]);
/// let values: Vec<u64> = outputs.iter().map(|v| v.value).collect();
/// assert_eq!(values, [0xb, 0xa, 0xd, 0xc]);
/// ```
pub fn split(inputs: &[Value], input_bits: &[u8], output_bits: &[u8]) -> SmallVec<[Value; 2]> {
    if inputs.iter().any(|v| v.high_z) {
        return output_bits.iter().map(|_| Value::HIGH_Z).collect();
    }

    let mut value = 0u64;
    let mut shift = 0u32;
    for (input, bits) in inputs.iter().zip(input_bits) {
        value |= (input.value & mask(*bits)).checked_shl(shift).unwrap_or(0);
        shift += *bits as u32;
    }

    let mut shift = 0u32;
    output_bits
        .iter()
        .map(|bits| {
            let out = value.checked_shr(shift).unwrap_or(0) & mask(*bits);
            shift += *bits as u32;
            Value::new(out)
        })
        .collect()
}

/// Resolves the value of a bus from all of its drivers.
pub(crate) fn resolve_bus(inputs: &[Value], pull: Pull, bits: u8) -> Result<Value, Conflict> {
    let mut driven = inputs.iter().filter(|v| !v.high_z);
    let first = match driven.next() {
        Some(first) => first.value,
        None => {
            return Ok(match pull {
                Pull::None => Value::HIGH_Z,
                Pull::Up => Value::new(mask(bits)),
                Pull::Down => Value::new(0),
            })
        }
    };
    if driven.any(|v| v.value != first) {
        return Err(Conflict);
    }
    Ok(Value::new(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> Value {
        Value::new(n)
    }

    #[test]
    fn test_multiplex() {
        let inputs = [v(2), v(10), v(11), v(12), v(13)];
        assert_eq!(multiplex(&inputs), v(12));
        let inputs = [v(0), Value::HIGH_Z, v(11)];
        assert_eq!(multiplex(&inputs), v(0));
    }

    #[test]
    fn test_drive() {
        assert_eq!(drive(v(2), v(1), false), v(2));
        assert_eq!(drive(v(2), v(0), false), Value::HIGH_Z);
        assert_eq!(drive(v(2), v(0), true), v(2));
        assert_eq!(drive(v(2), v(1), true), Value::HIGH_Z);
    }

    #[test]
    fn test_split_one_to_many() {
        let out = split(&[v(0b1010)], &[4], &[1, 1, 1, 1]);
        let bits: Vec<_> = out.iter().map(|v| v.value).collect();
        assert_eq!(bits, [0, 1, 0, 1]);

        let out = split(&[v(0x0b00)], &[16], &[4, 4, 4, 4]);
        let nibbles: Vec<_> = out.iter().map(|v| v.value).collect();
        assert_eq!(nibbles, [0, 0, 0xb, 0]);
    }

    #[test]
    fn test_split_many_to_one() {
        let bits: Vec<_> = [1, 0, 1, 1].iter().map(|b| v(*b)).collect();
        let out = split(&bits, &[1, 1, 1, 1], &[4]);
        assert_eq!(out.as_slice(), &[v(0b1101)]);
    }

    #[test]
    fn test_split_full_width() {
        let out = split(&[v(u64::MAX), v(0)], &[32, 32], &[64]);
        assert_eq!(out.as_slice(), &[v(0xffff_ffff)]);
        let out = split(&[v(1 << 63)], &[64], &[63, 1]);
        assert_eq!(out.as_slice(), &[v(0), v(1)]);
    }

    #[test]
    fn test_split_high_z() {
        let out = split(&[v(1), Value::HIGH_Z], &[1, 1], &[2]);
        assert_eq!(out.as_slice(), &[Value::HIGH_Z]);
    }

    #[test]
    fn test_resolve_bus() {
        let z = Value::HIGH_Z;
        assert_eq!(resolve_bus(&[z, v(3), z], Pull::None, 4), Ok(v(3)));
        assert_eq!(resolve_bus(&[v(3), v(3)], Pull::None, 4), Ok(v(3)));
        assert_eq!(resolve_bus(&[v(3), v(2)], Pull::None, 4), Err(Conflict));
        assert_eq!(resolve_bus(&[z, z], Pull::None, 4), Ok(z));
        assert_eq!(resolve_bus(&[z, z], Pull::Up, 4), Ok(v(15)));
        assert_eq!(resolve_bus(&[z], Pull::Down, 4), Ok(v(0)));
    }
}
