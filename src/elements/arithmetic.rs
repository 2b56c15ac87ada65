use crate::data_structures::MAX_BITS;

const LOW_MASK: u64 = u64::MAX >> 1;
const CARRY_MASK: u64 = 1 << 63;

/// Addition strategy of an adder, picked once from its width.
///
/// Below 64 bits the sum and carry fit in a native u64, at 64 bits the carry is rebuilt
/// from the carry into the top bit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Calc {
    /// The carry out ends up at bit `bits` of the native sum.
    Native { carry_bit: u64 },
    /// Full width addition with an explicit carry.
    Wide,
}

impl Calc {
    pub fn for_bits(bits: u8) -> Self {
        if bits < MAX_BITS {
            Calc::Native {
                carry_bit: 1 << bits,
            }
        } else {
            Calc::Wide
        }
    }

    /// Returns the unmasked sum and the carry out of `a + b + carry_in`.
    ///
    /// # Example
    /// ```
    /// # use digisim::elements::Calc;
    /// assert_eq!(Calc::for_bits(4).calc(0b1111, 1, 0), (0b1_0000, true));
    /// assert_eq!(Calc::for_bits(64).calc(u64::MAX, 1, 0), (0, true));
    /// assert_eq!(Calc::for_bits(64).calc(1, 2, 1), (4, false));
    /// ```
    pub fn calc(&self, a: u64, b: u64, carry_in: u64) -> (u64, bool) {
        match self {
            Calc::Native { carry_bit } => {
                let value = a + b + carry_in;
                (value, value & carry_bit != 0)
            }
            Calc::Wide => {
                let sum = a.wrapping_add(b);
                let value = sum.wrapping_add(carry_in);
                (value, add_carry(a, b) | add_carry(sum, carry_in))
            }
        }
    }
}

/// Returns the carry out of the top bit of `x + y`: `(a&b) | ((a^b) & c)` where `a` and
/// `b` are the top bits and `c` the carry coming out of the low 63 bits.
fn add_carry(x: u64, y: u64) -> bool {
    let c = ((x & LOW_MASK) + (y & LOW_MASK)) & CARRY_MASK != 0;
    let a = x & CARRY_MASK != 0;
    let b = y & CARRY_MASK != 0;
    (a & b) | ((a ^ b) & c)
}

/// Two's complement negation.
pub(crate) fn neg(value: u64, mask: u64) -> u64 {
    value.wrapping_neg() & mask
}

/// Width of the output of a bit counter with `bits` input bits,
/// the smallest power of two not below `bits`.
pub(crate) fn bit_count_width(bits: u8) -> u8 {
    let mut out = 1;
    while out < bits {
        out *= 2;
    }
    out
}

pub(crate) fn bit_count(value: u64) -> u64 {
    value.count_ones() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::mask;

    #[test]
    fn test_native_carry() {
        let calc = Calc::for_bits(8);
        assert_eq!(calc, Calc::Native { carry_bit: 256 });
        assert_eq!(calc.calc(200, 55, 0), (255, false));
        assert_eq!(calc.calc(200, 55, 1), (256, true));
        assert_eq!(calc.calc(255, 255, 1), (511, true));

        let calc = Calc::for_bits(63);
        let max = mask(63);
        assert_eq!(calc.calc(max, max, 1), (u64::MAX, true));
        assert_eq!(calc.calc(max, 0, 0), (max, false));
    }

    #[test]
    fn test_wide_matches_u128() {
        let cases = [
            (0u64, 0u64, 0u64),
            (u64::MAX, 0, 1),
            (u64::MAX, u64::MAX, 1),
            (1 << 63, 1 << 63, 0),
            (LOW_MASK, 1, 0),
            (LOW_MASK, LOW_MASK, 1),
            (0x8000_0000_0000_0001, 0x7fff_ffff_ffff_ffff, 0),
            (0x1234_5678_9abc_def0, 0xfedc_ba98_7654_3210, 1),
        ];
        let calc = Calc::for_bits(64);
        assert_eq!(calc, Calc::Wide);
        for (a, b, c) in cases.iter() {
            let full = *a as u128 + *b as u128 + *c as u128;
            assert_eq!(
                calc.calc(*a, *b, *c),
                (full as u64, full >> 64 != 0),
                "{:x} + {:x} + {}",
                a,
                b,
                c
            );
        }
    }

    #[test]
    fn test_neg() {
        let m = mask(4);
        assert_eq!(neg(0, m), 0);
        assert_eq!(neg(1, m), 15);
        assert_eq!(neg(15, m), 1);
        assert_eq!(neg(3, m), 13);
        assert_eq!(neg(8, m), 8);
        assert_eq!(neg(1, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_bit_count() {
        assert_eq!(bit_count_width(1), 1);
        assert_eq!(bit_count_width(3), 4);
        assert_eq!(bit_count_width(8), 8);
        assert_eq!(bit_count_width(33), 64);
        assert_eq!(bit_count(0b1011), 3);
        assert_eq!(bit_count(u64::MAX), 64);
    }
}
