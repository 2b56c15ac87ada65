use crate::sim::Value;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Enum representing the different types of fan in gates.
#[repr(u8)]
#[derive(Clone, Debug, Copy, Eq, PartialEq, Hash, Display, IntoStaticStr, EnumIter)]
pub enum GateType {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}
use GateType::*;
impl GateType {
    /// Folds the value of one more input into `acc`.
    /// Keep in mind if the gate [is negated](GateType::is_negated) the result should be negated.
    ///
    /// # Example
    /// ```
    /// # use digisim::elements::GateType;
    /// assert_eq!(GateType::Or.accumulate(0b1100, 0b1010), 0b1110);
    /// assert_eq!(GateType::Nor.accumulate(0b1100, 0b1010), 0b1110);
    ///
    /// assert_eq!(GateType::And.accumulate(0b1100, 0b1010), 0b1000);
    /// assert_eq!(GateType::Xnor.accumulate(0b1100, 0b1010), 0b0110);
    /// ```
    #[inline(always)]
    pub fn accumulate(&self, acc: u64, b: u64) -> u64 {
        match self {
            Or | Nor => acc | b,
            And | Nand => acc & b,
            Xor | Xnor => acc ^ b,
        }
    }

    /// Returns the value to start the [accumulation](GateType::accumulate) with.
    /// In other words, returns the value that doesn't affect the result.
    #[inline(always)]
    pub fn init(&self) -> u64 {
        match self {
            Or | Nor | Xor | Xnor => 0,
            And | Nand => u64::MAX,
        }
    }

    /// Returns true if `self` is [Nor], [Nand] or [Xnor].
    pub fn is_negated(&self) -> bool {
        matches!(self, Nor | Nand | Xnor)
    }

    /// Returns the negated version of a [GateType], Or => Nor, Nand => And etc...
    pub fn negated_version(&self) -> GateType {
        match self {
            Or => Nor,
            Nor => Or,
            And => Nand,
            Nand => And,
            Xor => Xnor,
            Xnor => Xor,
        }
    }

    /// Computes the output of the gate, masked with `mask`.
    ///
    /// High impedance inputs read as 0.
    pub fn eval(&self, inputs: &[Value], mask: u64) -> u64 {
        let acc = inputs
            .iter()
            .fold(self.init(), |acc, v| self.accumulate(acc, v.value));
        if self.is_negated() {
            !acc & mask
        } else {
            acc & mask
        }
    }
}

/// Output of a not gate.
pub(crate) fn not(input: Value, mask: u64) -> Value {
    Value::new(!input.value & mask)
}

/// Output of a delay, the input value is copied through.
pub(crate) fn delay(input: Value) -> Value {
    Value::new(input.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn values(v: &[u64]) -> Vec<Value> {
        v.iter().map(|v| Value::new(*v)).collect()
    }

    #[test]
    fn test_two_input_truth_tables() {
        let rows = [(0, 0), (1, 0), (0, 1), (1, 1)];
        let expected = |ty: GateType| -> [u64; 4] {
            match ty {
                And => [0, 0, 0, 1],
                Or => [0, 1, 1, 1],
                Nand => [1, 1, 1, 0],
                Nor => [1, 0, 0, 0],
                Xor => [0, 1, 1, 0],
                Xnor => [1, 0, 0, 1],
            }
        };
        for ty in GateType::iter() {
            for ((a, b), out) in rows.iter().zip(expected(ty).iter()) {
                assert_eq!(ty.eval(&values(&[*a, *b]), 1), *out, "{} {} {}", ty, a, b);
            }
        }
    }

    #[test]
    fn test_negated_version_inverts() {
        for ty in GateType::iter() {
            assert_ne!(ty.is_negated(), ty.negated_version().is_negated());
            assert_eq!(ty.negated_version().negated_version(), ty);
            let inputs = values(&[0b1100, 0b1010, 0b0110]);
            assert_eq!(
                ty.eval(&inputs, 0b1111),
                !ty.negated_version().eval(&inputs, 0b1111) & 0b1111
            );
        }
    }

    #[test]
    fn test_wide_fan_in() {
        let inputs = values(&[0xff, 0x0f, 0x3c]);
        assert_eq!(And.eval(&inputs, 0xff), 0x0c);
        assert_eq!(Or.eval(&inputs, 0xff), 0xff);
        assert_eq!(Xor.eval(&inputs, 0xff), 0xff ^ 0x0f ^ 0x3c);
    }

    #[test]
    fn test_high_z_reads_as_zero() {
        let inputs = [Value::HIGH_Z, Value::new(1)];
        assert_eq!(Or.eval(&inputs, 1), 1);
        assert_eq!(And.eval(&inputs, 1), 0);
    }

    #[test]
    fn test_not_and_delay() {
        assert_eq!(not(Value::new(0b0101), 0b1111), Value::new(0b1010));
        assert_eq!(delay(Value::new(9)), Value::new(9));
        assert_eq!(delay(Value::HIGH_Z), Value::new(0));
    }
}
