//! Drives a circuit row by row and compares its outputs against expected values.
//!
//! # Example
//! ```
//! # use digisim::{row, ModelBuilder};
//! # use digisim::testing::TestExecuter;
//! let mut b = ModelBuilder::new();
//! let a = b.input("A", 1).unwrap();
//! let c = b.input("B", 1).unwrap();
//! let y = b.nand2(a, c).unwrap();
//! b.output("Y", y);
//!
//! let mut t = TestExecuter::new(b).unwrap();
//! t.check(&row![0, 0, 1]).unwrap();
//! t.check(&row![1, 1, 0]).unwrap();
//! t.check(&row![1, 0, X]).unwrap();
//! assert!(t.check(&row![1, 1, 1]).is_err());
//! ```
use crate::error::{HarnessError, SimError};
use crate::sim::{Model, ModelBuilder, NamedSignal, SignalId, SimConfig};
use std::fmt::{self, Display, Formatter};

type Result<T> = std::result::Result<T, HarnessError>;

/// A value in a test row.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Expect {
    /// Drives an input, or expects a driven output with this value.
    Bits(u64),
    /// Puts an input in high impedance, or expects an undriven output.
    HighZ,
    /// Matches any output. Not allowed on inputs.
    DontCare,
}

impl From<u64> for Expect {
    fn from(v: u64) -> Self {
        Expect::Bits(v)
    }
}

impl Display for Expect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Bits(v) => write!(f, "{}", v),
            Expect::HighZ => write!(f, "Z"),
            Expect::DontCare => write!(f, "X"),
        }
    }
}

/// Builds a row of [Expects](Expect): numbers are values, `Z` is high impedance and `X`
/// is "don't care".
#[macro_export]
macro_rules! row {
    (@expect Z) => {
        $crate::testing::Expect::HighZ
    };
    (@expect X) => {
        $crate::testing::Expect::DontCare
    };
    (@expect $v:tt) => {
        $crate::testing::Expect::from($v as u64)
    };
    ($($v:tt),* $(,)?) => {
        [$($crate::row!(@expect $v)),*]
    };
}

/// Asserts that a step of the model settles after exactly `expected` micro steps.
#[macro_export]
macro_rules! assert_settles {
    ($model:expr, $expected:expr) => {
        let actual = $model.do_step().expect("Model didn't settle");

        assert!(
            actual == $expected,
            "Model settled after {} micro steps, expected: {}",
            actual,
            $expected
        );
    };
}

/// Runs test rows against a model: a row holds a value for every input followed by the
/// expected value of every output.
///
/// By default the inputs and outputs are the ones registered in the builder, in
/// registration order.
#[derive(Debug)]
pub struct TestExecuter {
    model: Model,
    inputs: Vec<NamedSignal>,
    outputs: Vec<NamedSignal>,
}

impl TestExecuter {
    /// Builds and initializes the model wired by `builder`.
    pub fn new(builder: ModelBuilder) -> Result<Self> {
        Self::with_config(builder, SimConfig::default())
    }

    pub fn with_config(builder: ModelBuilder, config: SimConfig) -> Result<Self> {
        let mut model = builder.build(config);
        model.init()?;
        Ok(Self {
            inputs: model.inputs().to_vec(),
            outputs: model.outputs().to_vec(),
            model,
        })
    }

    fn named(&self, signals: &[SignalId]) -> Vec<NamedSignal> {
        signals
            .iter()
            .map(|s| NamedSignal::new(self.model.signal(*s).name(), *s))
            .collect()
    }

    fn find(&self, names: &[&str]) -> Result<Vec<NamedSignal>> {
        names
            .iter()
            .map(|name| {
                self.model
                    .find_signal(name)
                    .map(|s| NamedSignal::new(*name, s))
                    .ok_or_else(|| {
                        SimError::UnknownSignal {
                            name: name.to_string(),
                        }
                        .into()
                    })
            })
            .collect()
    }

    /// Replaces the columns driven by a row.
    pub fn inputs(mut self, inputs: &[SignalId]) -> Self {
        self.inputs = self.named(inputs);
        self
    }

    /// Replaces the columns checked by a row.
    pub fn outputs(mut self, outputs: &[SignalId]) -> Self {
        self.outputs = self.named(outputs);
        self
    }

    /// Like [TestExecuter::inputs], with signals looked up by name.
    pub fn named_inputs(mut self, names: &[&str]) -> Result<Self> {
        self.inputs = self.find(names)?;
        Ok(self)
    }

    /// Like [TestExecuter::outputs], with signals looked up by name.
    pub fn named_outputs(mut self, names: &[&str]) -> Result<Self> {
        self.outputs = self.find(names)?;
        Ok(self)
    }

    /// Applies the input values of `row`, settles the model and checks every output.
    pub fn check(&mut self, row: &[Expect]) -> Result<()> {
        let expected = self.inputs.len() + self.outputs.len();
        if row.len() != expected {
            return Err(HarnessError::RowLength {
                expected,
                found: row.len(),
            });
        }
        let (inputs, outputs) = row.split_at(self.inputs.len());

        for (index, (input, value)) in self.inputs.iter().zip(inputs).enumerate() {
            match value {
                Expect::Bits(v) => self.model.set_value(input.signal, *v)?,
                Expect::HighZ => self.model.set_high_z(input.signal, true)?,
                Expect::DontCare => return Err(HarnessError::DontCareInput { index }),
            }
        }
        self.model.do_step()?;

        for (index, (output, expect)) in self.outputs.iter().zip(outputs).enumerate() {
            let signal = self.model.signal(output.signal);
            let matches = match expect {
                Expect::Bits(v) => !signal.is_high_z() && signal.value() == v & signal.mask(),
                Expect::HighZ => signal.is_high_z(),
                Expect::DontCare => true,
            };
            if !matches {
                return Err(HarnessError::Mismatch {
                    index,
                    name: output.name.clone(),
                    expected: expect.to_string(),
                    found: signal.get().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ElementKind, Pull};

    #[test]
    fn test_row_macro() {
        assert_eq!(
            row![1, Z, X, 0xff],
            [
                Expect::Bits(1),
                Expect::HighZ,
                Expect::DontCare,
                Expect::Bits(255)
            ]
        );
    }

    fn driver() -> ModelBuilder {
        let mut b = ModelBuilder::new();
        let d = b.input("D", 4).unwrap();
        let en = b.input("en", 1).unwrap();
        let (_, out) = b
            .add(
                Element::new(ElementKind::Driver { inverted: false }).bits(4),
                &[d, en],
            )
            .unwrap();
        b.output("out", out[0]);
        b
    }

    #[test]
    fn test_high_z_rows() {
        let mut t = TestExecuter::new(driver()).unwrap();
        t.check(&row![5, 1, 5]).unwrap();
        t.check(&row![5, 0, Z]).unwrap();
        assert_eq!(
            t.check(&row![5, 0, 5]),
            Err(HarnessError::Mismatch {
                index: 0,
                name: "out".into(),
                expected: "5".into(),
                found: "Z".into(),
            })
        );
        assert_eq!(
            t.check(&row![5, 1, Z]),
            Err(HarnessError::Mismatch {
                index: 0,
                name: "out".into(),
                expected: "Z".into(),
                found: "5".into(),
            })
        );
    }

    #[test]
    fn test_bad_rows() {
        let mut t = TestExecuter::new(driver()).unwrap();
        assert_eq!(
            t.check(&row![1, 1]),
            Err(HarnessError::RowLength {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            t.check(&row![X, 1, 0]),
            Err(HarnessError::DontCareInput { index: 0 })
        );
    }

    #[test]
    fn test_named_columns() {
        let mut b = ModelBuilder::new();
        let a = b.input("a", 1).unwrap();
        let c = b.input("b", 1).unwrap();
        let bus = b
            .add(ElementKind::Bus { pull: Pull::Up }, &[a, c])
            .map(|(_, out)| out[0])
            .unwrap();
        b.probe("bus", bus);

        let mut t = TestExecuter::new(b)
            .unwrap()
            .named_inputs(&["b", "a"])
            .unwrap()
            .named_outputs(&["bus"])
            .unwrap();
        t.check(&row![Z, Z, 1]).unwrap();
        t.check(&row![0, Z, 0]).unwrap();
        assert_eq!(t.model().value(c), 0);

        assert!(matches!(
            TestExecuter::new(ModelBuilder::new())
                .unwrap()
                .named_inputs(&["missing"]),
            Err(HarnessError::Sim(SimError::UnknownSignal { .. }))
        ));
    }

    #[test]
    fn test_explicit_columns_and_steps() {
        let mut b = ModelBuilder::new();
        let x = b.input("x", 8).unwrap();
        let n = b.not(x).unwrap();
        let nn = b.not(n).unwrap();
        let mut t = TestExecuter::new(b).unwrap().inputs(&[x]).outputs(&[nn, n]);
        t.check(&row![0x0f, 0x0f, 0xf0]).unwrap();

        let model = t.model_mut();
        model.set_value(x, 1).unwrap();
        assert_settles!(model, 2);
    }
}
