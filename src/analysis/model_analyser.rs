use super::dependency::DependencyAnalyser;
use super::rewrite::rewrite;
use super::truth_table::TruthTable;
use crate::data_structures::BitIter;
use crate::error::AnalyseError;
use crate::sim::{ModelBuilder, NamedSignal, SignalId, SimConfig};
use std::time::Instant;
use tracing::debug;

/// Derives the [TruthTable] of a circuit.
///
/// The circuit is rewritten into a combinational one first: JK and T flip-flops become
/// D flip-flops, multi bit inputs and outputs are split into 1 bit variables and every
/// D flip-flop turns into a state variable `labeln` plus a next state output `labeln+1`.
///
/// # Example
/// ```
/// # use digisim::ModelBuilder;
/// # use digisim::analysis::ModelAnalyser;
/// let mut b = ModelBuilder::new();
/// let a = b.input("A", 1).unwrap();
/// let c = b.input("B", 1).unwrap();
/// let y = b.xor2(a, c).unwrap();
/// b.output("Y", y);
///
/// let table = ModelAnalyser::new(&b).unwrap().analyse().unwrap();
/// let y: Vec<bool> = (0..table.rows()).map(|row| table.value(row, 0)).collect();
/// assert_eq!(y, [false, true, true, false]);
/// ```
#[derive(Debug, Clone)]
pub struct ModelAnalyser {
    builder: ModelBuilder,
    config: SimConfig,
}

impl ModelAnalyser {
    /// Prepares the analysis of the circuit wired by `builder`, which is left untouched.
    pub fn new(builder: &ModelBuilder) -> Result<Self, AnalyseError> {
        Self::with_config(builder, SimConfig::default())
    }

    pub fn with_config(builder: &ModelBuilder, config: SimConfig) -> Result<Self, AnalyseError> {
        let mut builder = builder.clone();
        rewrite(&mut builder)?;
        Ok(Self { builder, config })
    }

    /// Returns the input variables, state variables last.
    pub fn inputs(&self) -> &[NamedSignal] {
        self.builder.inputs()
    }

    /// Returns the analysed outputs, next state outputs first.
    pub fn outputs(&self) -> &[NamedSignal] {
        self.builder.outputs()
    }

    /// Returns the number of rows of the truth table.
    pub fn rows(&self) -> usize {
        1 << self.inputs().len()
    }

    /// Evaluates the circuit for every combination of the input variables.
    pub fn analyse(&self) -> Result<TruthTable, AnalyseError> {
        let start = Instant::now();
        let variables: Vec<String> = self.inputs().iter().map(|i| i.name.clone()).collect();
        let inputs: Vec<SignalId> = self.inputs().iter().map(|i| i.signal).collect();
        let outputs: Vec<SignalId> = self.outputs().iter().map(|o| o.signal).collect();
        let mut table = TruthTable::new(variables, self.outputs().iter().map(|o| o.name.clone()));

        let mut model = self.builder.clone().build(self.config);
        DependencyAnalyser::new(&model, &inputs, self.config.max_loop_counter)?;
        model.init()?;

        let n = inputs.len() as u8;
        for row in 0..self.rows() {
            let bits = BitIter::new(row as u64, n).rev();
            for (input, bit) in inputs.iter().zip(bits) {
                model.set_value(*input, bit as u64)?;
            }
            model.do_step()?;
            for (i, output) in outputs.iter().enumerate() {
                table.set(row, i, model.get(*output).bool());
            }
        }

        debug!(
            rows = table.rows(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysed model"
        );
        Ok(table)
    }
}
