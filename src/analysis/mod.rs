//! Static analysis of finished circuits.
//!
//! [ModelAnalyser] turns a circuit into a combinational one and enumerates every
//! combination of its inputs into a [TruthTable]. [DependencyAnalyser] finds which
//! inputs every signal depends on and rejects combinational loops.
mod dependency;
mod model_analyser;
mod rewrite;
mod truth_table;

pub use dependency::DependencyAnalyser;
pub use model_analyser::ModelAnalyser;
pub use rewrite::{MAX_INPUTS_ALLOWED, MAX_OUTPUTS_ALLOWED};
pub use truth_table::TruthTable;
