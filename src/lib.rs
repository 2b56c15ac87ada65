//! Event driven simulation of digital circuits.
//!
//! Circuits are wired with a [ModelBuilder] out of [elements] connected by [Signals](Signal),
//! then run as a [Model] that settles the network after every change of its inputs.
//! The [analysis] module derives truth tables from finished circuits and [testing] drives
//! a model row by row against expected outputs.
#[macro_use]
pub mod sim;
pub mod analysis;
pub mod data_structures;
pub mod elements;
pub mod error;
pub mod testing;

pub use elements::{Element, ElementKind};
pub use error::{AnalyseError, HarnessError, SimError};
pub use sim::{Model, ModelBuilder, SimConfig, Signal, SignalId, Value};
