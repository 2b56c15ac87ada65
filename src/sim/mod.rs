//! The simulation engine: signals, the nodes reading and writing them and the [Model]
//! settling the network.
#[macro_use]
mod handles;
mod builder;
mod config;
mod event;
mod model;
mod net;
mod node;
mod signal;
pub use builder::{Clock, ModelBuilder};
pub use config::*;
pub use event::*;
pub use handles::*;
pub use model::Model;
pub use net::Link;
pub use signal::{Signal, Value};
pub(crate) use signal::check_width;
