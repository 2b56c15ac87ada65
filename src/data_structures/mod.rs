mod bits;
mod double_buffer;
mod node_set;
mod slab;
pub use bits::*;
pub use double_buffer::*;
pub use node_set::*;
pub use slab::*;
