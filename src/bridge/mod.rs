mod abort;
mod dimcomm;
mod error;
pub mod grid;
mod mpiworld;
pub mod topology;
mod traits;
mod value;

pub use abort::*;
pub use dimcomm::*;
pub use error::*;
pub use mpiworld::*;
pub use traits::*;
pub use value::*;

pub use topology::{CommHandle, ParallelTopology, MAX_DIMENSIONS, SCHEMA_VERSION};
