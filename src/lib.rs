mod bridge;
pub use bridge::*;
use mpi::environment::Universe;

mod logger;
pub use logger::{init_logging, set_log_level};

/// Initializes MPI and Logging, and wraps the world communicator for the bridge
pub fn init() -> anyhow::Result<(Universe, MpiWorld)> {
    let universe = mpi::initialize().ok_or(anyhow::anyhow!("MPI Not Initialized"))?;
    let world = MpiWorld::new(universe.world());

    init_logging(world.rank());
    log::debug!("MPI initialized with {} processes", world.size());

    Ok((universe, world))
}
