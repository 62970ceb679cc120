use super::{CommHandle, ParallelTopology};

/// The MPI capabilities the bridge needs, injected so the bridge can run
/// against a fake layer in tests
pub trait MpiLayer {
    /// transferable handle of the world communicator
    fn world_handle(&self) -> CommHandle;

    /// Abort every process of the world communicator with `code`
    fn abort(&self, code: i32) -> !;

    /// Fill in coordinates, neighbors and one sub-communicator per dimension of
    /// `topo`, over the communicator `topo.comm` names. Collective over that communicator.
    fn create_dimensional_communicators(&self, topo: &mut ParallelTopology) -> anyhow::Result<()>;
}
