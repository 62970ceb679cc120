use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::anyhow;
use indexmap::IndexMap;
use log::{debug, error, info, trace};

use mpi::{
    collective::SystemOperation,
    topology::{Color, SimpleCommunicator},
    traits::{Communicator, CommunicatorCollectives},
    Rank,
};

use super::{grid, BridgeError, CommHandle, MpiLayer, ParallelTopology, MAX_DIMENSIONS};

/// Handle of the world communicator in every MpiWorld registry
pub const WORLD: CommHandle = CommHandle(0);

/// MpiLayer over a real MPI world.
///
/// Communicators are kept in a registry and handed out as integer handles, so
/// the host never sees a native MPI object.
pub struct MpiWorld {
    comms: RefCell<IndexMap<CommHandle, Rc<SimpleCommunicator>>>,
    next_handle: Cell<i32>,
}

impl std::fmt::Debug for MpiWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpiWorld")
            .field("handles", &self.comms.borrow().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn mpi_failure(msg: String) -> anyhow::Error {
    let err = anyhow!(BridgeError::MpiFailure(msg));
    error!("{}", err);
    err
}

impl MpiWorld {
    pub fn new(world: SimpleCommunicator) -> Self {
        let mut comms = IndexMap::new();
        comms.insert(WORLD, Rc::new(world));
        Self {
            comms: RefCell::new(comms),
            next_handle: Cell::new(WORLD.0 + 1),
        }
    }

    /// rank in the world communicator
    pub fn rank(&self) -> Rank {
        self.comms.borrow()[&WORLD].rank()
    }

    /// size of the world communicator
    pub fn size(&self) -> Rank {
        self.comms.borrow()[&WORLD].size()
    }

    /// Size of the communicator behind `handle`, None if the handle is unknown
    pub fn communicator_size(&self, handle: CommHandle) -> Option<Rank> {
        self.comms.borrow().get(&handle).map(|c| c.size())
    }

    /// Run `f` on the communicator behind `handle`.
    ///
    /// The registry is not borrowed while `f` runs, so `f` may release handles or
    /// derive new communicators. A communicator released from inside `f` stays
    /// valid until `f` returns.
    pub fn with_communicator<T>(
        &self,
        handle: CommHandle,
        f: impl FnOnce(&SimpleCommunicator) -> T,
    ) -> Option<T> {
        let comm = self.comms.borrow().get(&handle).cloned()?;
        Some(f(&comm))
    }

    /// Free a derived communicator. The world communicator stays registered.
    pub fn release(&self, handle: CommHandle) -> anyhow::Result<()> {
        if handle == WORLD {
            return Err(mpi_failure("cannot release the world communicator".into()));
        }
        match self.comms.borrow_mut().shift_remove(&handle) {
            Some(_) => {
                debug!("Released {}", handle);
                Ok(())
            }
            None => Err(mpi_failure(format!(
                "unknown communicator handle {}",
                handle
            ))),
        }
    }

    fn register(&self, comm: SimpleCommunicator) -> CommHandle {
        let handle = CommHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.comms.borrow_mut().insert(handle, Rc::new(comm));
        trace!("Registered {}", handle);
        handle
    }

    /// Every rank must describe the same grid, otherwise the splits below would
    /// not match up across processes
    fn check_agreement(comm: &SimpleCommunicator, topo: &ParallelTopology) -> anyhow::Result<()> {
        let mut shape = [topo.ndim as i32; MAX_DIMENSIONS + 1];
        shape[1..].copy_from_slice(&topo.nproc);

        let mut lo = [0; MAX_DIMENSIONS + 1];
        let mut hi = [0; MAX_DIMENSIONS + 1];
        comm.all_reduce_into(&shape[..], &mut lo[..], SystemOperation::min());
        comm.all_reduce_into(&shape[..], &mut hi[..], SystemOperation::max());

        if lo != hi {
            return Err(mpi_failure(format!(
                "ranks disagree on the process grid: {:?} vs {:?}",
                lo, hi
            )));
        }
        Ok(())
    }
}

impl MpiLayer for MpiWorld {
    fn world_handle(&self) -> CommHandle {
        WORLD
    }

    fn abort(&self, code: i32) -> ! {
        self.comms.borrow()[&WORLD].abort(code)
    }

    fn create_dimensional_communicators(&self, topo: &mut ParallelTopology) -> anyhow::Result<()> {
        let derived = {
            let comms = self.comms.borrow();
            let comm = comms.get(&topo.comm).ok_or_else(|| {
                mpi_failure(format!("unknown communicator handle {}", topo.comm))
            })?;

            let rank = comm.rank();
            let size = comm.size();
            debug!(
                "Deriving {}-d grid {:?} over {} of size {}",
                topo.ndim,
                topo.extents(),
                topo.comm,
                size
            );

            Self::check_agreement(comm, topo)?;

            if grid::grid_size(topo) != Some(size) {
                return Err(mpi_failure(format!(
                    "grid {:?} does not span the {} processes of {}",
                    topo.extents(),
                    size,
                    topo.comm
                )));
            }

            topo.coord = grid::coords_of(rank, topo);
            (topo.neighbor_left, topo.neighbor_right) = grid::neighbors(rank, topo);

            let mut derived = Vec::with_capacity(topo.ndim);
            for dim in 0..topo.ndim {
                let color = grid::line_color(&topo.coord[..topo.ndim], dim, topo);
                let sub = comm
                    .split_by_color_with_key(Color::with_value(color), topo.coord[dim])
                    .ok_or_else(|| {
                        mpi_failure(format!(
                            "split along dimension {} returned no communicator",
                            dim
                        ))
                    })?;
                trace!("Dimension {}: line {} has {} processes", dim, color, sub.size());
                derived.push(sub);
            }
            derived
        };

        for (dim, sub) in derived.into_iter().enumerate() {
            topo.dimcomm[dim] = self.register(sub);
        }

        info!(
            "Created dimensional communicators {:?} at coord {:?}",
            topo.dim_comms(),
            &topo.coord[..topo.ndim]
        );
        Ok(())
    }
}
