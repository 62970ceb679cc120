use anyhow::anyhow;
use log::{debug, error, info};

use super::{topology, BridgeError, HostValue, MpiLayer};

/// Build the dimensional sub-communicators for a topology record.
///
/// Takes exactly one input, the topology record, and writes the populated
/// record into the single output slot. Arity and decode errors are reported
/// before any MPI call is made.
///
/// Whatever communicator the record names is replaced by the world
/// communicator: the grid is always derived over world. It is not settled
/// whether callers ever expected their own `comm` to be honoured, so this is
/// kept as is.
///
/// Collective over the world communicator. On failure the output slot is left
/// untouched.
pub fn create_dim_comms<L: MpiLayer>(
    layer: &L,
    inputs: &[HostValue],
    outputs: &mut [HostValue],
) -> anyhow::Result<()> {
    if inputs.len() != 1 || outputs.len() != 1 {
        let err = anyhow!(BridgeError::ArityMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
        error!("{}", err);
        return Err(err);
    }

    let mut topo = topology::decode(&inputs[0])?;

    let world = layer.world_handle();
    if topo.comm != world && !topo.comm.is_null() {
        debug!("Replacing caller communicator {} with {}", topo.comm, world);
    }
    topo.comm = world;

    layer
        .create_dimensional_communicators(&mut topo)
        .map_err(|err| {
            if err.is::<BridgeError>() {
                err
            } else {
                err.context(BridgeError::MpiFailure(
                    "deriving dimensional communicators".into(),
                ))
            }
        })?;

    info!("Derived {} dimensional communicators", topo.ndim);
    outputs[0] = topology::encode(&topo);
    Ok(())
}
