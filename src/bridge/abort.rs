use log::{error, trace};

use super::{truncate_to_int, HostValue, MpiLayer};

/// Code to abort with when the caller gives none
pub const DEFAULT_ABORT_CODE: i32 = -1;

/// Abort code carried by the host arguments: the first element of the first
/// argument, truncated toward zero, or DEFAULT_ABORT_CODE if there is nothing
/// numeric to read. The range is not checked.
pub fn resolve_abort_code(inputs: &[HostValue]) -> i32 {
    let code = inputs
        .first()
        .and_then(HostValue::first_scalar)
        .map(truncate_to_int)
        .unwrap_or(DEFAULT_ABORT_CODE);
    trace!("Resolved abort code {} from {} inputs", code, inputs.len());
    code
}

/// Abort the world communicator. Does not return: under MPI this terminates
/// the calling process and possibly the whole job.
pub fn abort<L: MpiLayer>(layer: &L, inputs: &[HostValue]) -> ! {
    let code = resolve_abort_code(inputs);
    error!("Aborting {} with code {}", layer.world_handle(), code);
    layer.abort(code)
}
