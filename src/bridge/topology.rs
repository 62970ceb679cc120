use std::fmt;

use anyhow::anyhow;
use log::{debug, error, trace};

use super::{grid, truncate_to_int, BridgeError, HostValue};

/// Largest process grid dimensionality a topology can describe
pub const MAX_DIMENSIONS: usize = 3;

/// Version written to, and accepted from, the `schema_version` field
pub const SCHEMA_VERSION: i32 = 1;

/// Transferable communicator handle: an integer safe to hand across to the host,
/// never a native pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommHandle(pub i32);

impl CommHandle {
    /// marks a sub-communicator slot that has not been derived
    pub const NULL: CommHandle = CommHandle(-1);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Default for CommHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for CommHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "comm#{}", self.0)
    }
}

/// A Cartesian process grid laid over a communicator.
///
/// Entries past `ndim` are padding: extent 1, coordinate 0, null sub-communicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelTopology {
    pub ndim: usize,
    /// communicator the grid is laid over
    pub comm: CommHandle,
    /// one communicator per dimension, holding the processes that differ only along it
    pub dimcomm: [CommHandle; MAX_DIMENSIONS],
    /// grid extent per dimension
    pub nproc: [i32; MAX_DIMENSIONS],
    /// coordinate of this rank in the grid
    pub coord: [i32; MAX_DIMENSIONS],
    /// periodic neighbors, as ranks of `comm`
    pub neighbor_left: [i32; MAX_DIMENSIONS],
    pub neighbor_right: [i32; MAX_DIMENSIONS],
}

impl ParallelTopology {
    /// Empty topology with the given extents, not yet bound to a communicator.
    /// The extents must multiply to a valid Rank count, so grid arithmetic on
    /// the result cannot overflow.
    pub fn new(extents: &[i32]) -> anyhow::Result<Self> {
        if extents.is_empty() || extents.len() > MAX_DIMENSIONS {
            return Err(malformed(format!(
                "ndim must be between 1 and {}, got {}",
                MAX_DIMENSIONS,
                extents.len()
            )));
        }
        if let Some(bad) = extents.iter().find(|&&n| n < 1) {
            return Err(malformed(format!("grid extent must be positive, got {}", bad)));
        }
        if grid::grid_size_of(extents).is_none() {
            return Err(malformed(format!(
                "grid {:?} spans more processes than a communicator can hold",
                extents
            )));
        }

        let mut nproc = [1; MAX_DIMENSIONS];
        nproc[..extents.len()].copy_from_slice(extents);

        Ok(Self {
            ndim: extents.len(),
            comm: CommHandle::NULL,
            dimcomm: [CommHandle::NULL; MAX_DIMENSIONS],
            nproc,
            coord: [0; MAX_DIMENSIONS],
            neighbor_left: [0; MAX_DIMENSIONS],
            neighbor_right: [0; MAX_DIMENSIONS],
        })
    }

    /// extents of the dimensions in use
    pub fn extents(&self) -> &[i32] {
        &self.nproc[..self.ndim]
    }

    /// sub-communicators of the dimensions in use
    pub fn dim_comms(&self) -> &[CommHandle] {
        &self.dimcomm[..self.ndim]
    }
}

fn malformed(msg: String) -> anyhow::Error {
    let err = anyhow!(BridgeError::MalformedTopology(msg));
    error!("{}", err);
    err
}

/// Read a required or optional integer array field. Empty counts as absent.
fn int_array(record: &HostValue, name: &str) -> anyhow::Result<Option<Vec<i32>>> {
    match record.field(name) {
        None | Some(HostValue::Empty) => Ok(None),
        Some(HostValue::Numeric(values)) => {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(malformed(format!("field '{}' holds a non-finite value", name)));
            }
            Ok(Some(values.iter().map(|&v| truncate_to_int(v)).collect()))
        }
        Some(other) => Err(malformed(format!(
            "field '{}' must be numeric, got {}",
            name,
            other.kind()
        ))),
    }
}

fn required_int_array(record: &HostValue, name: &str) -> anyhow::Result<Vec<i32>> {
    int_array(record, name)?
        .filter(|values| !values.is_empty())
        .ok_or_else(|| malformed(format!("missing required field '{}'", name)))
}

/// Copy the first `ndim` entries of an output field into `dest`, if the caller
/// supplied enough of them. These fields are recomputed during derivation.
fn read_output_field(
    record: &HostValue,
    name: &str,
    ndim: usize,
    dest: &mut [i32; MAX_DIMENSIONS],
) -> anyhow::Result<()> {
    match int_array(record, name)? {
        Some(values) if values.len() >= ndim => dest[..ndim].copy_from_slice(&values[..ndim]),
        Some(values) => debug!(
            "Ignoring field '{}': {} entries for {} dimensions",
            name,
            values.len(),
            ndim
        ),
        None => {}
    }
    Ok(())
}

/// Decode a host topology record.
///
/// `ndim` and `nproc` are required. `comm` is read leniently since the bridge
/// rebinds it anyway; a value that is not a numeric scalar decodes as `NULL`.
pub fn decode(record: &HostValue) -> anyhow::Result<ParallelTopology> {
    let fields = record.as_record().ok_or_else(|| {
        malformed(format!("expected a topology record, got {}", record.kind()))
    })?;
    trace!("Decoding topology record with fields {:?}", fields.keys());

    if let Some(version) = int_array(record, "schema_version")? {
        if version.first() != Some(&SCHEMA_VERSION) {
            return Err(malformed(format!(
                "unsupported schema_version {:?}, expected {}",
                version, SCHEMA_VERSION
            )));
        }
    }

    let ndim = required_int_array(record, "ndim")?[0];
    if ndim < 1 || ndim as usize > MAX_DIMENSIONS {
        return Err(malformed(format!(
            "ndim must be between 1 and {}, got {}",
            MAX_DIMENSIONS, ndim
        )));
    }
    let ndim = ndim as usize;

    let nproc = required_int_array(record, "nproc")?;
    if nproc.len() < ndim {
        return Err(malformed(format!(
            "nproc has {} entries for {} dimensions",
            nproc.len(),
            ndim
        )));
    }

    let mut topo = ParallelTopology::new(&nproc[..ndim])?;

    topo.comm = record
        .field("comm")
        .and_then(HostValue::first_scalar)
        .filter(|v| v.is_finite())
        .map(|v| CommHandle(truncate_to_int(v)))
        .unwrap_or(CommHandle::NULL);

    read_output_field(record, "coord", ndim, &mut topo.coord)?;
    read_output_field(record, "neighbor_left", ndim, &mut topo.neighbor_left)?;
    read_output_field(record, "neighbor_right", ndim, &mut topo.neighbor_right)?;

    let mut dimcomm = [CommHandle::NULL.0; MAX_DIMENSIONS];
    read_output_field(record, "dimcomm", ndim, &mut dimcomm)?;
    topo.dimcomm = dimcomm.map(CommHandle);

    for name in fields.keys().filter(|k| !FIELDS.contains(&k.as_str())) {
        debug!("Ignoring unknown topology field '{}'", name);
    }

    debug!("Decoded topology {:?}", topo);
    Ok(topo)
}

const FIELDS: [&str; 8] = [
    "schema_version",
    "ndim",
    "comm",
    "dimcomm",
    "nproc",
    "coord",
    "neighbor_left",
    "neighbor_right",
];

/// Encode a topology into a host record. Per-dimension fields carry exactly
/// `ndim` entries.
pub fn encode(topo: &ParallelTopology) -> HostValue {
    let ndim = topo.ndim;
    let handles: Vec<i32> = topo.dim_comms().iter().map(|h| h.0).collect();

    let mut record = HostValue::record();
    record.set_field("schema_version", HostValue::scalar(SCHEMA_VERSION as f64));
    record.set_field("ndim", HostValue::scalar(ndim as f64));
    record.set_field("comm", HostValue::scalar(topo.comm.0 as f64));
    record.set_field("dimcomm", handles.as_slice().into());
    record.set_field("nproc", topo.extents().into());
    record.set_field("coord", (&topo.coord[..ndim]).into());
    record.set_field("neighbor_left", (&topo.neighbor_left[..ndim]).into());
    record.set_field("neighbor_right", (&topo.neighbor_right[..ndim]).into());
    record
}
