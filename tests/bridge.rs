use std::cell::Cell;

use anyhow::anyhow;
use mpi_bridge::*;

/// Stand-in MPI layer: one process of a `size` process world, derives fake
/// handles and counts how often it was asked to
struct FakeMpi {
    rank: i32,
    size: i32,
    derivations: Cell<usize>,
    fail_with: Option<&'static str>,
}

impl FakeMpi {
    fn new(rank: i32, size: i32) -> Self {
        Self {
            rank,
            size,
            derivations: Cell::new(0),
            fail_with: None,
        }
    }

    fn failing(msg: &'static str) -> Self {
        Self {
            fail_with: Some(msg),
            ..Self::new(0, 1)
        }
    }
}

impl MpiLayer for FakeMpi {
    fn world_handle(&self) -> CommHandle {
        CommHandle(0)
    }

    fn abort(&self, code: i32) -> ! {
        panic!("abort({})", code)
    }

    fn create_dimensional_communicators(&self, topo: &mut ParallelTopology) -> anyhow::Result<()> {
        self.derivations.set(self.derivations.get() + 1);

        if let Some(msg) = self.fail_with {
            return Err(anyhow!(msg));
        }
        assert_eq!(topo.comm, self.world_handle());
        if grid::grid_size(topo) != Some(self.size) {
            return Err(anyhow!(BridgeError::MpiFailure("grid does not fit".into())));
        }

        topo.coord = grid::coords_of(self.rank, topo);
        (topo.neighbor_left, topo.neighbor_right) = grid::neighbors(self.rank, topo);
        for dim in 0..topo.ndim {
            topo.dimcomm[dim] = CommHandle(100 + dim as i32);
        }
        Ok(())
    }
}

fn topology_record(extents: &[f64]) -> HostValue {
    let mut rec = HostValue::record();
    rec.set_field("ndim", HostValue::scalar(extents.len() as f64));
    rec.set_field("nproc", extents.to_vec().into());
    rec
}

fn handles(out: &HostValue) -> Vec<f64> {
    out.field("dimcomm")
        .and_then(HostValue::as_numeric)
        .map(<[f64]>::to_vec)
        .unwrap_or_default()
}

#[test]
#[should_panic(expected = "abort(-1)")]
fn abort_without_code_uses_minus_one() {
    abort(&FakeMpi::new(0, 1), &[]);
}

#[test]
#[should_panic(expected = "abort(6)")]
fn abort_truncates_code() {
    abort(&FakeMpi::new(0, 1), &[HostValue::scalar(6.7)]);
}

#[test]
#[should_panic(expected = "abort(-1)")]
fn abort_with_unreadable_code_uses_minus_one() {
    abort(&FakeMpi::new(0, 1), &[HostValue::Empty]);
}

#[test]
fn wrong_arity_is_rejected_before_mpi() {
    let mpi = FakeMpi::new(0, 2);
    let rec = topology_record(&[2.0]);

    let cases: [(Vec<HostValue>, usize); 4] = [
        (vec![], 1),
        (vec![rec.clone(), rec.clone()], 1),
        (vec![rec.clone()], 0),
        (vec![rec.clone()], 2),
    ];

    for (inputs, nout) in cases {
        let mut outputs = vec![HostValue::Empty; nout];
        let err = create_dim_comms(&mpi, &inputs, &mut outputs).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::ArityMismatch));
        assert!(outputs.iter().all(|o| *o == HostValue::Empty));
    }
    assert_eq!(mpi.derivations.get(), 0);
}

#[test]
fn malformed_record_is_rejected_before_mpi() {
    let mpi = FakeMpi::new(0, 2);
    let mut rec = HostValue::record();
    rec.set_field("ndim", HostValue::scalar(1.0));

    let mut outputs = [HostValue::Empty];
    let err = create_dim_comms(&mpi, &[rec], &mut outputs).unwrap_err();

    assert_eq!(error_kind(&err), Some(ErrorKind::MalformedTopology));
    assert_eq!(mpi.derivations.get(), 0);
    assert_eq!(outputs[0], HostValue::Empty);
}

#[test]
fn oversized_grid_is_rejected_before_mpi() {
    let mpi = FakeMpi::new(0, 4);

    // 4 * 1073741825 wraps to 4 in i32
    for extents in [vec![65536.0, 65536.0], vec![4.0, 1073741825.0]] {
        let mut outputs = [HostValue::Empty];
        let err = create_dim_comms(&mpi, &[topology_record(&extents)], &mut outputs).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::MalformedTopology));
        assert_eq!(outputs[0], HostValue::Empty);
    }
    assert_eq!(mpi.derivations.get(), 0);
}

#[test]
fn one_handle_per_declared_dimension() {
    for extents in [vec![4.0], vec![2.0, 2.0], vec![2.0, 1.0, 2.0]] {
        let mpi = FakeMpi::new(1, 4);
        let mut outputs = [HostValue::Empty];
        create_dim_comms(&mpi, &[topology_record(&extents)], &mut outputs).unwrap();

        let handles = handles(&outputs[0]);
        assert_eq!(handles.len(), extents.len());
        assert!(handles.iter().all(|&h| h >= 0.0));
        assert_eq!(mpi.derivations.get(), 1);
    }
}

#[test]
fn caller_communicator_is_always_replaced_by_world() {
    let supplied = [
        None,
        Some(HostValue::scalar(42.0)),
        Some(HostValue::from("MPI_COMM_SELF")),
        Some(HostValue::Empty),
    ];

    for comm in supplied {
        let mut rec = topology_record(&[2.0]);
        if let Some(comm) = comm {
            rec.set_field("comm", comm);
        }

        let mut outputs = [HostValue::Empty];
        create_dim_comms(&FakeMpi::new(0, 2), &[rec], &mut outputs).unwrap();

        let comm = outputs[0].field("comm").and_then(HostValue::first_scalar);
        assert_eq!(comm, Some(0.0));
    }
}

#[test]
fn output_carries_coordinates_and_neighbors() {
    let mut outputs = [HostValue::Empty];
    create_dim_comms(&FakeMpi::new(3, 6), &[topology_record(&[3.0, 2.0])], &mut outputs).unwrap();

    let topo = topology::decode(&outputs[0]).unwrap();
    assert_eq!(topo.coord[..2], [0, 1]);
    assert_eq!(topo.neighbor_left[..2], [5, 0]);
    assert_eq!(topo.neighbor_right[..2], [4, 0]);
    assert_eq!(topo.dim_comms(), [CommHandle(100), CommHandle(101)]);
}

#[test]
fn derivation_failures_are_mpi_failures() {
    // grid of 3 processes in a world of 2
    let mut outputs = [HostValue::Empty];
    let err = create_dim_comms(&FakeMpi::new(0, 2), &[topology_record(&[3.0])], &mut outputs)
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::MpiFailure));
    assert_eq!(outputs[0], HostValue::Empty);

    // errors the layer did not classify are reported as MPI failures too
    let mpi = FakeMpi::failing("MPI_ERR_COMM");
    let err = create_dim_comms(&mpi, &[topology_record(&[1.0])], &mut outputs).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::MpiFailure));
    let report = format!("{:#}", err);
    assert_eq!(report.matches("MPI_ERR_COMM").count(), 1, "{}", report);
    assert_eq!(outputs[0], HostValue::Empty);
}
