use anyhow::Context;
use log::info;
use mpi_bridge::{abort, create_dim_comms, topology, HostValue};

/// mpirun -n 4 mpi_bridge 2 2     derive a 2x2 grid over the world communicator
/// mpirun -n 4 mpi_bridge         1-d grid over all ranks
/// mpirun -n 4 mpi_bridge --abort 3
fn main() -> anyhow::Result<()> {
    let (_universe, world) = mpi_bridge::init()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(pos) = args.iter().position(|a| a == "--abort") {
        let inputs = args
            .get(pos + 1)
            .map(|code| code.parse::<f64>().context("abort code must be a number"))
            .transpose()?
            .map(HostValue::scalar)
            .into_iter()
            .collect::<Vec<_>>();
        abort(&world, &inputs);
    }

    let mut extents = args
        .iter()
        .map(|a| {
            a.parse::<f64>()
                .with_context(|| format!("grid extent '{}' is not a number", a))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if extents.is_empty() {
        extents.push(world.size() as f64);
    }

    let mut record = HostValue::record();
    record.set_field("ndim", HostValue::scalar(extents.len() as f64));
    record.set_field("nproc", extents.into());

    let mut outputs = [HostValue::Empty];
    create_dim_comms(&world, &[record], &mut outputs)?;

    let topo = topology::decode(&outputs[0])?;
    for (dim, &handle) in topo.dim_comms().iter().enumerate() {
        info!(
            "dimension {}: coord {} of {}, neighbors {}/{}, {} with {} processes",
            dim,
            topo.coord[dim],
            topo.nproc[dim],
            topo.neighbor_left[dim],
            topo.neighbor_right[dim],
            handle,
            world.communicator_size(handle).unwrap_or(0)
        );
    }

    Ok(())
}
