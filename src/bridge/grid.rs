//! Rank/coordinate arithmetic over a process grid. Dimension 0 varies fastest.

use mpi::Rank;

use super::ParallelTopology;

/// Number of processes the grid spans, None if that does not fit a Rank
pub fn grid_size(topo: &ParallelTopology) -> Option<i32> {
    grid_size_of(topo.extents())
}

pub(super) fn grid_size_of(extents: &[i32]) -> Option<i32> {
    extents.iter().try_fold(1i32, |acc, &n| acc.checked_mul(n))
}

/// Coordinates of `rank` in the grid. Padding dimensions get coordinate 0.
pub fn coords_of(rank: Rank, topo: &ParallelTopology) -> [i32; super::MAX_DIMENSIONS] {
    let mut coords = [0; super::MAX_DIMENSIONS];
    let mut rest = rank;
    for (c, &n) in coords.iter_mut().zip(topo.extents()) {
        *c = rest % n;
        rest /= n;
    }
    coords
}

/// Inverse of coords_of
pub fn rank_of(coords: &[i32], topo: &ParallelTopology) -> Rank {
    coords
        .iter()
        .zip(topo.extents())
        .rev()
        .fold(0, |acc, (&c, &n)| acc * n + c)
}

/// (left, right) neighbor ranks of `rank` along every dimension in use, wrapping
/// periodically. Padding dimensions point back at `rank`.
pub fn neighbors(
    rank: Rank,
    topo: &ParallelTopology,
) -> ([Rank; super::MAX_DIMENSIONS], [Rank; super::MAX_DIMENSIONS]) {
    let coords = coords_of(rank, topo);
    let mut left = [rank; super::MAX_DIMENSIONS];
    let mut right = [rank; super::MAX_DIMENSIONS];

    for (d, &n) in topo.extents().iter().enumerate() {
        let mut shifted = coords;

        shifted[d] = if coords[d] == 0 { n - 1 } else { coords[d] - 1 };
        left[d] = rank_of(&shifted[..topo.ndim], topo);

        shifted[d] = if coords[d] == n - 1 { 0 } else { coords[d] + 1 };
        right[d] = rank_of(&shifted[..topo.ndim], topo);
    }

    (left, right)
}

/// Colour shared by every process on the same line along `dim`: the linear index
/// of the remaining coordinates. Splitting by it with key `coords[dim]` yields the
/// sub-communicator for `dim`.
pub fn line_color(coords: &[i32], dim: usize, topo: &ParallelTopology) -> i32 {
    coords
        .iter()
        .zip(topo.extents())
        .enumerate()
        .rev()
        .filter(|&(d, _)| d != dim)
        .fold(0, |acc, (_, (&c, &n))| acc * n + c)
}
