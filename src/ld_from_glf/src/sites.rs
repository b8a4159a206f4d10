use ngsld_io::read::PositionArray;

/// One unit of pairwise work: two site indices (i < j) and their genomic
/// distance, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitePair {
    pub i: usize,
    pub j: usize,
    pub dist: Option<u64>,
}

/// Enumerate every eligible site pair in canonical (i, j) order.
///
/// With distance filtering active this is a sliding-window scan, not a full
/// quadratic sweep: positions are sorted, so the inner loop stops at the
/// first site beyond `max_dist` or on a chromosome change. Without
/// filtering, all pairs qualify; cross-chromosome pairs then carry no
/// distance.
#[must_use]
pub fn eligible_pairs(
    n_sites: usize,
    positions: Option<&PositionArray>,
    max_dist: Option<u64>,
) -> Vec<SitePair> {
    let mut pairs = Vec::new();

    match (positions, max_dist) {
        (Some(positions), Some(max_dist)) => {
            for i in 0..n_sites {
                for j in i + 1..n_sites {
                    match positions.dist(i, j) {
                        Some(dist) if dist <= max_dist => pairs.push(SitePair { i, j, dist: Some(dist) }),
                        // Window closed, or next chromosome reached: no
                        // later j can qualify either.
                        Some(_) | None => break,
                    }
                }
            }
        }
        (positions, None) => {
            for i in 0..n_sites {
                for j in i + 1..n_sites {
                    let dist = positions.and_then(|positions| positions.dist(i, j));
                    pairs.push(SitePair { i, j, dist });
                }
            }
        }
        (None, Some(_)) => unreachable!("distance filtering requires a position array"),
    }
    pairs
}
