//! Brightest-path search over the implicit 4-neighbor pixel grid.
//!
//! Dijkstra's algorithm with a binary heap. The cost of stepping into a
//! pixel decays exponentially with its intensity,
//!
//! ```text
//! weight(v) = n0 · 2^(−v / t_half)
//! ```
//!
//! so the minimum-cost path hugs bright pixels. With the defaults
//! (`n0 = 2^16`, `t_half = 16`) a full-scale pixel costs about 1 and a
//! black pixel 65536.
//!
//! Worst case `O(n log n)` over the frame's `n` pixels; on typical input
//! `Θ(d² log d)` for a click distance `d`, because the search front only
//! fills roughly the bounding box before settling the destination.
//!
//! The graph is never materialized: neighbors are generated on demand
//! and per-pixel state lives in flat row-major vectors.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::types::{CancelToken, Coord, CoreError, Dimensions, Path};

/// Edge-weight parameters for the brightest-path search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cost of entering a black pixel.
    pub n0: f64,
    /// Intensity increase that halves the cost of entering a pixel.
    pub t_half: f64,
}

impl SearchConfig {
    /// Default `n0` (`2^16`).
    pub const DEFAULT_N0: f64 = 65_536.0;

    /// Default `t_half`.
    pub const DEFAULT_T_HALF: f64 = 16.0;

    /// Cost of entering a pixel of the given normalized intensity.
    #[must_use]
    pub fn weight(&self, intensity: f64) -> f64 {
        self.n0 * (-intensity / self.t_half).exp2()
    }

    /// Check that every weight is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] unless `n0` and `t_half`
    /// are both finite and greater than zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [("n0", self.n0), ("t_half", self.t_half)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::invalid(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n0: Self::DEFAULT_N0,
            t_half: Self::DEFAULT_T_HALF,
        }
    }
}

/// Heap entry. Ordered so that [`BinaryHeap`] pops the cheapest first,
/// breaking cost ties by `(x, y)`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    coord: Coord,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

/// The 4-neighbors of `coord` inside `dimensions`, in the order
/// right, down, left, up.
fn neighbors(coord: Coord, dimensions: Dimensions) -> impl Iterator<Item = Coord> {
    let Coord { x, y } = coord;
    [
        x.checked_add(1).filter(|&nx| nx < dimensions.width).map(|nx| Coord::new(nx, y)),
        y.checked_add(1).filter(|&ny| ny < dimensions.height).map(|ny| Coord::new(x, ny)),
        x.checked_sub(1).map(|nx| Coord::new(nx, y)),
        y.checked_sub(1).map(|ny| Coord::new(x, ny)),
    ]
    .into_iter()
    .flatten()
}

/// Dijkstra searcher favoring bright pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathSearcher {
    config: SearchConfig,
}

impl PathSearcher {
    /// Create a searcher with the given edge weights.
    #[must_use]
    pub const fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// The searcher's edge-weight parameters.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Find the brightest path from `origin` to `destination`.
    ///
    /// Returns the path from destination back to origin, both inclusive.
    /// Returns `Ok(None)` if `cancel` is observed (checked once per heap
    /// pop), if the destination is unreachable, or if the predecessor
    /// chain turns out to be broken.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] before searching if either
    /// coordinate is outside the frame, if they are equal, or if the
    /// configuration fails [`SearchConfig::validate`].
    pub fn search(
        &self,
        origin: Coord,
        destination: Coord,
        frame: &Frame,
        cancel: &CancelToken,
    ) -> Result<Option<Path>, CoreError> {
        self.config.validate()?;
        validate_endpoints(origin, destination, frame.dimensions())?;
        tracing::debug!(%origin, %destination, "starting brightest-path search");

        let dimensions = frame.dimensions();
        let pixels = dimensions.pixel_count();
        let mut distances = vec![f64::INFINITY; pixels];
        let mut visited = vec![false; pixels];
        let mut predecessors: Vec<Option<Coord>> = vec![None; pixels];
        let mut heap = BinaryHeap::new();

        distances[frame.offset(origin)] = 0.0;
        heap.push(Candidate {
            cost: 0.0,
            coord: origin,
        });

        let mut settled = false;
        loop {
            if cancel.is_canceled() {
                tracing::debug!(%origin, %destination, "search canceled");
                return Ok(None);
            }
            let Some(Candidate { cost, coord }) = heap.pop() else {
                break;
            };

            let offset = frame.offset(coord);
            if visited[offset] {
                continue;
            }
            visited[offset] = true;
            if coord == destination {
                settled = true;
                break;
            }

            for neighbor in neighbors(coord, dimensions) {
                let next = frame.offset(neighbor);
                let candidate = cost + self.config.weight(frame.at_offset(next));
                if candidate < distances[next] {
                    distances[next] = candidate;
                    predecessors[next] = Some(coord);
                    heap.push(Candidate {
                        cost: candidate,
                        coord: neighbor,
                    });
                }
            }
        }

        if !settled {
            tracing::debug!(%origin, %destination, "destination unreachable");
            return Ok(None);
        }

        let path = reconstruct(&predecessors, dimensions, origin, destination);
        if let Some(path) = &path {
            tracing::info!(%origin, %destination, len = path.len(), "path found");
        }
        Ok(path)
    }
}

/// Reject endpoints that are out of bounds or coincide.
pub(crate) fn validate_endpoints(
    origin: Coord,
    destination: Coord,
    dimensions: Dimensions,
) -> Result<(), CoreError> {
    for (name, coord) in [("origin", origin), ("destination", destination)] {
        if !coord.within(dimensions) {
            return Err(CoreError::invalid(format!(
                "{name} {coord} outside {}x{} frame",
                dimensions.width, dimensions.height
            )));
        }
    }
    if origin == destination {
        return Err(CoreError::invalid(format!(
            "origin and destination are both {origin}"
        )));
    }
    Ok(())
}

/// Walk predecessor links from `destination` back to `origin`.
///
/// A missing link means the chain is broken; that is logged and
/// reported as `None`.
fn reconstruct(
    predecessors: &[Option<Coord>],
    dimensions: Dimensions,
    origin: Coord,
    destination: Coord,
) -> Option<Path> {
    let width = dimensions.width as usize;
    let mut coords = vec![destination];
    let mut current = destination;
    while current != origin {
        let offset = current.y as usize * width + current.x as usize;
        let Some(previous) = predecessors[offset] else {
            tracing::warn!(%origin, %destination, at = %current, "path broken, no predecessor found");
            return None;
        };
        if coords.len() > predecessors.len() {
            tracing::warn!(%origin, %destination, "path broken, predecessor cycle");
            return None;
        }
        coords.push(previous);
        current = previous;
    }
    Some(Path::new(coords))
}
