//! Shared types for the brightpath core.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan (4-neighbor) distance to another coordinate.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns `true` if the coordinate lies inside `dimensions`.
    #[must_use]
    pub const fn within(self, dimensions: Dimensions) -> bool {
        self.x < dimensions.width && self.y < dimensions.height
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An ordered sequence of pixel coordinates.
///
/// Paths returned by a search run from destination to origin, both
/// inclusive. Use [`Path::reversed`] for origin-to-destination order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path(Vec<Coord>);

impl Path {
    /// Create a new path from a vector of coordinates.
    #[must_use]
    pub const fn new(coords: Vec<Coord>) -> Self {
        Self(coords)
    }

    /// Returns `true` if the path has no coordinates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of coordinates in the path.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first coordinate, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Coord> {
        self.0.first()
    }

    /// Returns the last coordinate, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Coord> {
        self.0.last()
    }

    /// Returns a slice of all coordinates.
    #[must_use]
    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    /// Returns `true` if `coord` lies on the path.
    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        self.0.contains(&coord)
    }

    /// Returns the same path walked in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Consumes the path and returns the underlying vector.
    #[must_use]
    pub fn into_coords(self) -> Vec<Coord> {
        self.0
    }
}

impl FromIterator<Coord> for Path {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Cooperative cancellation flag shared between a caller and a search.
///
/// Cloning shares the flag. Setting it never blocks; the search notices
/// on its next priority-queue pop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not canceled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Errors raised by the core data structures and algorithms.
///
/// All variants describe caller misuse and are recoverable locally.
/// Cancellation and broken predecessor chains are not errors; searches
/// report them as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The structure is empty or has no element in the requested direction.
    #[error("no element in the requested direction")]
    Underflow,

    /// An argument was rejected before any work was done.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An index was at or past the end of the sequence.
    #[error("index {index} out of range for length {len}")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the sequence.
        len: usize,
    },
}

impl CoreError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Coord::new(3, 9);
        let b = Coord::new(7, 2);
        assert_eq!(a.manhattan(b), 11);
        assert_eq!(b.manhattan(a), 11);
    }

    #[test]
    fn within_excludes_far_edge() {
        let dims = Dimensions {
            width: 4,
            height: 3,
        };
        assert!(Coord::new(3, 2).within(dims));
        assert!(!Coord::new(4, 2).within(dims));
        assert!(!Coord::new(0, 3).within(dims));
    }

    #[test]
    fn reversed_path_swaps_ends() {
        let path = Path::new(vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(1, 1)]);
        let rev = path.reversed();
        assert_eq!(rev.first(), Some(&Coord::new(1, 1)));
        assert_eq!(rev.last(), Some(&Coord::new(0, 0)));
        assert_eq!(rev.len(), 3);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
    }

    #[test]
    fn out_of_range_message_names_index_and_len() {
        let err = CoreError::OutOfRange { index: 5, len: 5 };
        assert_eq!(err.to_string(), "index 5 out of range for length 5");
    }
}
