//! Line tracing between two clicks.
//!
//! This module defines the [`LineTracer`] trait and the [`TracerKind`]
//! enum for selecting a tracing strategy at runtime. Every strategy
//! honors the same contract as [`PathSearcher::search`]: the returned
//! path runs from destination back to origin, both inclusive.
//!
//! Freehand tracing depends on live pointer input and belongs to the
//! GUI layer, so it has no variant here.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::search::{PathSearcher, SearchConfig, validate_endpoints};
use crate::types::{CancelToken, Coord, CoreError, Path};

/// Selects which tracing strategy connects consecutive clicks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TracerKind {
    /// Dijkstra search favoring bright pixels.
    BrightestPath(SearchConfig),

    /// Bresenham's line, ignoring image content.
    StraightLine,
}

impl Default for TracerKind {
    fn default() -> Self {
        Self::BrightestPath(SearchConfig::default())
    }
}

/// Trait for line tracing strategies.
pub trait LineTracer {
    /// Trace a path from `origin` to `destination` over `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if either endpoint is
    /// outside the frame or they coincide.
    fn trace(
        &self,
        origin: Coord,
        destination: Coord,
        frame: &Frame,
        cancel: &CancelToken,
    ) -> Result<Option<Path>, CoreError>;
}

impl LineTracer for TracerKind {
    fn trace(
        &self,
        origin: Coord,
        destination: Coord,
        frame: &Frame,
        cancel: &CancelToken,
    ) -> Result<Option<Path>, CoreError> {
        match *self {
            Self::BrightestPath(config) => {
                PathSearcher::new(config).search(origin, destination, frame, cancel)
            }
            Self::StraightLine => {
                validate_endpoints(origin, destination, frame.dimensions())?;
                Ok(Some(bresenham(origin, destination)))
            }
        }
    }
}

/// Bresenham's line from `origin` to `destination`, returned
/// destination first.
fn bresenham(origin: Coord, destination: Coord) -> Path {
    let (x1, y1) = (i64::from(destination.x), i64::from(destination.y));
    let (mut x, mut y) = (i64::from(origin.x), i64::from(origin.y));
    let dx = (x1 - x).abs();
    let dy = (y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut coords = vec![origin];
    while (x, y) != (x1, y1) {
        let e2 = 2 * err;
        if e2 >= -dy {
            err -= dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        // Every step stays inside the bounding box of two u32 endpoints.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        coords.push(Coord::new(x as u32, y as u32));
    }
    coords.reverse();
    Path::new(coords)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frame(size: u32) -> Frame {
        Frame::from_fn(size, size, |_, _| 0.0).unwrap()
    }

    #[test]
    fn default_is_brightest_path() {
        assert_eq!(
            TracerKind::default(),
            TracerKind::BrightestPath(SearchConfig::default())
        );
    }

    #[test]
    fn straight_line_horizontal() {
        let path = TracerKind::StraightLine
            .trace(Coord::new(1, 2), Coord::new(4, 2), &frame(6), &CancelToken::new())
            .unwrap()
            .unwrap();
        let expected: Vec<Coord> = (1..=4).rev().map(|x| Coord::new(x, 2)).collect();
        assert_eq!(path.coords(), expected.as_slice());
    }

    #[test]
    fn straight_line_diagonal_has_no_gaps_in_chebyshev() {
        let path = TracerKind::StraightLine
            .trace(Coord::new(0, 0), Coord::new(5, 3), &frame(8), &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(path.first(), Some(&Coord::new(5, 3)));
        assert_eq!(path.last(), Some(&Coord::new(0, 0)));
        // Bresenham visits one pixel per step along the major axis.
        assert_eq!(path.len(), 6);
        for pair in path.coords().windows(2) {
            assert!(pair[0].x.abs_diff(pair[1].x) <= 1);
            assert!(pair[0].y.abs_diff(pair[1].y) <= 1);
        }
    }

    #[test]
    fn straight_line_rejects_out_of_bounds() {
        let result = TracerKind::StraightLine.trace(
            Coord::new(0, 0),
            Coord::new(9, 9),
            &frame(4),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn brightest_path_delegates_to_searcher() {
        let cancel = CancelToken::new();
        let frame = frame(5);
        let via_kind = TracerKind::default()
            .trace(Coord::new(0, 0), Coord::new(3, 4), &frame, &cancel)
            .unwrap();
        let direct = PathSearcher::default()
            .search(Coord::new(0, 0), Coord::new(3, 4), &frame, &cancel)
            .unwrap();
        assert_eq!(via_kind, direct);
    }
}
