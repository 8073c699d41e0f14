//! Brightness profiles along traced lines.

use crate::frame::Frame;
use crate::smoothing::reflect_index;
use crate::types::{Coord, CoreError, Path};

/// Intensities of `frame` at each coordinate of `path`, in path order.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if any coordinate lies
/// outside the frame.
pub fn sample_profile(frame: &Frame, path: &Path) -> Result<Vec<f64>, CoreError> {
    path.coords()
        .iter()
        .map(|&coord| {
            frame.get(coord).ok_or_else(|| {
                CoreError::invalid(format!(
                    "path point {coord} is outside the {}x{} frame",
                    frame.width(),
                    frame.height()
                ))
            })
        })
        .collect()
}

/// Offsets `(dx, dy)` of a filled disk of `radius` centered on the origin.
fn disk_offsets(radius: u32) -> Vec<(i64, i64)> {
    let r = i64::from(radius);
    (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect()
}

/// Average every pixel over a filled disk of `radius`.
///
/// Pixels of the disk that fall outside the frame are mirrored back
/// across the edge (`d c b a | a b c d`). A radius of 0 returns the
/// frame unchanged.
#[must_use]
pub fn disk_average(frame: &Frame, radius: u32) -> Frame {
    if radius == 0 {
        return frame.clone();
    }

    let offsets = disk_offsets(radius);
    #[allow(clippy::cast_precision_loss)]
    let count = offsets.len() as f64;
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let values = frame.values();

    let mut data = Vec::with_capacity(values.len());
    for y in 0..height {
        for x in 0..width {
            let sum: f64 = offsets
                .iter()
                .map(|&(dx, dy)| {
                    #[allow(clippy::cast_possible_wrap)]
                    let sx = reflect_index(x as i64 + dx, width);
                    #[allow(clippy::cast_possible_wrap)]
                    let sy = reflect_index(y as i64 + dy, height);
                    values[sy * width + sx]
                })
                .sum();
            data.push(sum / count);
        }
    }
    Frame::from_normalized(frame.dimensions(), data)
}

/// Join per-segment paths into one polyline.
///
/// Each segment runs origin to destination, and the destination of one
/// segment is usually the origin of the next; such shared points appear
/// once in the result.
#[must_use]
pub fn concat_paths<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Path {
    let mut joined: Vec<Coord> = Vec::new();
    for path in paths {
        let mut coords = path.coords();
        if let (Some(last), Some(first)) = (joined.last(), coords.first())
            && last == first
        {
            coords = &coords[1..];
        }
        joined.extend_from_slice(coords);
    }
    Path::new(joined)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn path(points: &[(u32, u32)]) -> Path {
        points.iter().map(|&(x, y)| Coord::new(x, y)).collect()
    }

    #[test]
    fn profile_follows_path_order() {
        let frame = Frame::from_fn(3, 1, |x, _| f64::from(x)).unwrap();
        let profile = sample_profile(&frame, &path(&[(2, 0), (0, 0), (1, 0)])).unwrap();
        assert_eq!(profile, vec![255.0, 0.0, 127.5]);
    }

    #[test]
    fn profile_rejects_outside_points() {
        let frame = Frame::from_fn(2, 2, |_, _| 0.0).unwrap();
        let result = sample_profile(&frame, &path(&[(0, 0), (2, 0)]));
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn disk_of_radius_one_is_a_plus_sign() {
        let mut offsets = disk_offsets(1);
        offsets.sort_unstable();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn radius_zero_is_identity() {
        let frame = Frame::from_fn(4, 3, |x, y| f64::from(x * y)).unwrap();
        assert_eq!(disk_average(&frame, 0), frame);
    }

    #[test]
    fn constant_frame_is_unchanged() {
        // Constant input normalizes to zero; use a two-level frame and
        // check a pixel far from the boundary between levels.
        let frame = Frame::from_fn(9, 9, |x, _| if x < 2 { 0.0 } else { 1.0 }).unwrap();
        let averaged = disk_average(&frame, 2);
        assert_eq!(averaged.get(Coord::new(7, 4)), Some(255.0));
        assert_eq!(averaged.dimensions(), frame.dimensions());
    }

    #[test]
    fn single_bright_pixel_spreads_over_the_disk() {
        let frame = Frame::from_fn(5, 5, |x, y| f64::from(u8::from(x == 2 && y == 2))).unwrap();
        let averaged = disk_average(&frame, 1);
        assert_eq!(averaged.get(Coord::new(2, 2)), Some(51.0));
        assert_eq!(averaged.get(Coord::new(2, 1)), Some(51.0));
        assert_eq!(averaged.get(Coord::new(1, 1)), Some(0.0));
    }

    #[test]
    fn boundary_is_mirrored() {
        // Bright left column: at (0, 0) the disk sees (0,0), (1,0), (0,1)
        // plus the mirrored (-1,0) -> (0,0) and (0,-1) -> (0,0).
        let frame = Frame::from_fn(3, 3, |x, _| f64::from(u8::from(x == 0))).unwrap();
        let averaged = disk_average(&frame, 1);
        assert_eq!(averaged.get(Coord::new(0, 0)), Some(255.0 * 4.0 / 5.0));
    }

    #[test]
    fn concat_drops_shared_points() {
        let joined = concat_paths(&[path(&[(0, 0), (1, 0), (2, 0)]), path(&[(2, 0), (2, 1)])]);
        assert_eq!(joined, path(&[(0, 0), (1, 0), (2, 0), (2, 1)]));
    }

    #[test]
    fn concat_keeps_disjoint_segments() {
        let joined = concat_paths(&[path(&[(0, 0)]), path(&[(5, 5), (5, 6)])]);
        assert_eq!(joined.len(), 3);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        assert!(concat_paths(std::iter::empty()).is_empty());
    }
}
