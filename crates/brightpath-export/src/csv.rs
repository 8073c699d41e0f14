//! Wavefront CSV serializer and parser.
//!
//! One row per frame, after a fixed header:
//!
//! ```text
//! Image number,Number of pixels from origin
//! 0,14
//! 1,17
//! ```
//!
//! Both columns are non-negative integers. [`to_csv`] returns a `String`;
//! writing it anywhere is the caller's business.

use std::fmt::Write;

use brightpath_core::{Wavefront, WavefrontPoint};

/// First line of every wavefront CSV.
pub const HEADER: &str = "Image number,Number of pixels from origin";

/// Errors from [`parse_csv`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The input does not start with [`HEADER`].
    #[error("missing header, expected `{HEADER}`")]
    MissingHeader,

    /// A data row is not two comma-separated integers.
    #[error("line {line}: malformed row `{content}`")]
    MalformedRow {
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        content: String,
    },
}

/// Serialize `wavefront` as CSV, one row per point in frame order.
///
/// # Examples
///
/// ```
/// use brightpath_core::{Direction, Wavefront, WavefrontPoint};
/// use brightpath_export::to_csv;
///
/// let wavefront = Wavefront {
///     points: vec![WavefrontPoint { frame: 0, index: 3 }],
///     total: 1.0,
///     direction: Direction::Increasing,
/// };
/// assert_eq!(to_csv(&wavefront), "Image number,Number of pixels from origin\n0,3\n");
/// ```
#[must_use]
pub fn to_csv(wavefront: &Wavefront) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    for point in &wavefront.points {
        let _ = writeln!(out, "{},{}", point.frame, point.index);
    }
    out
}

fn parse_row(line: &str) -> Option<WavefrontPoint> {
    let (frame, index) = line.split_once(',')?;
    Some(WavefrontPoint {
        frame: frame.trim().parse().ok()?,
        index: index.trim().parse().ok()?,
    })
}

/// Parse CSV produced by [`to_csv`].
///
/// Blank lines are skipped and `\r\n` line endings are accepted.
///
/// # Errors
///
/// Returns [`ExportError::MissingHeader`] if the first non-blank line is
/// not [`HEADER`], and [`ExportError::MalformedRow`] for any data line
/// that is not two comma-separated non-negative integers.
pub fn parse_csv(input: &str) -> Result<Vec<WavefrontPoint>, ExportError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, header)) if header == HEADER => {}
        _ => return Err(ExportError::MissingHeader),
    }

    lines
        .map(|(line, content)| {
            parse_row(content).ok_or_else(|| ExportError::MalformedRow {
                line,
                content: content.to_owned(),
            })
        })
        .collect()
}
