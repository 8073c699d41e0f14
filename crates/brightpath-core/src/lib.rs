//! brightpath-core: Brightest-path tracing and wavefront analysis (sans-IO).
//!
//! A user clicks points on a frame; the brightest path between
//! consecutive clicks is found by Dijkstra search. The traced line is
//! then sampled across a whole sequence of frames, and one position per
//! frame is selected so that the positions move monotonically:
//!
//! clicks -> brightest-path search -> traced line ->
//! per-frame brightness profiles -> smoothing -> monotonic selection.
//!
//! This crate has **no I/O dependencies**. It works on in-memory
//! [`Frame`]s; decoding files and writing results live in
//! `brightpath-cli` and `brightpath-export`.

pub mod cursor_list;
pub mod frame;
pub mod history;
pub mod profile;
pub mod search;
pub mod session;
pub mod smoothing;
pub mod tracer;
pub mod types;
pub mod wavefront;

pub use cursor_list::{CursorList, Node, NodeId};
pub use frame::Frame;
pub use history::{Action, HistoryTree, Position};
pub use search::{PathSearcher, SearchConfig};
pub use session::{Session, SessionConfig, SessionState};
pub use smoothing::SmoothingMode;
pub use tracer::{LineTracer, TracerKind};
pub use types::{CancelToken, Coord, CoreError, Dimensions, Path};
pub use wavefront::{
    AnalyzerConfig, Direction, Wavefront, WavefrontAnalyzer, WavefrontPoint, select_wavefront,
};

/// Run the wavefront analysis over a sequence of frames.
///
/// # Steps
///
/// 1. Disk-average every frame with `radius` (0 skips averaging)
/// 2. Sample each averaged frame along `line`, origin first
/// 3. Smooth each profile with the configured filter
/// 4. Select the monotonic wavefront and shift it back onto `line`
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `line` is empty or leaves a
/// frame, or if smoothing or selection rejects the profiles (for
/// example, a window wider than the line).
pub fn analyze_frames(
    frames: &[Frame],
    line: &Path,
    radius: u32,
    config: &AnalyzerConfig,
) -> Result<Wavefront, CoreError> {
    if line.is_empty() {
        return Err(CoreError::invalid("the traced line is empty"));
    }

    let curves = frames
        .iter()
        .map(|frame| profile::sample_profile(&profile::disk_average(frame, radius), line))
        .collect::<Result<Vec<_>, _>>()?;

    let mut analyzer = WavefrontAnalyzer::new(*config);
    analyzer.select(&curves).cloned()
}
