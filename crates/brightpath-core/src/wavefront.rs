//! Cross-frame wavefront selection.
//!
//! Given one smoothed brightness curve per frame, pick one sample index
//! per frame so that the indices move strictly in one direction across
//! the whole sequence and the weighted sum
//!
//! ```text
//! Σ_f curve[f][idx_f] + Σ_{f < r-1} weight_factor · idx_f
//! ```
//!
//! is maximal. The last frame's sample carries no positional weight. Both orientations are solved by the same backward
//! dynamic program; the decreasing one runs on mirrored rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::smoothing::{SmoothingMode, smooth};
use crate::types::CoreError;

/// Direction the selected indices move across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Each frame's index exceeds the previous one.
    Increasing,
    /// Each frame's index is below the previous one.
    Decreasing,
}

/// The selected sample of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavefrontPoint {
    /// Frame number, starting at 0.
    pub frame: usize,
    /// Samples from the line's origin.
    pub index: usize,
}

/// A complete monotonic selection, one point per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wavefront {
    /// One point per frame, in frame order.
    pub points: Vec<WavefrontPoint>,
    /// Objective value of the selection.
    pub total: f64,
    /// Orientation that won.
    pub direction: Direction,
}

impl Wavefront {
    /// Selected index for `frame`, if the frame is part of the selection.
    #[must_use]
    pub fn index_at(&self, frame: usize) -> Option<usize> {
        self.points
            .iter()
            .find(|p| p.frame == frame)
            .map(|p| p.index)
    }

    fn shifted(mut self, offset: usize) -> Self {
        for point in &mut self.points {
            point.index += offset;
        }
        self
    }
}

fn validate(curves: &[Vec<f64>], weight_factor: f64) -> Result<usize, CoreError> {
    if !weight_factor.is_finite() {
        return Err(CoreError::invalid(format!(
            "weight factor must be finite, got {weight_factor}"
        )));
    }
    let first = curves
        .first()
        .ok_or_else(|| CoreError::invalid("no frames to select from"))?;
    let samples = first.len();
    if samples == 0 {
        return Err(CoreError::invalid("curves must not be empty"));
    }
    for (frame, curve) in curves.iter().enumerate() {
        if curve.len() != samples {
            return Err(CoreError::invalid(format!(
                "frame {frame} has {} samples, expected {samples}",
                curve.len()
            )));
        }
        if curve.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::invalid(format!(
                "frame {frame} contains a non-finite value"
            )));
        }
    }
    if samples < curves.len() {
        return Err(CoreError::invalid(format!(
            "{} frames need at least as many samples for a strictly monotonic selection, got {samples}",
            curves.len()
        )));
    }
    Ok(samples)
}

/// Backward DP for strictly increasing indices over a pre-weighted
/// table. Returns the chosen index per row and the optimal total.
///
/// Ties prefer the smallest successor and the smallest first index.
fn solve_increasing(table: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let rows = table.len();
    let cols = table.first().map_or(0, Vec::len);

    let mut best = vec![vec![f64::NEG_INFINITY; cols]; rows];
    let mut next = vec![vec![usize::MAX; cols]; rows];
    best[rows - 1].clone_from(&table[rows - 1]);

    for i in (0..rows - 1).rev() {
        // Running maximum of best[i + 1][k] over k > j, scanned right to
        // left; `>=` keeps the leftmost k among equals.
        let mut run_value = f64::NEG_INFINITY;
        let mut run_index = usize::MAX;
        for j in (0..cols).rev() {
            if run_value > f64::NEG_INFINITY {
                best[i][j] = table[i][j] + run_value;
                next[i][j] = run_index;
            }
            let candidate = best[i + 1][j];
            if candidate > f64::NEG_INFINITY && candidate >= run_value {
                run_value = candidate;
                run_index = j;
            }
        }
    }

    let (start, total) = best[0].iter().copied().enumerate().fold(
        (0, f64::NEG_INFINITY),
        |(at, max), (j, v)| if v > max { (j, v) } else { (at, max) },
    );

    let mut indices = Vec::with_capacity(rows);
    let mut j = start;
    for row in &next {
        indices.push(j);
        j = row[j];
    }
    (indices, total)
}

/// Select the monotonic wavefront of `curves` (frames × samples).
///
/// The larger of the increasing and decreasing optima wins; an exact tie
/// goes to [`Direction::Increasing`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if there are no frames, a row
/// is empty, rows differ in length, a value or `weight_factor` is not
/// finite, or there are fewer samples than frames.
pub fn select_wavefront(curves: &[Vec<f64>], weight_factor: f64) -> Result<Wavefront, CoreError> {
    let cols = validate(curves, weight_factor)?;
    debug!(frames = curves.len(), samples = cols, "selecting wavefront");

    let last = curves.len() - 1;
    #[allow(clippy::cast_precision_loss)]
    let weighted: Vec<Vec<f64>> = curves
        .iter()
        .enumerate()
        .map(|(frame, curve)| {
            if frame == last {
                return curve.clone();
            }
            curve
                .iter()
                .enumerate()
                .map(|(j, v)| weight_factor.mul_add(j as f64, *v))
                .collect()
        })
        .collect();
    let mirrored: Vec<Vec<f64>> = weighted
        .iter()
        .map(|row| row.iter().rev().copied().collect())
        .collect();

    let (up, up_total) = solve_increasing(&weighted);
    let (down, down_total) = solve_increasing(&mirrored);

    let (indices, total, direction) = if down_total > up_total {
        let indices = down.into_iter().map(|j| cols - 1 - j).collect();
        (indices, down_total, Direction::Decreasing)
    } else {
        (up, up_total, Direction::Increasing)
    };
    debug!(?direction, total, "wavefront selected");

    Ok(Wavefront {
        points: indices
            .into_iter()
            .enumerate()
            .map(|(frame, index)| WavefrontPoint { frame, index })
            .collect(),
        total,
        direction,
    })
}

/// Parameters for [`WavefrontAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Smoothing applied to every curve before selection.
    pub mode: SmoothingMode,
    /// Box-filter width for [`SmoothingMode::MovingAverage`] and
    /// [`SmoothingMode::Gradient`].
    pub window_size: usize,
    /// Standard deviation for [`SmoothingMode::Gaussian`].
    pub sigma: f64,
    /// Per-sample bonus added to the objective for every frame but the
    /// last; positive values favor positions farther from the origin.
    pub weight_factor: f64,
}

impl AnalyzerConfig {
    /// Default box-filter width.
    pub const DEFAULT_WINDOW_SIZE: usize = 20;

    /// Default Gaussian standard deviation.
    pub const DEFAULT_SIGMA: f64 = 5.0;

    /// Default weight factor (no positional bias).
    pub const DEFAULT_WEIGHT_FACTOR: f64 = 0.0;
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: SmoothingMode::default(),
            window_size: Self::DEFAULT_WINDOW_SIZE,
            sigma: Self::DEFAULT_SIGMA,
            weight_factor: Self::DEFAULT_WEIGHT_FACTOR,
        }
    }
}

/// Smooths per-frame curves and selects their wavefront, keeping the
/// most recent result.
#[derive(Debug, Clone, Default)]
pub struct WavefrontAnalyzer {
    config: AnalyzerConfig,
    last: Option<Wavefront>,
}

impl WavefrontAnalyzer {
    /// Create an analyzer with the given configuration.
    #[must_use]
    pub const fn new(config: AnalyzerConfig) -> Self {
        Self { config, last: None }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Smooth one curve with the configured filter.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the box-filter window
    /// does not fit the curve.
    pub fn smooth(&self, curve: &[f64]) -> Result<Vec<f64>, CoreError> {
        smooth(
            curve,
            self.config.mode,
            self.config.window_size,
            self.config.sigma,
        )
    }

    /// Smooth every curve, select the wavefront, and shift indices back
    /// onto the unsmoothed sample positions.
    ///
    /// # Errors
    ///
    /// Propagates smoothing and selection errors; the previous result
    /// is kept on failure.
    pub fn select(&mut self, curves: &[Vec<f64>]) -> Result<&Wavefront, CoreError> {
        let smoothed = curves
            .iter()
            .map(|curve| self.smooth(curve))
            .collect::<Result<Vec<_>, _>>()?;
        let offset = self.config.mode.offset(self.config.window_size);
        let wavefront =
            select_wavefront(&smoothed, self.config.weight_factor)?.shifted(offset);
        Ok(self.last.insert(wavefront))
    }

    /// Most recent successful selection.
    #[must_use]
    pub const fn last(&self) -> Option<&Wavefront> {
        self.last.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn indices(wavefront: &Wavefront) -> Vec<usize> {
        wavefront.points.iter().map(|p| p.index).collect()
    }

    /// Exhaustive maximum over all strictly monotonic selections.
    fn brute_force(curves: &[Vec<f64>], weight: f64) -> f64 {
        fn go(curves: &[Vec<f64>], weight: f64, row: usize, prev: Option<usize>, up: bool) -> f64 {
            if row == curves.len() {
                return 0.0;
            }
            let mut best = f64::NEG_INFINITY;
            for j in 0..curves[row].len() {
                let allowed = match prev {
                    None => true,
                    Some(p) if up => j > p,
                    Some(p) => j < p,
                };
                if allowed {
                    let bonus = if row + 1 == curves.len() { 0.0 } else { weight };
                    #[allow(clippy::cast_precision_loss)]
                    let here = bonus.mul_add(j as f64, curves[row][j]);
                    best = best.max(here + go(curves, weight, row + 1, Some(j), up));
                }
            }
            best
        }
        go(curves, weight, 0, None, true).max(go(curves, weight, 0, None, false))
    }

    #[test]
    fn diagonal_tie_prefers_increasing() {
        // curve[i][j] = i + j is symmetric under both orientations.
        let curves: Vec<Vec<f64>> = (0..4)
            .map(|i| (0..4).map(|j| f64::from(i + j)).collect())
            .collect();
        let wavefront = select_wavefront(&curves, 0.0).unwrap();
        assert_eq!(wavefront.direction, Direction::Increasing);
        assert_eq!(indices(&wavefront), vec![0, 1, 2, 3]);
        assert_eq!(wavefront.total, 12.0);
    }

    #[test]
    fn decreasing_data_selects_decreasing() {
        let curves = vec![
            vec![0.0, 0.0, 0.0, 9.0],
            vec![0.0, 0.0, 9.0, 0.0],
            vec![9.0, 0.0, 0.0, 0.0],
        ];
        let wavefront = select_wavefront(&curves, 0.0).unwrap();
        assert_eq!(wavefront.direction, Direction::Decreasing);
        assert_eq!(indices(&wavefront), vec![3, 2, 0]);
        assert_eq!(wavefront.total, 27.0);
    }

    #[test]
    fn weight_factor_pulls_outward() {
        let curves = vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]];
        let flat = select_wavefront(&curves, 0.0).unwrap();
        assert_eq!(flat.direction, Direction::Increasing);
        assert_eq!(flat.total, 1.0);
        let biased = select_wavefront(&curves, 2.0).unwrap();
        assert_eq!(biased.direction, Direction::Decreasing);
        assert_eq!(indices(&biased), vec![2, 0]);
        assert_eq!(biased.total, 5.0);
    }

    #[test]
    fn last_frame_carries_no_weight() {
        let curves = vec![vec![0.0, 0.0, 0.0], vec![5.0, 0.0, 0.0]];
        let wavefront = select_wavefront(&curves, 10.0).unwrap();
        // Increasing tops out at (1, 2) = 10; weighting the last frame
        // would make it 30 and win.
        assert_eq!(wavefront.direction, Direction::Decreasing);
        assert_eq!(indices(&wavefront), vec![2, 0]);
        assert_eq!(wavefront.total, 25.0);
    }

    #[test]
    fn single_frame_picks_the_maximum() {
        let wavefront = select_wavefront(&[vec![3.0, 8.0, 1.0]], 0.0).unwrap();
        assert_eq!(indices(&wavefront), vec![1]);
    }

    #[test]
    fn square_table_is_forced_to_a_diagonal() {
        let curves = vec![vec![0.0, 5.0], vec![5.0, 0.0]];
        let wavefront = select_wavefront(&curves, 0.0).unwrap();
        assert_eq!(wavefront.direction, Direction::Decreasing);
        assert_eq!(indices(&wavefront), vec![1, 0]);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let invalid = |curves: &[Vec<f64>], w: f64| {
            matches!(
                select_wavefront(curves, w),
                Err(CoreError::InvalidArgument(_))
            )
        };
        assert!(invalid(&[], 0.0));
        assert!(invalid(&[vec![]], 0.0));
        assert!(invalid(&[vec![1.0, 2.0], vec![1.0]], 0.0));
        assert!(invalid(&[vec![1.0], vec![2.0]], 0.0));
        assert!(invalid(&[vec![1.0, f64::NAN]], 0.0));
        assert!(invalid(&[vec![1.0, 2.0]], f64::INFINITY));
    }

    #[test]
    fn index_at_looks_up_frames() {
        let wavefront = select_wavefront(&[vec![0.0, 1.0], vec![0.0, 1.0]], 0.0).unwrap();
        assert_eq!(wavefront.index_at(0), Some(0));
        assert_eq!(wavefront.index_at(1), Some(1));
        assert_eq!(wavefront.index_at(2), None);
    }

    #[test]
    fn analyzer_shifts_box_filter_indices() {
        let config = AnalyzerConfig {
            window_size: 3,
            ..AnalyzerConfig::default()
        };
        let mut analyzer = WavefrontAnalyzer::new(config);
        let mut early = vec![0.0; 12];
        early[4] = 30.0;
        let mut late = vec![0.0; 12];
        late[8] = 30.0;
        let wavefront = analyzer.select(&[early.clone(), late.clone()]).unwrap().clone();
        // The first curve's moving average peaks at window starts 2..=4;
        // the earliest wins and the half-window offset adds one.
        assert_eq!(indices(&wavefront), vec![3, 7]);
        assert_eq!(analyzer.last(), Some(&wavefront));

        let mut raw = WavefrontAnalyzer::new(AnalyzerConfig {
            mode: SmoothingMode::Raw,
            ..config
        });
        assert_eq!(indices(raw.select(&[early, late]).unwrap()), vec![4, 8]);
    }

    #[test]
    fn analyzer_keeps_last_on_error() {
        let mut analyzer = WavefrontAnalyzer::new(AnalyzerConfig {
            mode: SmoothingMode::Raw,
            ..AnalyzerConfig::default()
        });
        analyzer.select(&[vec![1.0, 0.0]]).unwrap();
        assert!(analyzer.select(&[]).is_err());
        assert_eq!(analyzer.last().map(|w| w.points.len()), Some(1));
    }

    #[test]
    fn analyzer_window_larger_than_curve_is_rejected() {
        let mut analyzer = WavefrontAnalyzer::default();
        assert!(matches!(
            analyzer.select(&[vec![0.0; 5]]),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn config_defaults_and_partial_json() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.mode, SmoothingMode::MovingAverage);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.sigma, 5.0);
        assert_eq!(config.weight_factor, 0.0);

        let parsed: AnalyzerConfig = serde_json::from_str(r#"{"window_size": 7}"#).unwrap();
        assert_eq!(parsed.window_size, 7);
        assert_eq!(parsed.sigma, AnalyzerConfig::DEFAULT_SIGMA);
    }

    fn table() -> impl Strategy<Value = Vec<Vec<f64>>> {
        (1usize..5, 0usize..4).prop_flat_map(|(rows, extra)| {
            prop::collection::vec(
                prop::collection::vec((0u8..20).prop_map(f64::from), rows + extra),
                rows,
            )
        })
    }

    proptest! {
        #[test]
        fn selection_is_monotonic_and_optimal(curves in table(), weight in -2i8..=2) {
            let weight = f64::from(weight);
            let wavefront = select_wavefront(&curves, weight).unwrap();
            let idx = indices(&wavefront);
            prop_assert_eq!(idx.len(), curves.len());
            match wavefront.direction {
                Direction::Increasing => prop_assert!(idx.windows(2).all(|w| w[0] < w[1])),
                Direction::Decreasing => prop_assert!(idx.windows(2).all(|w| w[0] > w[1])),
            }
            #[allow(clippy::cast_precision_loss)]
            let recomputed: f64 = idx
                .iter()
                .enumerate()
                .map(|(f, &j)| {
                    let bonus = if f + 1 == curves.len() { 0.0 } else { weight };
                    bonus.mul_add(j as f64, curves[f][j])
                })
                .sum();
            prop_assert_eq!(recomputed, wavefront.total);
            prop_assert_eq!(wavefront.total, brute_force(&curves, weight));
        }
    }
}
