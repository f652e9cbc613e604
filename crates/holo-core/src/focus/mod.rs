//! Autofocus: coarse sweep over the depth range followed by a golden-section
//! refinement around the coarse optimum.

pub mod metric;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OpticalConfig;
use crate::consts::{
    DEFAULT_COARSE_SEARCH_INTERVAL, DEFAULT_FOCUS_MAX_ITERATIONS, DEFAULT_FOCUS_TOLERANCE_FRACTION,
    FOCUS_TIE_RELATIVE, INV_PHI,
};
use crate::error::{HoloError, Result};
use crate::frame::{ComplexFrame, Roi};
use crate::propagate::{PixelPitch, PreparedField, Propagator};

pub use metric::{score_with_metric, FocusMetric};

/// Autofocus search parameters. Depths in meters; `roi` and `margin` in pixels
/// of the field being refocused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusParams {
    /// Scored region; `None` scores the whole field.
    pub roi: Option<Roi>,
    /// Extra pixels propagated around `roi` to keep wrap-around artefacts out
    /// of the scored region.
    pub margin: usize,
    /// (min, max) depth, inclusive.
    pub depth_range: (f64, f64),
    /// Number of equal coarse subdivisions of `depth_range`.
    pub coarse_search_interval: usize,
    pub metric: FocusMetric,
    /// Fine-search bracket width at which refinement stops. `None` uses a
    /// small fraction of the range.
    pub tolerance: Option<f64>,
    pub max_iterations: usize,
}

impl Default for FocusParams {
    fn default() -> Self {
        Self {
            roi: None,
            margin: 0,
            depth_range: (-1.0e-3, 1.0e-3),
            coarse_search_interval: DEFAULT_COARSE_SEARCH_INTERVAL,
            metric: FocusMetric::default(),
            tolerance: None,
            max_iterations: DEFAULT_FOCUS_MAX_ITERATIONS,
        }
    }
}

impl FocusParams {
    pub fn new(depth_range: (f64, f64), coarse_search_interval: usize) -> Self {
        Self {
            depth_range,
            coarse_search_interval,
            ..Self::default()
        }
    }

    /// Upper bound on the number of depths scored, for progress reporting.
    pub fn evaluation_budget(&self) -> usize {
        self.coarse_search_interval + 1 + self.max_iterations + 2
    }

    fn validate(&self) -> Result<(f64, f64)> {
        let (a, b) = self.depth_range;
        if !a.is_finite() || !b.is_finite() {
            return Err(HoloError::InvalidConfiguration(
                "autofocus depth range must be finite".into(),
            ));
        }
        if self.coarse_search_interval == 0 {
            return Err(HoloError::InvalidConfiguration(
                "coarse search interval must be >= 1".into(),
            ));
        }
        if let Some(tol) = self.tolerance {
            if !(tol > 0.0) {
                return Err(HoloError::InvalidConfiguration(
                    "autofocus tolerance must be > 0".into(),
                ));
            }
        }
        Ok((a.min(b), a.max(b)))
    }
}

/// Best depth found and its metric score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocusResult {
    pub depth: f64,
    pub score: f64,
}

/// Find the depth that maximises the focus metric for `field`.
///
/// `pitch` is the sample spacing of `field`; curvature correction from
/// `optics.source_distance` is applied per candidate depth. `field` is not
/// modified and nothing outside the propagator's caches is touched.
pub fn auto_focus(
    propagator: &mut Propagator,
    field: &ComplexFrame,
    optics: &OpticalConfig,
    pitch: PixelPitch,
    params: &FocusParams,
) -> Result<FocusResult> {
    auto_focus_with_progress(propagator, field, optics, pitch, params, |_| {})
}

/// [`auto_focus`] with `on_progress(evaluations_done)` called after each
/// scored depth.
pub fn auto_focus_with_progress(
    propagator: &mut Propagator,
    field: &ComplexFrame,
    optics: &OpticalConfig,
    pitch: PixelPitch,
    params: &FocusParams,
    on_progress: impl Fn(usize),
) -> Result<FocusResult> {
    field.validate()?;
    let (lo, hi) = params.validate()?;
    let (h, w) = field.dim();

    let (region, inner) = match &params.roi {
        Some(roi) => {
            let roi = roi.validated(h, w)?;
            let outer = roi.expanded(params.margin, h, w);
            (field.crop(&outer)?, Some(roi.relative_to(&outer)))
        }
        None => (field.clone(), None),
    };

    let prepared = propagator.prepare(&region)?;
    let mut search = Search {
        propagator,
        prepared: &prepared,
        optics,
        pitch,
        metric: params.metric,
        inner,
        centre: 0.5 * (lo + hi),
        best: None,
        evaluations: 0,
        on_progress: &on_progress,
    };

    if lo == hi {
        search.evaluate(lo)?;
        return search.finish();
    }

    let n = params.coarse_search_interval;
    let step = (hi - lo) / n as f64;
    for i in 0..=n {
        let depth = if i == n { hi } else { lo + step * i as f64 };
        search.evaluate(depth)?;
    }
    let coarse = search.best_depth();
    debug!(coarse_depth = coarse, step, "Coarse focus sweep complete");

    let tolerance = params
        .tolerance
        .unwrap_or((hi - lo) * DEFAULT_FOCUS_TOLERANCE_FRACTION);
    let mut a = (coarse - step).max(lo);
    let mut b = (coarse + step).min(hi);
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = search.evaluate(c)?;
    let mut fd = search.evaluate(d)?;
    for _ in 0..params.max_iterations {
        if (b - a) <= tolerance {
            break;
        }
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = search.evaluate(c)?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = search.evaluate(d)?;
        }
    }

    search.finish()
}

struct Search<'a, F: Fn(usize)> {
    propagator: &'a mut Propagator,
    prepared: &'a PreparedField,
    optics: &'a OpticalConfig,
    pitch: PixelPitch,
    metric: FocusMetric,
    inner: Option<Roi>,
    centre: f64,
    best: Option<FocusResult>,
    evaluations: usize,
    on_progress: &'a F,
}

impl<F: Fn(usize)> Search<'_, F> {
    fn evaluate(&mut self, depth: f64) -> Result<f64> {
        let (eff_depth, scale) = self.optics.plane_wave_equivalent(depth, 1.0)?;
        let field = self.propagator.propagate_prepared(
            self.prepared,
            eff_depth,
            self.optics.wavelength,
            self.pitch.scaled(scale),
        )?;
        let scored = match &self.inner {
            Some(roi) => field.crop(roi)?,
            None => field,
        };
        let score = score_with_metric(&scored.amplitude().data, self.metric);
        self.record(FocusResult { depth, score });
        self.evaluations += 1;
        (self.on_progress)(self.evaluations);
        Ok(score)
    }

    fn record(&mut self, candidate: FocusResult) {
        let better = match &self.best {
            None => true,
            Some(best) => {
                let scale = best.score.abs().max(candidate.score.abs());
                let diff = candidate.score - best.score;
                if diff.abs() <= FOCUS_TIE_RELATIVE * scale {
                    (candidate.depth - self.centre).abs() < (best.depth - self.centre).abs()
                } else {
                    diff > 0.0
                }
            }
        };
        if better {
            self.best = Some(candidate);
        }
    }

    fn best_depth(&self) -> f64 {
        self.best.map_or(self.centre, |b| b.depth)
    }

    fn finish(self) -> Result<FocusResult> {
        let best = self.best.ok_or(HoloError::EmptyInput)?;
        info!(
            depth = best.depth,
            score = best.score,
            evaluations = self.evaluations,
            metric = %self.metric,
            "Autofocus complete"
        );
        Ok(best)
    }
}
