//! Slider numerics: step snapping, clamping, and the fill percentage shown on
//! the slider track.

use serde::{Deserialize, Serialize};

/// Step used whenever a node carries a zero or non-numeric step.
pub const DEFAULT_STEP: f64 = 0.01;

/// Value and range of a float slider node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for SliderValue {
    fn default() -> Self {
        Self {
            value: 0.5,
            min: 0.0,
            max: 1.0,
            step: DEFAULT_STEP,
        }
    }
}

/// Replace a zero or non-finite step with [`DEFAULT_STEP`].
pub fn sanitize_step(step: f64) -> f64 {
    if step.is_finite() && step != 0.0 {
        step
    } else {
        DEFAULT_STEP
    }
}

/// Half-up rounding (`-2.5 → -2`, `2.5 → 3`), the tie rule of the browser's
/// `Math.round`. `f64::round` rounds ties away from zero instead.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Snap `input` to the nearest multiple of `step` from `min`, then clamp to
/// `[min, max]`.
pub fn snap(input: f64, min: f64, max: f64, step: f64) -> f64 {
    let step = sanitize_step(step);
    let steps = round_half_up((input - min) / step);
    (min + steps * step).max(min).min(max)
}

impl SliderValue {
    /// Build from raw node properties, repairing the step.
    pub fn new(value: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            value,
            min,
            max,
            step: sanitize_step(step),
        }
    }

    /// Snap an arbitrary input against this slider's range.
    pub fn snap(&self, input: f64) -> f64 {
        snap(input, self.min, self.max, self.step)
    }

    /// Position of the value along the track, in percent.
    pub fn fill_percentage(&self) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        (self.value - self.min) / span * 100.0
    }

    /// Apply a range edit. Returns `false` (and changes nothing) unless
    /// `min < max`. The current value is pulled back inside the new range.
    pub fn set_range(&mut self, min: f64, max: f64, step: f64) -> bool {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return false;
        }
        self.min = min;
        self.max = max;
        self.step = sanitize_step(step);
        self.value = self.value.clamp(min, max);
        true
    }
}
