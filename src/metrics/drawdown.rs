//! Incremental drawdown tracking over a growth curve.
//!
//! Drawdowns are decimal fractions: 0.25 means the curve is 25% below its
//! running peak.

/// Drawdown tracker for incremental value updates.
#[derive(Debug, Clone)]
pub struct DrawdownTracker {
    /// Current peak value.
    peak: f64,
    /// Current drawdown fraction.
    current_drawdown: f64,
    /// Maximum drawdown seen.
    max_drawdown: f64,
    /// Periods since the last peak.
    current_duration: usize,
    /// Longest stretch below a peak.
    max_duration: usize,
}

impl Default for DrawdownTracker {
    fn default() -> Self {
        Self::with_initial(1.0)
    }
}

impl DrawdownTracker {
    /// Create with the starting value of the curve.
    pub fn with_initial(initial_value: f64) -> Self {
        Self {
            peak: initial_value,
            current_drawdown: 0.0,
            max_drawdown: 0.0,
            current_duration: 0,
            max_duration: 0,
        }
    }

    /// Update with the next value of the curve.
    pub fn update(&mut self, value: f64) {
        if value >= self.peak {
            self.peak = value;
            self.current_drawdown = 0.0;
            self.current_duration = 0;
        } else {
            self.current_drawdown = if self.peak > 0.0 {
                (self.peak - value) / self.peak
            } else {
                0.0
            };
            self.current_duration += 1;

            self.max_drawdown = self.max_drawdown.max(self.current_drawdown);
            self.max_duration = self.max_duration.max(self.current_duration);
        }
    }

    /// Maximum drawdown as a fraction in [0, 1].
    #[inline]
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown.clamp(0.0, 1.0)
    }

    /// Longest run of periods spent below a prior peak.
    #[inline]
    pub fn max_duration(&self) -> usize {
        self.max_duration
    }
}

/// Drawdown curve `value / running_peak - 1` (values <= 0).
pub fn calculate_drawdown_curve(curve: &[f64]) -> Vec<f64> {
    let Some(&first) = curve.first() else {
        return vec![];
    };

    let mut peak = first;
    curve
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            if peak > 0.0 {
                value / peak - 1.0
            } else {
                0.0
            }
        })
        .collect()
}
