//! Single-pass moment accumulators using Welford's algorithm.

/// Running mean and variance.
#[derive(Debug, Clone, Default)]
pub struct RunningMoments {
    /// Number of observations.
    count: usize,
    /// Running mean.
    mean: f64,
    /// Running sum of squared deviations.
    m2: f64,
}

impl RunningMoments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    #[inline]
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1 denominator).
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Running co-moment of two series.
#[derive(Debug, Clone, Default)]
pub struct RunningCovariance {
    count: usize,
    mean_x: f64,
    mean_y: f64,
    /// Running sum of cross deviations.
    c: f64,
}

impl RunningCovariance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one paired observation.
    #[inline]
    pub fn update(&mut self, x: f64, y: f64) {
        self.count += 1;
        let n = self.count as f64;
        let dx = x - self.mean_x;
        self.mean_x += dx / n;
        self.mean_y += (y - self.mean_y) / n;
        self.c += dx * (y - self.mean_y);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sample covariance (n - 1 denominator).
    pub fn covariance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.c / (self.count - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_moments() {
        let mut m = RunningMoments::new();
        for v in [0.01, 0.02, -0.01, 0.03, 0.00] {
            m.update(v);
        }
        assert_eq!(m.count(), 5);
        assert!((m.mean() - 0.01).abs() < 1e-12);
        // Sample variance of the values above.
        let expected = (0.0 + 0.0001 + 0.0004 + 0.0004 + 0.0001) / 4.0;
        assert!((m.variance() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_welford_numerical_stability() {
        let mut m = RunningMoments::new();
        for i in 0..10_000 {
            m.update(1e9 + (i % 2) as f64);
        }
        assert!((m.mean() - (1e9 + 0.5)).abs() < 1e-6);
        assert!((m.variance() - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_covariance_matches_variance_on_same_series() {
        let mut cov = RunningCovariance::new();
        let mut var = RunningMoments::new();
        for v in [1.0, 4.0, 2.0, 8.0, 5.0] {
            cov.update(v, v);
            var.update(v);
        }
        assert!((cov.covariance() - var.variance()).abs() < 1e-12);
    }

    #[test]
    fn test_negative_covariance() {
        let mut cov = RunningCovariance::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            cov.update(v, -v);
        }
        assert!(cov.covariance() < 0.0);
        assert_eq!(cov.count(), 4);
    }

    #[test]
    fn test_single_observation_has_zero_variance() {
        let mut m = RunningMoments::new();
        m.update(3.0);
        assert_eq!(m.variance(), 0.0);
    }
}
