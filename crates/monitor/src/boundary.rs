use common::{BreakError, Result};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Boundary for the OLS-based CUSUM monitoring process
/// (Chu, Stinchcombe & White, 1996).
///
/// At relative time `x = (n + j) / n`, for `n` history observations and `j`
/// monitored ones:
///
/// ```text
/// b(x) = sqrt( x (x - 1) (a² + ln(x / (x - 1))) )
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CusumBoundary {
    critical_value: f64,
}

impl CusumBoundary {
    /// Boundary with an explicit constant `a²`.
    pub fn new(critical_value: f64) -> Result<Self> {
        if !(critical_value.is_finite() && critical_value > 0.0) {
            return Err(BreakError::ConfigError(format!(
                "boundary constant must be positive, got {critical_value}"
            )));
        }
        Ok(Self { critical_value })
    }

    /// Boundary whose crossing probability under no change equals `level`.
    ///
    /// Solves `2 (1 - Φ(a) + a φ(a)) = level` for `a` by bisection; the
    /// left side falls monotonically from 1 at `a = 0`.
    pub fn from_level(level: f64) -> Result<Self> {
        if !(level > 0.0 && level < 1.0) {
            return Err(BreakError::ConfigError(format!(
                "significance level must be in (0, 1), got {level}"
            )));
        }
        let normal = standard_normal()?;
        let (mut lo, mut hi) = (0.0_f64, 10.0_f64);
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if crossing_probability(&normal, mid) > level {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let a = 0.5 * (lo + hi);
        Self::new(a * a)
    }

    /// The constant `a²`.
    pub fn critical_value(&self) -> f64 {
        self.critical_value
    }

    pub fn value(&self, x: f64) -> f64 {
        if x <= 1.0 {
            return 0.0;
        }
        (x * (x - 1.0) * (self.critical_value + (x / (x - 1.0)).ln())).sqrt()
    }
}

fn crossing_probability(normal: &Normal, a: f64) -> f64 {
    2.0 * (1.0 - normal.cdf(a) + a * normal.pdf(a))
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| BreakError::ModelError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_constants() {
        assert_relative_eq!(
            CusumBoundary::from_level(0.05).unwrap().critical_value(),
            7.815,
            epsilon = 0.01
        );
        assert_relative_eq!(
            CusumBoundary::from_level(0.10).unwrap().critical_value(),
            6.251,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_stricter_level_widens_boundary() {
        let loose = CusumBoundary::from_level(0.10).unwrap();
        let strict = CusumBoundary::from_level(0.01).unwrap();
        assert!(strict.critical_value() > loose.critical_value());
        assert!(strict.value(1.5) > loose.value(1.5));
    }

    #[test]
    fn test_boundary_shape() {
        let b = CusumBoundary::new(7.78).unwrap();
        assert_eq!(b.value(1.0), 0.0);
        // First monitoring point after 161 history observations.
        assert_relative_eq!(b.value(162.0 / 161.0), 0.2836, epsilon = 1e-3);
        // Grows with monitoring length.
        assert!(b.value(1.2) < b.value(1.5));
        assert!(b.value(1.5) < b.value(3.0));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(CusumBoundary::new(0.0).is_err());
        assert!(CusumBoundary::new(f64::NAN).is_err());
        assert!(CusumBoundary::from_level(0.0).is_err());
        assert!(CusumBoundary::from_level(1.0).is_err());
    }
}
