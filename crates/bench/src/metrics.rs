use crate::data_generator::ExpectedBreak;

/// A reported break is a hit when it lies within this many years of the truth.
pub const HIT_TOLERANCE_YEARS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    FalseAlarm,
    CorrectRejection,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::FalseAlarm => "false-alarm",
            Outcome::CorrectRejection => "ok",
        }
    }
}

/// What a detector reported for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    pub time: Option<f64>,
    pub magnitude: Option<f64>,
}

/// Score of one detection against ground truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionScore {
    pub outcome: Outcome,
    /// Detected minus true onset, in years (hits only).
    pub delay_years: Option<f64>,
    /// Absolute magnitude error (hits only).
    pub magnitude_error: Option<f64>,
}

pub fn score(detection: &Detection, expected: &ExpectedBreak) -> DetectionScore {
    match (detection.time, expected.time) {
        (Some(found), Some(truth)) if (found - truth).abs() <= HIT_TOLERANCE_YEARS => {
            DetectionScore {
                outcome: Outcome::Hit,
                delay_years: Some(found - truth),
                magnitude_error: detection
                    .magnitude
                    .zip(expected.magnitude)
                    .map(|(m, t)| (m - t).abs()),
            }
        }
        // Too far from the true onset to count as the same event.
        (Some(_), Some(_)) | (None, Some(_)) => unscored(Outcome::Miss),
        (Some(_), None) => unscored(Outcome::FalseAlarm),
        (None, None) => unscored(Outcome::CorrectRejection),
    }
}

fn unscored(outcome: Outcome) -> DetectionScore {
    DetectionScore {
        outcome,
        delay_years: None,
        magnitude_error: None,
    }
}

/// Aggregate rates for one detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSummary {
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub mean_delay_years: Option<f64>,
    pub mean_magnitude_error: Option<f64>,
}

pub fn summarize(scores: &[DetectionScore]) -> DetectorSummary {
    let count = |o: Outcome| scores.iter().filter(|s| s.outcome == o).count() as f64;
    let positives = count(Outcome::Hit) + count(Outcome::Miss);
    let negatives = count(Outcome::FalseAlarm) + count(Outcome::CorrectRejection);

    DetectorSummary {
        hit_rate: ratio(count(Outcome::Hit), positives),
        false_alarm_rate: ratio(count(Outcome::FalseAlarm), negatives),
        mean_delay_years: mean_of(scores.iter().filter_map(|s| s.delay_years)),
        mean_magnitude_error: mean_of(scores.iter().filter_map(|s| s.magnitude_error)),
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        f64::NAN
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn truth(time: f64, magnitude: f64) -> ExpectedBreak {
        ExpectedBreak {
            time: Some(time),
            magnitude: Some(magnitude),
        }
    }

    fn none() -> ExpectedBreak {
        ExpectedBreak {
            time: None,
            magnitude: None,
        }
    }

    #[test]
    fn test_hit_with_delay() {
        let d = Detection {
            time: Some(2008.5),
            magnitude: Some(-0.3),
        };
        let s = score(&d, &truth(2008.4, -0.35));
        assert_eq!(s.outcome, Outcome::Hit);
        assert_relative_eq!(s.delay_years.unwrap(), 0.1, epsilon = 1e-9);
        assert_relative_eq!(s.magnitude_error.unwrap(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_outcomes() {
        let far = Detection {
            time: Some(2003.0),
            magnitude: None,
        };
        assert_eq!(score(&far, &truth(2008.4, -0.3)).outcome, Outcome::Miss);
        assert_eq!(score(&Detection::default(), &truth(2008.4, -0.3)).outcome, Outcome::Miss);
        assert_eq!(score(&far, &none()).outcome, Outcome::FalseAlarm);
        assert_eq!(
            score(&Detection::default(), &none()).outcome,
            Outcome::CorrectRejection
        );
    }

    #[test]
    fn test_summarize() {
        let hit = score(
            &Detection {
                time: Some(2008.5),
                magnitude: Some(-0.3),
            },
            &truth(2008.4, -0.3),
        );
        let miss = score(&Detection::default(), &truth(2008.4, -0.3));
        let ok = score(&Detection::default(), &none());
        let summary = summarize(&[hit, miss, ok]);

        assert_relative_eq!(summary.hit_rate, 0.5);
        assert_relative_eq!(summary.false_alarm_rate, 0.0);
        assert_relative_eq!(summary.mean_delay_years.unwrap(), 0.1, epsilon = 1e-9);
        assert!(summarize(&[]).hit_rate.is_nan());
    }
}
