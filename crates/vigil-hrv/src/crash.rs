//! Impact detection from tri-axis accelerometer samples.

use vigil_common::CrashSeverity;

/// Rest gravity subtracted from the vertical axis (m/s² expressed in G
/// units on the wire).
const GRAVITY: f64 = 9.8;

/// Per-axis deviation above which the impact is severe (G).
const SEVERE_AXIS: f64 = 8.0;
/// Vector magnitude above which the impact is severe (G).
const SEVERE_MAGNITUDE: f64 = 15.0;
/// Per-axis deviation above which the impact is moderate (G).
const MODERATE_AXIS: f64 = 6.0;
/// Vector magnitude above which the impact is moderate (G).
const MODERATE_MAGNITUDE: f64 = 12.0;

/// Detection thresholds, overridable from configuration.
#[derive(Debug, Clone, Copy)]
pub struct CrashThresholds {
    /// Gravity-compensated single-axis threshold (G).
    pub max_axis_g: f64,
    /// Excess of the vector magnitude over rest gravity (G).
    pub vector_excess_g: f64,
}

impl Default for CrashThresholds {
    fn default() -> Self {
        Self {
            max_axis_g: 4.0,
            vector_excess_g: 6.0,
        }
    }
}

/// A detected impact with the derived quantities the alert pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashDetection {
    pub severity: CrashSeverity,
    /// `sqrt(x² + y² + z²)`.
    pub magnitude: f64,
    /// `max(|x|, |y|, |z − 9.8|)`.
    pub max_axis_deviation: f64,
}

/// Evaluate one accelerometer sample.
///
/// Both comparisons are strict: a sample sitting exactly on a threshold is
/// not a crash. Returns `None` for normal riding dynamics.
pub fn detect_crash(
    accel_x: f64,
    accel_y: f64,
    accel_z: f64,
    thresholds: &CrashThresholds,
) -> Option<CrashDetection> {
    let magnitude = (accel_x.powi(2) + accel_y.powi(2) + accel_z.powi(2)).sqrt();
    let max_axis_deviation = accel_x
        .abs()
        .max(accel_y.abs())
        .max((accel_z - GRAVITY).abs());

    let is_crash = max_axis_deviation > thresholds.max_axis_g
        || magnitude > thresholds.vector_excess_g + GRAVITY;
    if !is_crash {
        return None;
    }

    let severity = if max_axis_deviation > SEVERE_AXIS || magnitude > SEVERE_MAGNITUDE {
        CrashSeverity::Severe
    } else if max_axis_deviation > MODERATE_AXIS || magnitude > MODERATE_MAGNITUDE {
        CrashSeverity::Moderate
    } else {
        CrashSeverity::Mild
    };

    Some(CrashDetection {
        severity,
        magnitude,
        max_axis_deviation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_device_is_not_a_crash() {
        assert_eq!(detect_crash(0.0, 0.0, 9.8, &CrashThresholds::default()), None);
    }

    #[test]
    fn threshold_comparison_is_strict() {
        // Exactly 4.0 G on one axis: not a crash.
        assert_eq!(detect_crash(4.0, 0.0, 9.8, &CrashThresholds::default()), None);

        // Just over the edge: mild crash.
        let detection = detect_crash(4.0001, 0.0, 9.8, &CrashThresholds::default()).unwrap();
        assert_eq!(detection.severity, CrashSeverity::Mild);
    }

    #[test]
    fn vertical_slam_is_severe() {
        let detection = detect_crash(0.0, 0.0, 25.0, &CrashThresholds::default()).unwrap();
        assert_eq!(detection.severity, CrashSeverity::Severe);
        assert!((detection.max_axis_deviation - 15.2).abs() < 1e-9);
        assert!((detection.magnitude - 25.0).abs() < 1e-9);
    }

    #[test]
    fn severity_buckets_follow_axis_deviation() {
        let mild = detect_crash(5.0, 0.0, 9.8, &CrashThresholds::default()).unwrap();
        assert_eq!(mild.severity, CrashSeverity::Mild);

        let moderate = detect_crash(7.0, 0.0, 9.8, &CrashThresholds::default()).unwrap();
        assert_eq!(moderate.severity, CrashSeverity::Moderate);

        let severe = detect_crash(9.0, 0.0, 9.8, &CrashThresholds::default()).unwrap();
        assert_eq!(severe.severity, CrashSeverity::Severe);
    }

    #[test]
    fn magnitude_alone_can_trigger() {
        // Axis threshold raised out of reach: only the vector-magnitude
        // branch can fire for this diagonal impact.
        let axis_blind = CrashThresholds {
            max_axis_g: 20.0,
            vector_excess_g: 6.0,
        };
        let detection = detect_crash(10.0, 10.0, 9.8, &axis_blind).unwrap();
        assert!(detection.magnitude > 15.8);
        assert_eq!(detection.severity, CrashSeverity::Severe);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let strict = CrashThresholds {
            max_axis_g: 2.0,
            vector_excess_g: 3.0,
        };
        assert!(detect_crash(2.5, 0.0, 9.8, &strict).is_some());
        assert_eq!(detect_crash(2.5, 0.0, 9.8, &CrashThresholds::default()), None);
    }
}
