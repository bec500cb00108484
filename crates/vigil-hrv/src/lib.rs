//! Vigil HRV - PPG signal processing and physiological classification
//!
//! Turns raw photoplethysmography waveforms into heart-rate-variability
//! metrics and classifies rider drowsiness against a per-device baseline.
//!
//! # Pipeline
//! - **Peak detection**: moving-average detrended local maxima with a
//!   refractory window
//! - **Time domain**: mean HR, SDNN, RMSSD, pNN50 over the inter-beat series
//! - **Spectral**: LF/HF ratio from a windowed periodogram of the resampled
//!   interval series
//! - **Nonlinear**: SD1/SD2 from the Poincaré plot
//! - **Classification**: weighted-threshold scoring against the baseline
//!
//! Every metric leaving this crate is finite: NaN or infinity produced by a
//! degenerate signal is replaced by the documented population default.

mod crash;
mod drowsiness;
mod poincare;
mod signal;
mod spectral;

pub use crash::{detect_crash, CrashDetection, CrashThresholds};
pub use drowsiness::{assess_drowsiness, Assessment};
pub use signal::{analyze_ppg, compute_baseline, detect_peaks, peak_intervals_ms};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Population defaults substituted for missing or degenerate metrics
// ============================================================================

/// Default SDNN (ms) for an uncalibrated adult at rest.
pub const DEFAULT_SDNN: f64 = 50.0;
/// Default RMSSD (ms).
pub const DEFAULT_RMSSD: f64 = 40.0;
/// Default pNN50 (%).
pub const DEFAULT_PNN50: f64 = 20.0;
/// Default LF/HF power ratio.
pub const DEFAULT_LF_HF: f64 = 1.5;
/// Default Poincaré SD1/SD2 axis ratio.
pub const DEFAULT_SD1_SD2: f64 = 0.5;
/// Default resting heart rate (bpm).
pub const DEFAULT_HR: f64 = 70.0;

/// Minimum PPG samples accepted for analysis (one second at 50 Hz).
pub const MIN_PPG_SAMPLES: usize = 50;
/// Minimum detectable pulse peaks required for HRV metrics.
pub const MIN_PEAKS: usize = 3;

/// Reasons a PPG window cannot be analysed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HrvError {
    #[error("not enough PPG samples ({got} < {MIN_PPG_SAMPLES})")]
    TooFewSamples { got: usize },

    #[error("not enough detectable peaks ({got} < {MIN_PEAKS})")]
    TooFewPeaks { got: usize },

    #[error("no calibration window produced usable metrics")]
    EmptyCalibration,
}

/// Reference metrics a rider's live signal is compared against.
///
/// Rows are insert-only; the latest per device wins. When a device has never
/// been calibrated the [`BaselineMetrics::general`] population baseline is
/// used instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub mean_hr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub lf_hf_ratio: f64,
    pub sd1_sd2_ratio: f64,
}

impl BaselineMetrics {
    /// Population-invariant fallback baseline.
    pub const fn general() -> Self {
        Self {
            mean_hr: DEFAULT_HR,
            sdnn: DEFAULT_SDNN,
            rmssd: DEFAULT_RMSSD,
            pnn50: DEFAULT_PNN50,
            lf_hf_ratio: DEFAULT_LF_HF,
            sd1_sd2_ratio: DEFAULT_SD1_SD2,
        }
    }
}

/// HRV metrics extracted from one PPG window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvMetrics {
    /// Mean heart rate over the window (bpm).
    pub hr: f64,
    /// Standard deviation of inter-beat intervals (ms).
    pub sdnn: f64,
    /// Root mean square of successive interval differences (ms).
    pub rmssd: f64,
    /// Percentage of successive intervals differing by more than 50 ms.
    pub pnn50: f64,
    /// Low-frequency to high-frequency spectral power ratio.
    pub lf_hf_ratio: f64,
    /// Poincaré ellipse axis ratio.
    pub sd1_sd2_ratio: f64,
}

impl HrvMetrics {
    /// Mean inter-beat interval (ms) implied by the mean heart rate.
    pub fn ibi_ms(&self) -> f64 {
        if self.hr > 0.0 {
            60_000.0 / self.hr
        } else {
            0.0
        }
    }

    /// Replace every non-finite metric with its population default.
    pub fn sanitized(self) -> Self {
        Self {
            hr: finite_or(self.hr, DEFAULT_HR),
            sdnn: finite_or(self.sdnn, DEFAULT_SDNN),
            rmssd: finite_or(self.rmssd, DEFAULT_RMSSD),
            pnn50: finite_or(self.pnn50, DEFAULT_PNN50),
            lf_hf_ratio: finite_or(self.lf_hf_ratio, DEFAULT_LF_HF),
            sd1_sd2_ratio: finite_or(self.sd1_sd2_ratio, DEFAULT_SD1_SD2),
        }
    }

    /// True when every metric is a finite number.
    pub fn is_finite(&self) -> bool {
        self.hr.is_finite()
            && self.sdnn.is_finite()
            && self.rmssd.is_finite()
            && self.pnn50.is_finite()
            && self.lf_hf_ratio.is_finite()
            && self.sd1_sd2_ratio.is_finite()
    }
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_nan_and_infinity_with_defaults() {
        let raw = HrvMetrics {
            hr: f64::NAN,
            sdnn: f64::INFINITY,
            rmssd: 33.0,
            pnn50: f64::NEG_INFINITY,
            lf_hf_ratio: f64::NAN,
            sd1_sd2_ratio: 0.42,
        };
        let clean = raw.sanitized();
        assert_eq!(clean.hr, DEFAULT_HR);
        assert_eq!(clean.sdnn, DEFAULT_SDNN);
        assert_eq!(clean.rmssd, 33.0);
        assert_eq!(clean.pnn50, DEFAULT_PNN50);
        assert_eq!(clean.lf_hf_ratio, DEFAULT_LF_HF);
        assert_eq!(clean.sd1_sd2_ratio, 0.42);
        assert!(clean.is_finite());
    }

    #[test]
    fn ibi_follows_heart_rate() {
        let metrics = HrvMetrics {
            hr: 60.0,
            sdnn: DEFAULT_SDNN,
            rmssd: DEFAULT_RMSSD,
            pnn50: DEFAULT_PNN50,
            lf_hf_ratio: DEFAULT_LF_HF,
            sd1_sd2_ratio: DEFAULT_SD1_SD2,
        };
        assert_eq!(metrics.ibi_ms(), 1000.0);

        let stopped = HrvMetrics { hr: 0.0, ..metrics };
        assert_eq!(stopped.ibi_ms(), 0.0);
    }

    #[test]
    fn general_baseline_matches_documented_defaults() {
        let general = BaselineMetrics::general();
        assert_eq!(general.sdnn, 50.0);
        assert_eq!(general.rmssd, 40.0);
        assert_eq!(general.pnn50, 20.0);
        assert_eq!(general.lf_hf_ratio, 1.5);
        assert_eq!(general.sd1_sd2_ratio, 0.5);
        assert_eq!(general.mean_hr, 70.0);
    }
}
