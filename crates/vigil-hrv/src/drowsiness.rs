//! Multi-factor drowsiness classification.
//!
//! A weighted-threshold model compares the current window's metrics against
//! the rider's baseline. Bands within a factor are mutually exclusive and
//! band edges are strict, so a ratio sitting exactly on a band-1 edge scores
//! the band-2 weight.

use vigil_common::DrowsinessStatus;

use crate::{BaselineMetrics, HrvMetrics};

/// Score at or above which the rider is classified as in microsleep.
const MICROSLEEP_CUTOFF: u8 = 11;
/// Score at or above which the rider is classified as drowsy.
const DROWSY_CUTOFF: u8 = 8;

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// Weighted score in `[0, 11]`.
    pub score: u8,
    pub status: DrowsinessStatus,
    /// True iff the status is anything other than awake.
    pub alert: bool,
    /// Human-readable description of each contributing factor, for event
    /// logs.
    pub alerts: Vec<String>,
}

/// A per-factor baseline value that is zero or non-finite cannot anchor a
/// ratio; fall back to the population baseline for that factor only.
fn effective(value: f64, general: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        general
    }
}

fn drop_pct(baseline: f64, current: f64) -> f64 {
    (baseline - current) / baseline * 100.0
}

fn rise_pct(baseline: f64, current: f64) -> f64 {
    (current - baseline) / baseline * 100.0
}

/// Classify one window of metrics against the effective baseline.
///
/// Pure function of its inputs: identical metrics against an identical
/// baseline always produce the same assessment.
pub fn assess_drowsiness(current: &HrvMetrics, baseline: &BaselineMetrics) -> Assessment {
    let general = BaselineMetrics::general();
    let mut score = 0u8;
    let mut alerts = Vec::new();

    // SDNN collapse: strongest single indicator of autonomic withdrawal.
    let base_sdnn = effective(baseline.sdnn, general.sdnn);
    let sdnn_weight = if current.sdnn < base_sdnn * 0.50 {
        3
    } else if current.sdnn < base_sdnn * 0.65 {
        2
    } else if current.sdnn < base_sdnn * 0.75 {
        1
    } else {
        0
    };
    if sdnn_weight > 0 {
        score += sdnn_weight;
        alerts.push(format!("SDNN dropped {:.1}%", drop_pct(base_sdnn, current.sdnn)));
    }

    let base_rmssd = effective(baseline.rmssd, general.rmssd);
    let rmssd_weight = if current.rmssd < base_rmssd * 0.45 {
        3
    } else if current.rmssd < base_rmssd * 0.60 {
        2
    } else if current.rmssd < base_rmssd * 0.70 {
        1
    } else {
        0
    };
    if rmssd_weight > 0 {
        score += rmssd_weight;
        alerts.push(format!(
            "RMSSD dropped {:.1}%",
            drop_pct(base_rmssd, current.rmssd)
        ));
    }

    let base_pnn50 = effective(baseline.pnn50, general.pnn50);
    let pnn50_weight = if current.pnn50 < base_pnn50 * 0.40 {
        2
    } else if current.pnn50 < base_pnn50 * 0.55 {
        1
    } else {
        0
    };
    if pnn50_weight > 0 {
        score += pnn50_weight;
        alerts.push(format!(
            "pNN50 dropped {:.1}%",
            drop_pct(base_pnn50, current.pnn50)
        ));
    }

    // Sympathetic shift raises LF/HF rather than lowering it.
    let base_lf_hf = effective(baseline.lf_hf_ratio, general.lf_hf_ratio);
    let lf_hf_weight = if current.lf_hf_ratio > base_lf_hf * 1.70 {
        2
    } else if current.lf_hf_ratio > base_lf_hf * 1.50 {
        1
    } else {
        0
    };
    if lf_hf_weight > 0 {
        score += lf_hf_weight;
        alerts.push(format!(
            "LF/HF increased {:.1}%",
            rise_pct(base_lf_hf, current.lf_hf_ratio)
        ));
    }

    let base_sd_ratio = effective(baseline.sd1_sd2_ratio, general.sd1_sd2_ratio);
    let sd_deviation = (current.sd1_sd2_ratio - base_sd_ratio).abs();
    if sd_deviation > base_sd_ratio * 0.60 {
        score += 1;
        alerts.push(format!(
            "SD1/SD2 ratio deviated by {:.1}%",
            sd_deviation / base_sd_ratio * 100.0
        ));
    }

    let status = if score >= MICROSLEEP_CUTOFF {
        DrowsinessStatus::Microsleep
    } else if score >= DROWSY_CUTOFF {
        DrowsinessStatus::Drowsy
    } else {
        DrowsinessStatus::Awake
    };

    Assessment {
        score,
        status,
        alert: status.is_alert(),
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(sdnn: f64, rmssd: f64, pnn50: f64, lf_hf: f64, sd_ratio: f64) -> HrvMetrics {
        HrvMetrics {
            hr: 70.0,
            sdnn,
            rmssd,
            pnn50,
            lf_hf_ratio: lf_hf,
            sd1_sd2_ratio: sd_ratio,
        }
    }

    fn reference_baseline() -> BaselineMetrics {
        BaselineMetrics {
            mean_hr: 70.0,
            sdnn: 50.0,
            rmssd: 40.0,
            pnn50: 20.0,
            lf_hf_ratio: 1.5,
            sd1_sd2_ratio: 0.5,
        }
    }

    #[test]
    fn near_baseline_metrics_stay_awake() {
        let assessment =
            assess_drowsiness(&metrics(48.0, 38.0, 19.0, 1.6, 0.52), &reference_baseline());
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.status, DrowsinessStatus::Awake);
        assert!(!assessment.alert);
        assert!(assessment.alerts.is_empty());
    }

    #[test]
    fn collapsed_metrics_score_microsleep() {
        let assessment =
            assess_drowsiness(&metrics(20.0, 15.0, 6.0, 3.0, 0.1), &reference_baseline());
        assert_eq!(assessment.score, 11);
        assert_eq!(assessment.status, DrowsinessStatus::Microsleep);
        assert!(assessment.alert);
        assert_eq!(assessment.alerts.len(), 5);
    }

    #[test]
    fn partial_collapse_scores_drowsy() {
        let assessment =
            assess_drowsiness(&metrics(25.0, 18.0, 8.0, 2.6, 0.1), &reference_baseline());
        assert!(
            (DROWSY_CUTOFF..MICROSLEEP_CUTOFF).contains(&assessment.score),
            "score = {}",
            assessment.score
        );
        assert_eq!(assessment.status, DrowsinessStatus::Drowsy);
        assert!(assessment.alert);
    }

    #[test]
    fn sdnn_ratio_exactly_at_band_one_edge_scores_band_two() {
        // 25.0 against a baseline of 50.0 is a ratio of exactly 0.50: the
        // strict comparison keeps it out of the 3-point band.
        let assessment =
            assess_drowsiness(&metrics(25.0, 40.0, 20.0, 1.5, 0.5), &reference_baseline());
        assert_eq!(assessment.score, 2);
        assert_eq!(assessment.status, DrowsinessStatus::Awake);
    }

    #[test]
    fn zero_baseline_factors_fall_back_to_population_values() {
        let mut zeroed = reference_baseline();
        zeroed.pnn50 = 0.0;
        zeroed.lf_hf_ratio = 0.0;

        let with_zeroed =
            assess_drowsiness(&metrics(48.0, 38.0, 19.0, 1.6, 0.52), &zeroed);
        let with_general = assess_drowsiness(
            &metrics(48.0, 38.0, 19.0, 1.6, 0.52),
            &reference_baseline(),
        );
        assert_eq!(with_zeroed, with_general);
    }

    #[test]
    fn classification_is_pure() {
        let current = metrics(30.0, 22.0, 9.0, 2.4, 0.2);
        let baseline = reference_baseline();
        let first = assess_drowsiness(&current, &baseline);
        let second = assess_drowsiness(&current, &baseline);
        assert_eq!(first, second);
    }

    #[test]
    fn alert_strings_name_the_factor_and_deviation() {
        let assessment =
            assess_drowsiness(&metrics(20.0, 40.0, 20.0, 1.5, 0.5), &reference_baseline());
        assert_eq!(assessment.alerts, vec!["SDNN dropped 60.0%".to_string()]);
    }
}
