//! Property tests for the analysis pipeline invariants.

use proptest::prelude::*;

use vigil_common::DrowsinessStatus;
use vigil_hrv::{
    analyze_ppg, assess_drowsiness, detect_crash, BaselineMetrics, CrashThresholds, HrvMetrics,
};

fn arbitrary_metrics() -> impl Strategy<Value = HrvMetrics> {
    (
        0.0..220.0f64,
        0.0..300.0f64,
        0.0..300.0f64,
        0.0..100.0f64,
        0.0..20.0f64,
        0.0..5.0f64,
    )
        .prop_map(|(hr, sdnn, rmssd, pnn50, lf_hf_ratio, sd1_sd2_ratio)| HrvMetrics {
            hr,
            sdnn,
            rmssd,
            pnn50,
            lf_hf_ratio,
            sd1_sd2_ratio,
        })
}

fn arbitrary_baseline() -> impl Strategy<Value = BaselineMetrics> {
    (
        30.0..120.0f64,
        0.0..200.0f64,
        0.0..200.0f64,
        0.0..80.0f64,
        0.0..10.0f64,
        0.0..3.0f64,
    )
        .prop_map(
            |(mean_hr, sdnn, rmssd, pnn50, lf_hf_ratio, sd1_sd2_ratio)| BaselineMetrics {
                mean_hr,
                sdnn,
                rmssd,
                pnn50,
                lf_hf_ratio,
                sd1_sd2_ratio,
            },
        )
}

proptest! {
    /// The weighted score never leaves its documented range, and the status
    /// mapping is consistent with the score.
    #[test]
    fn score_stays_in_range(current in arbitrary_metrics(), baseline in arbitrary_baseline()) {
        let assessment = assess_drowsiness(&current, &baseline);
        prop_assert!(assessment.score <= 11);
        match assessment.status {
            DrowsinessStatus::Microsleep => prop_assert!(assessment.score >= 11),
            DrowsinessStatus::Drowsy => prop_assert!((8..11).contains(&assessment.score)),
            DrowsinessStatus::Awake => prop_assert!(assessment.score < 8),
        }
        prop_assert_eq!(assessment.alert, assessment.status != DrowsinessStatus::Awake);
    }

    /// Classification is a pure function of `(current, baseline)`.
    #[test]
    fn classification_is_deterministic(
        current in arbitrary_metrics(),
        baseline in arbitrary_baseline(),
    ) {
        let first = assess_drowsiness(&current, &baseline);
        let second = assess_drowsiness(&current, &baseline);
        prop_assert_eq!(first, second);
    }

    /// Sanitisation maps any bit pattern to finite metrics.
    #[test]
    fn sanitized_metrics_are_always_finite(
        hr in any::<f64>(),
        sdnn in any::<f64>(),
        rmssd in any::<f64>(),
        pnn50 in any::<f64>(),
        lf_hf_ratio in any::<f64>(),
        sd1_sd2_ratio in any::<f64>(),
    ) {
        let metrics = HrvMetrics { hr, sdnn, rmssd, pnn50, lf_hf_ratio, sd1_sd2_ratio };
        prop_assert!(metrics.sanitized().is_finite());
    }

    /// Whatever the input waveform, analysis either fails cleanly or
    /// produces finite metrics.
    #[test]
    fn analysis_never_emits_non_finite_metrics(
        samples in proptest::collection::vec(-1000.0..1000.0f64, 0..400),
        sample_rate in 10u32..120,
    ) {
        if let Ok(metrics) = analyze_ppg(&samples, sample_rate) {
            prop_assert!(metrics.is_finite());
        }
    }

    /// A detection always exceeds at least one of its own thresholds.
    #[test]
    fn crash_detection_is_consistent_with_thresholds(
        x in -30.0..30.0f64,
        y in -30.0..30.0f64,
        z in -30.0..30.0f64,
    ) {
        let thresholds = CrashThresholds::default();
        if let Some(detection) = detect_crash(x, y, z, &thresholds) {
            prop_assert!(
                detection.max_axis_deviation > thresholds.max_axis_g
                    || detection.magnitude > thresholds.vector_excess_g + 9.8
            );
        }
    }
}
