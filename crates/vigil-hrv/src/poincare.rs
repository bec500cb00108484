//! Nonlinear HRV: Poincaré plot axis ratio.

/// SD1/SD2 ratio of the Poincaré ellipse fitted to successive interval
/// pairs.
///
/// SD1² = ½·var(ΔNN) captures short-term variability, SD2² = 2·var(NN) −
/// ½·var(ΔNN) long-term variability. Returns `None` when SD2 is zero,
/// negative under the estimator, or otherwise non-finite; the caller
/// substitutes the documented default.
pub(crate) fn sd1_sd2_ratio(intervals_ms: &[f64]) -> Option<f64> {
    if intervals_ms.len() < 3 {
        return None;
    }

    let diffs: Vec<f64> = intervals_ms
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();

    let var_nn = population_variance(intervals_ms);
    let var_diff = population_variance(&diffs);

    let sd1 = (var_diff / 2.0).sqrt();
    let sd2_sq = 2.0 * var_nn - var_diff / 2.0;
    if sd2_sq <= 0.0 {
        return None;
    }
    let sd2 = sd2_sq.sqrt();
    if sd2 == 0.0 {
        return None;
    }

    let ratio = sd1 / sd2;
    ratio.is_finite().then_some(ratio)
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_at_least_three_intervals() {
        assert_eq!(sd1_sd2_ratio(&[800.0, 820.0]), None);
    }

    #[test]
    fn monotone_ramp_has_zero_short_term_variability() {
        // Constant successive differences: SD1 = 0, SD2 > 0.
        let intervals = [800.0, 820.0, 840.0, 860.0, 880.0];
        let ratio = sd1_sd2_ratio(&intervals).unwrap();
        assert!(ratio.abs() < 1e-9, "ratio = {ratio}");
    }

    #[test]
    fn pure_alternation_is_degenerate() {
        // Alternating series puts all variance into SD1; the SD2 estimator
        // goes non-positive and the caller falls back to the default.
        let intervals = [800.0, 850.0, 800.0, 850.0, 800.0];
        assert_eq!(sd1_sd2_ratio(&intervals), None);
    }

    #[test]
    fn mixed_variability_yields_positive_finite_ratio() {
        let intervals = [800.0, 850.0, 820.0, 870.0, 840.0, 810.0, 860.0];
        let ratio = sd1_sd2_ratio(&intervals).unwrap();
        assert!(ratio > 0.0 && ratio.is_finite());
    }
}
