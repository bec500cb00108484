//! Frequency-domain HRV: LF/HF power ratio.
//!
//! The unevenly spaced inter-beat series is linearly resampled at 4 Hz,
//! mean-removed, Hann-windowed and transformed with a direct DFT. Interval
//! series here are a few dozen points at most, so the quadratic transform is
//! cheaper than pulling in an FFT plan.

use num_complex::Complex64;

/// Resampling rate for the interval tachogram (Hz).
const RESAMPLE_HZ: f64 = 4.0;

/// Low-frequency band (Hz), sympathetic + parasympathetic activity.
const LF_BAND: (f64, f64) = (0.04, 0.15);
/// High-frequency band (Hz), respiratory-coupled parasympathetic activity.
const HF_BAND: (f64, f64) = (0.15, 0.40);

/// LF/HF spectral power ratio of an inter-beat interval series.
///
/// Returns `None` whenever the estimate would be degenerate (too few
/// intervals, too short a record for both bands to contain spectral lines,
/// or zero high-frequency power); the caller substitutes the documented
/// default.
pub(crate) fn lf_hf_ratio(intervals_ms: &[f64]) -> Option<f64> {
    if intervals_ms.len() < 4 {
        return None;
    }

    // Beat timestamps in seconds, relative to the first beat.
    let mut times = Vec::with_capacity(intervals_ms.len());
    let mut t = 0.0;
    for iv in intervals_ms {
        if *iv <= 0.0 || !iv.is_finite() {
            return None;
        }
        t += iv / 1000.0;
        times.push(t);
    }

    let duration = times[times.len() - 1] - times[0];
    let n = (duration * RESAMPLE_HZ) as usize;
    if n < 8 {
        return None;
    }

    // Linear interpolation of the tachogram onto a uniform grid.
    let mut resampled = Vec::with_capacity(n);
    let mut segment = 0;
    for k in 0..n {
        let tk = times[0] + k as f64 / RESAMPLE_HZ;
        while segment + 1 < times.len() - 1 && times[segment + 1] < tk {
            segment += 1;
        }
        let (t0, t1) = (times[segment], times[segment + 1]);
        let (v0, v1) = (intervals_ms[segment], intervals_ms[segment + 1]);
        let alpha = if t1 > t0 { (tk - t0) / (t1 - t0) } else { 0.0 };
        resampled.push(v0 + (v1 - v0) * alpha.clamp(0.0, 1.0));
    }

    let mean = resampled.iter().sum::<f64>() / n as f64;
    let windowed: Vec<f64> = resampled
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let hann = 0.5
                * (1.0
                    - (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos());
            (v - mean) * hann
        })
        .collect();

    let mut lf_power = 0.0;
    let mut hf_power = 0.0;
    for k in 1..n / 2 {
        let freq = k as f64 * RESAMPLE_HZ / n as f64;
        if freq < LF_BAND.0 || freq > HF_BAND.1 {
            continue;
        }
        let mut acc = Complex64::new(0.0, 0.0);
        for (i, v) in windowed.iter().enumerate() {
            let angle = -2.0 * std::f64::consts::PI * (k * i) as f64 / n as f64;
            acc += Complex64::new(*v, 0.0) * Complex64::new(angle.cos(), angle.sin());
        }
        let power = acc.norm_sqr() / n as f64;
        if freq < LF_BAND.1 {
            lf_power += power;
        } else {
            hf_power += power;
        }
    }

    if hf_power <= 0.0 || lf_power < 0.0 {
        return None;
    }
    let ratio = lf_power / hf_power;
    ratio.is_finite().then_some(ratio)
}
