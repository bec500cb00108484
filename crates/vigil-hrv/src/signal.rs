//! PPG peak detection and time-domain HRV metrics.

use tracing::debug;

use crate::{poincare, spectral};
use crate::{
    BaselineMetrics, HrvError, HrvMetrics, DEFAULT_LF_HF, DEFAULT_SD1_SD2, MIN_PEAKS,
    MIN_PPG_SAMPLES,
};

/// Detrending window as a fraction of a second; wide enough to follow
/// baseline wander without flattening individual pulses.
const DETREND_WINDOW_SECS: f64 = 0.75;

/// Minimum spacing between accepted peaks. 0.33 s caps detection at
/// ~180 bpm, above any plausible riding heart rate.
const REFRACTORY_SECS: f64 = 0.33;

/// Fraction of the maximum detrended excursion a candidate must reach.
const PEAK_THRESHOLD_RATIO: f64 = 0.5;

/// Detect pulse peaks in a raw PPG waveform.
///
/// The signal is detrended with a centred moving average, then local maxima
/// above half the maximum excursion are accepted, keeping the larger of any
/// two candidates closer than the refractory window. Returns sample indices
/// in ascending order.
pub fn detect_peaks(samples: &[f64], sample_rate: u32) -> Vec<usize> {
    if samples.len() < 3 || sample_rate == 0 {
        return Vec::new();
    }

    let half_window = ((DETREND_WINDOW_SECS * sample_rate as f64) as usize / 2).max(1);
    let detrended: Vec<f64> = (0..samples.len())
        .map(|i| {
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window + 1).min(samples.len());
            let mean = samples[lo..hi].iter().sum::<f64>() / (hi - lo) as f64;
            samples[i] - mean
        })
        .collect();

    let max_excursion = detrended.iter().copied().fold(f64::MIN, f64::max);
    if !max_excursion.is_finite() || max_excursion <= 0.0 {
        return Vec::new();
    }
    let threshold = max_excursion * PEAK_THRESHOLD_RATIO;
    let refractory = ((REFRACTORY_SECS * sample_rate as f64) as usize).max(1);

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..detrended.len() - 1 {
        let is_local_max = detrended[i] >= detrended[i - 1] && detrended[i] > detrended[i + 1];
        if !is_local_max || detrended[i] < threshold {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if i - *last < refractory => {
                // Within the refractory window keep the taller candidate.
                if detrended[i] > detrended[*last] {
                    *last = i;
                }
            }
            _ => peaks.push(i),
        }
    }
    peaks
}

/// Convert peak indices into inter-beat intervals in milliseconds.
pub fn peak_intervals_ms(peaks: &[usize], sample_rate: u32) -> Vec<f64> {
    peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 * 1000.0 / sample_rate as f64)
        .collect()
}

fn mean_hr_bpm(intervals_ms: &[f64]) -> f64 {
    let rates: Vec<f64> = intervals_ms
        .iter()
        .filter(|iv| **iv > 0.0)
        .map(|iv| 60_000.0 / iv)
        .collect();
    if rates.is_empty() {
        return f64::NAN;
    }
    rates.iter().sum::<f64>() / rates.len() as f64
}

fn sdnn_ms(intervals_ms: &[f64]) -> f64 {
    let n = intervals_ms.len() as f64;
    let mean = intervals_ms.iter().sum::<f64>() / n;
    let variance = intervals_ms.iter().map(|iv| (iv - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn rmssd_ms(intervals_ms: &[f64]) -> f64 {
    let squared: Vec<f64> = intervals_ms
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .collect();
    if squared.is_empty() {
        return f64::NAN;
    }
    (squared.iter().sum::<f64>() / squared.len() as f64).sqrt()
}

fn pnn50_pct(intervals_ms: &[f64]) -> f64 {
    let diffs: Vec<f64> = intervals_ms
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect();
    if diffs.is_empty() {
        return f64::NAN;
    }
    let over = diffs.iter().filter(|d| **d > 50.0).count();
    over as f64 * 100.0 / diffs.len() as f64
}

/// Extract HRV metrics from one PPG window.
///
/// Fails when the window is shorter than [`MIN_PPG_SAMPLES`] or fewer than
/// [`MIN_PEAKS`] pulse peaks are detectable; callers drop the message in
/// either case. Spectral and Poincaré failures degrade to their documented
/// defaults instead of failing the whole window, and the result is always
/// finite.
pub fn analyze_ppg(samples: &[f64], sample_rate: u32) -> Result<HrvMetrics, HrvError> {
    if samples.len() < MIN_PPG_SAMPLES {
        return Err(HrvError::TooFewSamples { got: samples.len() });
    }

    let peaks = detect_peaks(samples, sample_rate);
    if peaks.len() < MIN_PEAKS {
        return Err(HrvError::TooFewPeaks { got: peaks.len() });
    }

    let intervals = peak_intervals_ms(&peaks, sample_rate);
    let lf_hf_ratio = spectral::lf_hf_ratio(&intervals).unwrap_or(DEFAULT_LF_HF);
    let sd1_sd2_ratio = poincare::sd1_sd2_ratio(&intervals).unwrap_or(DEFAULT_SD1_SD2);

    Ok(HrvMetrics {
        hr: mean_hr_bpm(&intervals),
        sdnn: sdnn_ms(&intervals),
        rmssd: rmssd_ms(&intervals),
        pnn50: pnn50_pct(&intervals),
        lf_hf_ratio,
        sd1_sd2_ratio,
    }
    .sanitized())
}

/// Aggregate several calibration windows into a device baseline.
///
/// Windows that fail analysis are skipped; at least one window must succeed.
/// Each metric is averaged across the surviving windows.
pub fn compute_baseline(
    windows: &[Vec<f64>],
    sample_rate: u32,
) -> Result<BaselineMetrics, HrvError> {
    let mut usable: Vec<HrvMetrics> = Vec::with_capacity(windows.len());
    for (index, window) in windows.iter().enumerate() {
        match analyze_ppg(window, sample_rate) {
            Ok(metrics) => usable.push(metrics),
            Err(reason) => debug!(window = index, %reason, "calibration window skipped"),
        }
    }

    if usable.is_empty() {
        return Err(HrvError::EmptyCalibration);
    }

    let n = usable.len() as f64;
    Ok(BaselineMetrics {
        mean_hr: usable.iter().map(|m| m.hr).sum::<f64>() / n,
        sdnn: usable.iter().map(|m| m.sdnn).sum::<f64>() / n,
        rmssd: usable.iter().map(|m| m.rmssd).sum::<f64>() / n,
        pnn50: usable.iter().map(|m| m.pnn50).sum::<f64>() / n,
        lf_hf_ratio: usable.iter().map(|m| m.lf_hf_ratio).sum::<f64>() / n,
        sd1_sd2_ratio: usable.iter().map(|m| m.sd1_sd2_ratio).sum::<f64>() / n,
    })
}
