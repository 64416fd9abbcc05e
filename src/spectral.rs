//! Spectral estimation for RR interval series
//!
//! RR intervals are unevenly spaced in time, so the series is first placed on a
//! cumulative time axis, resampled onto a uniform grid by linear interpolation
//! and linearly detrended. Power spectral density is then estimated with Welch's
//! method (periodic Hann window, 50% overlap, per-segment mean removal,
//! one-sided density scaling, mean averaging).

use crate::error::ComputeError;
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Shortest resampled series accepted by [`welch`] with `nperseg = len / 2`
pub const MIN_RESAMPLED_SAMPLES: usize = 8;

/// One-sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Bin frequencies (Hz), ascending from 0
    pub frequencies: Vec<f64>,
    /// Power density per bin (signal units² / Hz)
    pub density: Vec<f64>,
}

impl Psd {
    /// Bins whose frequency falls in the inclusive band
    fn band_bins(&self, band: (f64, f64)) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.density.iter().copied())
            .filter(move |&(f, _)| f >= band.0 && f <= band.1)
    }

    pub fn has_bins(&self, band: (f64, f64)) -> bool {
        self.band_bins(band).next().is_some()
    }

    /// Trapezoidal integral of the density over the band
    pub fn band_power(&self, band: (f64, f64)) -> f64 {
        let (freqs, power): (Vec<f64>, Vec<f64>) = self.band_bins(band).unzip();
        trapezoid(&power, &freqs)
    }

    /// Frequency of the first density maximum within the band
    pub fn peak_frequency(&self, band: (f64, f64)) -> Option<f64> {
        let mut peak: Option<(f64, f64)> = None;
        for (f, p) in self.band_bins(band) {
            match peak {
                Some((_, best)) if p <= best => {}
                _ => peak = Some((f, p)),
            }
        }
        peak.map(|(f, _)| f)
    }
}

/// Beat times in seconds: running sum of intervals (ms) / 1000
pub fn cumulative_time_axis(rr_ms: &[f64]) -> Vec<f64> {
    rr_ms
        .iter()
        .scan(0.0, |acc, &rr| {
            *acc += rr;
            Some(*acc / 1000.0)
        })
        .collect()
}

/// Resample `(times, values)` onto a uniform grid over `[times[0], times[last])`
///
/// Returns `(grid, resampled)`. Fewer than two input points yield empty output.
pub fn resample_linear(times: &[f64], values: &[f64], fs: f64) -> (Vec<f64>, Vec<f64>) {
    if times.len() < 2 || times.len() != values.len() {
        return (Vec::new(), Vec::new());
    }

    let step = 1.0 / fs;
    let start = times[0];
    let stop = times[times.len() - 1];
    let count = ((stop - start) / step).ceil().max(0.0) as usize;

    let mut grid = Vec::with_capacity(count);
    let mut resampled = Vec::with_capacity(count);
    let mut j = 0;

    for k in 0..count {
        let t = start + k as f64 * step;
        while j + 2 < times.len() && times[j + 1] <= t {
            j += 1;
        }
        let (t0, t1) = (times[j], times[j + 1]);
        let (v0, v1) = (values[j], values[j + 1]);
        let frac = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
        grid.push(t);
        resampled.push(v0 + frac * (v1 - v0));
    }

    (grid, resampled)
}

/// Subtract the least-squares line fitted against sample index
pub fn detrend_linear(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mean_y = values.iter().sum::<f64>() / n as f64;
    let mean_x = (n - 1) as f64 / 2.0;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    values
        .iter()
        .enumerate()
        .map(|(i, &y)| y - (mean_y + slope * (i as f64 - mean_x)))
        .collect()
}

/// Sampling frequency implied by a grid: reciprocal of the mean step
pub fn sampling_frequency(grid: &[f64]) -> Option<f64> {
    if grid.len() < 2 {
        return None;
    }
    let mean_step = (grid[grid.len() - 1] - grid[0]) / (grid.len() - 1) as f64;
    if mean_step > 0.0 {
        Some(1.0 / mean_step)
    } else {
        None
    }
}

/// Welch PSD estimate with a periodic Hann window and 50% overlap
pub fn welch(signal: &[f64], fs: f64, nperseg: usize) -> Result<Psd, ComputeError> {
    if nperseg < 2 || signal.len() < nperseg {
        return Err(ComputeError::DegenerateSpectrum(format!(
            "segment length {nperseg} unusable for {} samples",
            signal.len()
        )));
    }
    if !(fs > 0.0) {
        return Err(ComputeError::DegenerateSpectrum(format!(
            "non-positive sampling frequency {fs}"
        )));
    }

    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let segments = (signal.len() - noverlap) / step;

    let window: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / nperseg as f64).cos())
        .collect();
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

    let bins = nperseg / 2 + 1;
    let mut density = vec![0.0; bins];

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);
    let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];

    for s in 0..segments {
        let segment = &signal[s * step..s * step + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *slot = Complex64::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (acc, value) in density.iter_mut().zip(&buffer[..bins]) {
            *acc += value.norm_sqr() * scale;
        }
    }

    // Fold negative frequencies; DC and (even-length) Nyquist appear once
    let last_doubled = if nperseg % 2 == 0 { bins - 1 } else { bins };
    for p in &mut density[1..last_doubled] {
        *p *= 2.0;
    }
    for p in &mut density {
        *p /= segments as f64;
    }

    let frequencies = (0..bins).map(|k| k as f64 * fs / nperseg as f64).collect();

    Ok(Psd {
        frequencies,
        density,
    })
}

/// Trapezoidal rule; fewer than two points integrate to zero
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) / 2.0)
        .sum()
}
