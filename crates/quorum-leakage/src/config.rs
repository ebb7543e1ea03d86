use serde::{Deserialize, Serialize};

/// Leakage detector tuning.
///
/// Every field is runtime data: real rooms and hardware need calibration, so
/// none of these thresholds is load-bearing as a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakageConfig {
    /// RMS below this is treated as silence and rejected before any
    /// correlation work.
    pub mic_energy_threshold: f32,
    /// Normalized cross-correlation above this declares leakage.
    pub leakage_threshold: f32,
    /// A mic/system energy ratio above this overrides a correlation match:
    /// a loud local voice can incidentally correlate with system audio.
    pub energy_ratio_threshold: f32,
    /// Lag search window, in milliseconds.
    pub min_lag_ms: u32,
    pub max_lag_ms: u32,
    pub lag_step_ms: u32,
    /// Reference history kept for time-shifted comparison, in seconds.
    pub reference_secs: f32,
    pub sample_rate_hz: u32,
}

impl Default for LeakageConfig {
    fn default() -> Self {
        Self {
            mic_energy_threshold: 0.01,
            leakage_threshold: 0.5,
            energy_ratio_threshold: 2.0,
            min_lag_ms: 10,
            max_lag_ms: 100,
            lag_step_ms: 10,
            reference_secs: 2.0,
            sample_rate_hz: 16_000,
        }
    }
}

impl LeakageConfig {
    pub fn min_lag_samples(&self) -> usize {
        self.ms_to_samples(self.min_lag_ms)
    }

    pub fn max_lag_samples(&self) -> usize {
        self.ms_to_samples(self.max_lag_ms)
    }

    pub fn lag_step_samples(&self) -> usize {
        self.ms_to_samples(self.lag_step_ms).max(1)
    }

    fn ms_to_samples(&self, ms: u32) -> usize {
        (ms as u64 * self.sample_rate_hz as u64 / 1000) as usize
    }
}
