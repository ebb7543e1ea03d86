use parking_lot::Mutex;
use tracing::{debug, trace};

use quorum_audio::RingSampleBuffer;

use crate::config::LeakageConfig;
use crate::energy::rms;
use crate::stats::{LeakageStats, LeakageStatsSnapshot};
use crate::types::{LeakageDecision, LeakageReason};

/// Decides per microphone frame whether energy is genuine local speech or
/// acoustic leakage of the system output played through speakers.
///
/// The reference ring and the counters are the only shared state; the ring
/// sits behind a mutex scoped to the append/read critical section, the
/// counters are atomics. All methods take `&self`, so reference producer and
/// decision consumer may run on different threads.
///
/// There are no fatal errors here: every input yields a decision, and the
/// defaults lean toward "assume genuine" whenever information is
/// insufficient, because dropping real user speech is worse than letting the
/// occasional echo through.
pub struct LeakageDetector {
    config: LeakageConfig,
    reference: Mutex<RingSampleBuffer>,
    stats: LeakageStats,
}

impl LeakageDetector {
    pub fn new(config: LeakageConfig) -> Self {
        let reference = RingSampleBuffer::with_duration(config.reference_secs, config.sample_rate_hz);
        Self {
            config,
            reference: Mutex::new(reference),
            stats: LeakageStats::default(),
        }
    }

    pub fn config(&self) -> &LeakageConfig {
        &self.config
    }

    /// Feed reference (system output) audio. The only ring mutator; called
    /// for every captured system frame regardless of mic-side decisions.
    pub fn process_system_audio(&self, samples: &[f32]) {
        self.reference.lock().append(samples);
    }

    /// Classify one microphone frame against the recent reference history.
    ///
    /// `system_level` is the caller's current system output RMS; absent or
    /// zero, the energy ratio is treated as infinite.
    pub fn detect_genuine_speech(
        &self,
        frame: &[f32],
        system_level: Option<f32>,
    ) -> LeakageDecision {
        if frame.is_empty() {
            self.stats.record_silence();
            return LeakageDecision::without_scan(false, 1.0, LeakageReason::NoAudio);
        }

        // Cheap rejection path before any correlation work.
        let mic_rms = rms(frame);
        if mic_rms < self.config.mic_energy_threshold {
            self.stats.record_silence();
            return LeakageDecision::without_scan(false, 1.0, LeakageReason::BelowEnergyThreshold);
        }

        let max_lag = self.config.max_lag_samples();
        let needed = frame.len() + max_lag;
        // Copy out under the lock, correlate outside it.
        let recent = self.reference.lock().last_n(needed);
        let recent = match recent {
            Some(r) => r,
            None => {
                self.stats.record_assumed_genuine();
                return LeakageDecision::without_scan(
                    true,
                    0.5,
                    LeakageReason::InsufficientReference,
                );
            }
        };

        let (best_lag, best_corr) = self.scan_lags(frame, &recent);
        let max_corr = best_corr.abs();

        let ratio = match system_level {
            Some(level) if level > 0.0 => mic_rms / level,
            _ => f32::INFINITY,
        };

        let correlated = max_corr > self.config.leakage_threshold;
        if correlated && ratio <= self.config.energy_ratio_threshold {
            self.stats.record_leakage();
            debug!(
                target: "leakage",
                correlation = max_corr,
                lag = best_lag,
                ratio,
                "suppressing leaked frame"
            );
            return LeakageDecision {
                is_genuine_speech: false,
                confidence: max_corr,
                reason: LeakageReason::LeakageDetected,
                best_lag_samples: best_lag,
                correlation: best_corr,
            };
        }

        self.stats.record_genuine();
        let reason = if correlated {
            // Loud close-talking mic overrides the correlation match.
            LeakageReason::HighEnergyRatio
        } else {
            LeakageReason::LowCorrelation
        };
        trace!(target: "leakage", correlation = max_corr, lag = best_lag, ratio, ?reason, "genuine frame");
        LeakageDecision {
            is_genuine_speech: true,
            confidence: (1.0 - max_corr).clamp(0.0, 1.0),
            reason,
            best_lag_samples: best_lag,
            correlation: best_corr,
        }
    }

    /// Search the configured lag window for the strongest normalized
    /// cross-correlation between the mic frame and an equal-length reference
    /// window ending `lag` samples before the frame's end.
    fn scan_lags(&self, frame: &[f32], recent: &[f32]) -> (usize, f32) {
        let len = frame.len();
        let min_lag = self.config.min_lag_samples();
        let max_lag = self.config.max_lag_samples();
        let step = self.config.lag_step_samples();

        let mut best_lag = 0;
        let mut best_corr = 0.0f32;
        let mut lag = min_lag;
        while lag <= max_lag {
            let end = recent.len() - lag;
            let window = &recent[end - len..end];
            let corr = normalized_cross_correlation(frame, window);
            if corr.abs() > best_corr.abs() {
                best_corr = corr;
                best_lag = lag;
            }
            lag += step;
        }
        (best_lag, best_corr)
    }

    pub fn stats(&self) -> LeakageStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of reference samples currently held.
    pub fn reference_len(&self) -> usize {
        self.reference.lock().len()
    }

    /// Fresh state for the next meeting: empties the reference history and
    /// zeroes the counters.
    pub fn reset(&self) {
        self.reference.lock().clear();
        self.stats.reset();
    }
}

/// Dot product of the aligned windows over the square root of the product of
/// their energies. Zero when either window carries no energy.
fn normalized_cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut energy_a = 0.0f64;
    let mut energy_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        energy_a += x as f64 * x as f64;
        energy_b += y as f64 * y as f64;
    }
    let denom = (energy_a * energy_b).sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 16_000;
    const FRAME_LEN: usize = 1600; // 100 ms

    fn detector() -> LeakageDetector {
        LeakageDetector::new(LeakageConfig::default())
    }

    /// 1 kHz tone with a linear amplitude ramp; the envelope makes the
    /// correlation peak unique in lag (a pure periodic tone is ambiguous at
    /// multiples of its 16-sample period).
    fn enveloped_tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 1000.0 * i as f32 / SAMPLE_RATE as f32;
                let envelope = 0.25 + 0.75 * i as f32 / len as f32;
                amplitude * envelope * phase.sin()
            })
            .collect()
    }

    #[test]
    fn empty_frame_is_no_audio() {
        let d = detector();
        let decision = d.detect_genuine_speech(&[], None);
        assert!(!decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::NoAudio);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn below_energy_threshold_rejected_regardless_of_reference() {
        let d = detector();
        d.process_system_audio(&enveloped_tone(8000, 0.5));

        let quiet = vec![0.001f32; FRAME_LEN];
        let decision = d.detect_genuine_speech(&quiet, Some(0.5));
        assert!(!decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::BelowEnergyThreshold);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn insufficient_reference_assumes_genuine() {
        let d = detector();
        // Less history than frame + max lag.
        d.process_system_audio(&vec![0.1f32; 100]);

        let frame = enveloped_tone(FRAME_LEN, 0.5);
        let decision = d.detect_genuine_speech(&frame, Some(0.5));
        assert!(decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::InsufficientReference);
        assert_eq!(decision.confidence, 0.5);
    }

    #[test]
    fn perfect_echo_detected_as_leakage() {
        let d = detector();
        let reference = enveloped_tone(8000, 0.5);
        d.process_system_audio(&reference);

        // Identical copy at a 320-sample (20 ms) lag, zero added noise.
        let lag = 320;
        let end = reference.len() - lag;
        let mic: Vec<f32> = reference[end - FRAME_LEN..end].to_vec();
        let level = rms(&mic);

        let decision = d.detect_genuine_speech(&mic, Some(level));
        assert!(!decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::LeakageDetected);
        assert!(decision.correlation.abs() >= d.config().leakage_threshold);
    }

    #[test]
    fn thirty_ms_lag_half_amplitude_scenario() {
        let d = detector();
        let reference = enveloped_tone(8000, 0.5);
        d.process_system_audio(&reference);

        // Same tone at a 30 ms lag and half amplitude, energy ratio 1.0.
        let lag = (0.030 * SAMPLE_RATE as f32) as usize; // 480 samples
        let end = reference.len() - lag;
        let mic: Vec<f32> = reference[end - FRAME_LEN..end].iter().map(|s| s * 0.5).collect();
        let level = rms(&mic);

        let decision = d.detect_genuine_speech(&mic, Some(level));
        assert!(!decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::LeakageDetected);

        let step = d.config().lag_step_samples();
        let delta = decision.best_lag_samples.abs_diff(lag);
        assert!(
            delta <= step,
            "best lag {} not within one step of {}",
            decision.best_lag_samples,
            lag
        );
    }

    #[test]
    fn loud_local_voice_overrides_correlation() {
        let d = detector();
        let reference = enveloped_tone(8000, 0.2);
        d.process_system_audio(&reference);

        // Same signal but 3x the reference level: energy ratio 3.0 > 2.0.
        let lag = 320;
        let end = reference.len() - lag;
        let mic: Vec<f32> = reference[end - FRAME_LEN..end].iter().map(|s| s * 3.0).collect();
        let reference_level = rms(&reference[end - FRAME_LEN..end]);

        let decision = d.detect_genuine_speech(&mic, Some(reference_level));
        assert!(decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::HighEnergyRatio);
        assert!(decision.correlation.abs() > d.config().leakage_threshold);
    }

    #[test]
    fn uncorrelated_noise_passes_through() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let d = detector();
        let mut rng = StdRng::seed_from_u64(42);
        let reference: Vec<f32> = (0..8000).map(|_| rng.gen_range(-0.5..0.5)).collect();
        d.process_system_audio(&reference);

        let mic: Vec<f32> = (0..FRAME_LEN).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let decision = d.detect_genuine_speech(&mic, Some(rms(&reference)));
        assert!(decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::LowCorrelation);
    }

    #[test]
    fn missing_system_level_means_infinite_ratio() {
        let d = detector();
        let reference = enveloped_tone(8000, 0.5);
        d.process_system_audio(&reference);

        let lag = 320;
        let end = reference.len() - lag;
        let mic: Vec<f32> = reference[end - FRAME_LEN..end].to_vec();

        // Perfectly correlated, but with no system level the ratio is
        // infinite, so the override path fires.
        let decision = d.detect_genuine_speech(&mic, None);
        assert!(decision.is_genuine_speech);
        assert_eq!(decision.reason, LeakageReason::HighEnergyRatio);
    }

    #[test]
    fn stats_track_every_path() {
        let d = detector();
        d.detect_genuine_speech(&vec![0.0f32; FRAME_LEN], None); // silence
        d.detect_genuine_speech(&enveloped_tone(FRAME_LEN, 0.5), None); // insufficient ref

        d.process_system_audio(&enveloped_tone(8000, 0.5));
        let reference = d.reference_len();
        assert!(reference >= FRAME_LEN + d.config().max_lag_samples());

        d.detect_genuine_speech(&enveloped_tone(FRAME_LEN, 0.5), None); // scanned

        let snap = d.stats();
        assert_eq!(snap.silence_frames, 1);
        assert_eq!(snap.assumed_genuine_frames, 1);
        assert_eq!(snap.speech_frames, 2);

        d.reset();
        assert_eq!(d.stats().speech_frames, 0);
        assert_eq!(d.reference_len(), 0);
    }
}
