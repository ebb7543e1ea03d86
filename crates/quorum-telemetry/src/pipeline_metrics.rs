use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for cross-thread pipeline monitoring.
///
/// Every field is an atomic counter so the audio hot path can bump them
/// without taking a lock.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Microphone path
    pub mic_frames_in: Arc<AtomicU64>,
    pub frames_suppressed: Arc<AtomicU64>, // gated out as leakage/silence
    pub frames_forwarded: Arc<AtomicU64>,  // converted and fed to the session

    // Reference path
    pub reference_chunks_in: Arc<AtomicU64>,
    pub reference_samples_in: Arc<AtomicU64>,

    // Conversion
    pub conversion_errors: Arc<AtomicU64>,

    // Session lifecycle
    pub session_restarts: Arc<AtomicU64>,
    pub segments_emitted: Arc<AtomicU64>,

    // Activity
    pub last_genuine_speech: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            mic_frames_in: Arc::new(AtomicU64::new(0)),
            frames_suppressed: Arc::new(AtomicU64::new(0)),
            frames_forwarded: Arc::new(AtomicU64::new(0)),
            reference_chunks_in: Arc::new(AtomicU64::new(0)),
            reference_samples_in: Arc::new(AtomicU64::new(0)),
            conversion_errors: Arc::new(AtomicU64::new(0)),
            session_restarts: Arc::new(AtomicU64::new(0)),
            segments_emitted: Arc::new(AtomicU64::new(0)),
            last_genuine_speech: Arc::new(RwLock::new(None)),
        }
    }

    pub fn record_mic_frame(&self) {
        self.mic_frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.frames_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
        *self.last_genuine_speech.write() = Some(Instant::now());
    }

    pub fn record_reference(&self, samples: usize) {
        self.reference_chunks_in.fetch_add(1, Ordering::Relaxed);
        self.reference_samples_in
            .fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn record_conversion_error(&self) {
        self.conversion_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment(&self) {
        self.segments_emitted.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.record_mic_frame();
        metrics.record_mic_frame();
        metrics.record_suppressed();
        metrics.record_forwarded();
        metrics.record_reference(512);

        assert_eq!(metrics.mic_frames_in.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.frames_suppressed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.frames_forwarded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.reference_samples_in.load(Ordering::Relaxed), 512);
        assert!(metrics.last_genuine_speech.read().is_some());
    }

    #[test]
    fn clones_share_state() {
        let metrics = PipelineMetrics::new();
        let clone = metrics.clone();
        clone.record_forwarded();
        assert_eq!(metrics.frames_forwarded.load(Ordering::Relaxed), 1);
    }
}
