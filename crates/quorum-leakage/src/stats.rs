use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic per-frame counters, kept for offline threshold tuning.
///
/// Atomics so the decision path can bump them without a lock; reset only by
/// an explicit `reset()` between meetings.
#[derive(Debug, Default)]
pub struct LeakageStats {
    silence_frames: AtomicU64,
    speech_frames: AtomicU64,
    leakage_frames: AtomicU64,
    genuine_frames: AtomicU64,
    assumed_genuine_frames: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakageStatsSnapshot {
    pub silence_frames: u64,
    pub speech_frames: u64,
    pub leakage_frames: u64,
    pub genuine_frames: u64,
    pub assumed_genuine_frames: u64,
}

impl LeakageStats {
    pub fn record_silence(&self) {
        self.silence_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_leakage(&self) {
        self.speech_frames.fetch_add(1, Ordering::Relaxed);
        self.leakage_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_genuine(&self) {
        self.speech_frames.fetch_add(1, Ordering::Relaxed);
        self.genuine_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_assumed_genuine(&self) {
        self.speech_frames.fetch_add(1, Ordering::Relaxed);
        self.assumed_genuine_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LeakageStatsSnapshot {
        LeakageStatsSnapshot {
            silence_frames: self.silence_frames.load(Ordering::Relaxed),
            speech_frames: self.speech_frames.load(Ordering::Relaxed),
            leakage_frames: self.leakage_frames.load(Ordering::Relaxed),
            genuine_frames: self.genuine_frames.load(Ordering::Relaxed),
            assumed_genuine_frames: self.assumed_genuine_frames.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.silence_frames.store(0, Ordering::Relaxed);
        self.speech_frames.store(0, Ordering::Relaxed);
        self.leakage_frames.store(0, Ordering::Relaxed);
        self.genuine_frames.store(0, Ordering::Relaxed);
        self.assumed_genuine_frames.store(0, Ordering::Relaxed);
    }
}
