use serde::{Deserialize, Serialize};

/// Why a frame was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeakageReason {
    /// Empty frame, nothing to classify.
    NoAudio,
    /// Mic RMS under the energy threshold; rejected before correlation.
    BelowEnergyThreshold,
    /// Not enough reference history to prove leakage; assumed genuine.
    InsufficientReference,
    /// Correlated with the reference stream within the lag window.
    LeakageDetected,
    /// No lag correlated strongly enough.
    LowCorrelation,
    /// Correlation matched but the mic was too loud relative to the system
    /// level; treated as a local voice.
    HighEnergyRatio,
}

/// Immutable verdict for one microphone frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakageDecision {
    pub is_genuine_speech: bool,
    /// 0..1
    pub confidence: f32,
    pub reason: LeakageReason,
    /// Lag of the best correlation match, in samples. Zero when no scan ran.
    pub best_lag_samples: usize,
    /// -1..1, the best normalized cross-correlation found.
    pub correlation: f32,
}

impl LeakageDecision {
    pub(crate) fn without_scan(
        is_genuine_speech: bool,
        confidence: f32,
        reason: LeakageReason,
    ) -> Self {
        Self {
            is_genuine_speech,
            confidence,
            reason,
            best_lag_samples: 0,
            correlation: 0.0,
        }
    }
}
