//! Core transcript types

use serde::{Deserialize, Serialize};

/// A fragment of recognized text.
///
/// Volatile segments (`is_final == false`) are transient and replaced
/// wholesale by the next result of either kind; final segments are appended
/// to the accumulated transcript and never revised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
    /// Start time offset in seconds, when the engine supplies timing
    pub t0: Option<f32>,
    /// End time offset in seconds
    pub t1: Option<f32>,
    /// Confidence score (0.0-1.0)
    pub confidence: Option<f32>,
}

impl TranscriptSegment {
    pub fn volatile(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            t0: None,
            t1: None,
            confidence: None,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            t0: None,
            t1: None,
            confidence: None,
        }
    }

    pub fn with_times(mut self, t0: f32, t1: f32) -> Self {
        self.t0 = Some(t0);
        self.t1 = Some(t1);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
