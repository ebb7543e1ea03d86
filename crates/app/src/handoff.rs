//! Handoff boundary types and the optional diarization seam.

use quorum_leakage::LeakageStatsSnapshot;

/// Speaker identity supplied by an external diarization component.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerLabel {
    pub name: String,
    /// Voice-embedding vector, when the diarizer provides one.
    pub embedding: Option<Vec<f32>>,
}

/// Maps a segment's time range to a speaker. The pipeline works without
/// one; segments then leave unlabeled.
pub trait SpeakerResolver: Send + Sync {
    fn resolve(&self, t0: Option<f32>, t1: Option<f32>) -> Option<SpeakerLabel>;
}

/// One finalized transcript segment leaving the pipeline.
#[derive(Debug, Clone)]
pub struct HandoffSegment {
    pub text: String,
    pub t0: Option<f32>,
    pub t1: Option<f32>,
    pub confidence: Option<f32>,
    pub speaker: Option<SpeakerLabel>,
}

/// Everything persistence/UI layers get when a meeting ends.
#[derive(Debug, Clone)]
pub struct MeetingSummary {
    pub transcript: String,
    pub stats: LeakageStatsSnapshot,
}
