//! Quorum meeting audio orchestration.
//!
//! Composes the leakage detector, format converter, and streaming
//! transcription session into one pipeline: captured reference audio keeps
//! the detector's history current, microphone frames are gated against it,
//! and genuine speech is converted and fed to the recognizer. Finalized
//! segments leave through the handoff boundary, optionally paired with
//! speaker labels supplied by an external diarization component.

pub mod handoff;
pub mod orchestrator;
pub mod settings;

pub use handoff::{HandoffSegment, MeetingSummary, SpeakerLabel, SpeakerResolver};
pub use orchestrator::{MeetingAudioOrchestrator, OrchestratorError};
pub use settings::PipelineSettings;
