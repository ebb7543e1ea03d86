//! Streaming transcription orchestration for the Quorum meeting pipeline.
//!
//! This crate owns the lifecycle around an external streaming recognizer:
//! locale/model reservation, canonical-format negotiation, a non-blocking
//! input channel of converted frames, and reconciliation of volatile and
//! finalized transcript segments into a running transcript.

pub mod engine;
pub mod engines;
pub mod session;
pub mod state;
pub mod types;

pub use engine::{EngineResult, EngineStream, RecognitionEngine, SessionError};
pub use session::{SessionConfig, SessionMetrics, StreamingTranscriptionSession};
pub use state::SessionState;
pub use types::TranscriptSegment;
