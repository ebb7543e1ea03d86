//! Recognition engine capability interface
//!
//! Any streaming recognizer backend (platform speech API, local model,
//! cloud service) implements this trait; the session never knows which
//! variant it drives.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use quorum_audio::{AudioFrame, CanonicalFormat};

use crate::state::SessionState;
use crate::types::TranscriptSegment;

/// Errors in session setup and engine lifecycle.
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("No supported locale among {requested:?}")]
    NoSupportedLocale { requested: Vec<String> },

    #[error("Engine declares no compatible audio format")]
    NoCompatibleFormat,

    #[error("Locale/model reservation failed: {0}")]
    ReservationFailed(String),

    #[error("Fatal engine error: {0}")]
    EngineFatal(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// One item on the engine's result stream.
#[derive(Debug, Clone)]
pub enum EngineResult {
    /// Provisional text; replaced wholesale by the next result.
    Volatile(TranscriptSegment),
    /// Committed text; appended permanently.
    Final(TranscriptSegment),
    /// A single malformed/undecodable result. Logged and skipped; the
    /// session keeps streaming.
    Error { code: String, message: String },
    /// The engine cannot continue. The session stops; accumulated
    /// transcript stays retrievable.
    Fatal { message: String },
}

/// Channel pair handed out by a started engine.
///
/// Dropping `input` signals end-of-input; the engine closes `results` only
/// after every pending result has been emitted and finalized, which is the
/// session's completion signal.
pub struct EngineStream {
    pub input: mpsc::UnboundedSender<AudioFrame>,
    pub results: mpsc::UnboundedReceiver<EngineResult>,
}

/// Streaming recognizer boundary.
#[async_trait]
pub trait RecognitionEngine: Send {
    /// Reserve the model/resources for `locale`. Must be idempotent:
    /// reserving an already-reserved locale succeeds.
    async fn reserve(&mut self, locale: &str) -> Result<(), SessionError>;

    /// Audio formats the reserved locale accepts. Valid after `reserve`;
    /// empty means no session is possible.
    fn compatible_formats(&self) -> Vec<CanonicalFormat>;

    /// Begin recognition in the negotiated format.
    async fn start(&mut self, format: CanonicalFormat) -> Result<EngineStream, SessionError>;

    /// Release reserved resources. Called on session teardown; must
    /// tolerate being called without a prior `start`.
    async fn release(&mut self);
}
