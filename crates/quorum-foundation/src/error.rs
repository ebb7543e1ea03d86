use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error: {0}")]
    Transient(String),
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Restart the transcription session; the orchestrator decides when.
    RestartSession,
    Retry { max_attempts: u32, delay: Duration },
    Ignore,
    Fatal,
}

impl PipelineError {
    /// Classification only; nothing in the core retries automatically.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PipelineError::Config(_) => RecoveryStrategy::Fatal,
            PipelineError::Session(_) => RecoveryStrategy::RestartSession,
            PipelineError::Conversion(_) => RecoveryStrategy::Ignore,
            PipelineError::Transient(_) => RecoveryStrategy::Retry {
                max_attempts: 3,
                delay: Duration::from_millis(250),
            },
            PipelineError::Fatal(_) | PipelineError::ShutdownRequested => RecoveryStrategy::Fatal,
        }
    }
}
