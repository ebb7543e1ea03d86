//! Mock recognition engine for testing the session machinery

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use quorum_audio::{AudioFrame, CanonicalFormat};

use crate::engine::{EngineResult, EngineStream, RecognitionEngine, SessionError};
use crate::types::TranscriptSegment;

/// Scripted behavior for the mock engine.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Locales `reserve` accepts.
    pub locales: Vec<String>,
    /// Formats declared compatible after reservation.
    pub formats: Vec<CanonicalFormat>,
    /// Emit a volatile result after every N input frames.
    pub volatile_every: Option<usize>,
    /// Emit a final result (with this text) after every N input frames.
    pub final_every: Option<(usize, String)>,
    /// Final text emitted on end-of-input, if any audio arrived.
    pub final_text: Option<String>,
    /// Report a fatal error after N input frames.
    pub fatal_after_frames: Option<usize>,
    /// Simulated recognizer latency before each emitted result.
    pub result_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en-US".to_string()],
            formats: vec![CanonicalFormat::default()],
            volatile_every: Some(1),
            final_every: None,
            final_text: Some("mock transcription".to_string()),
            fatal_after_frames: None,
            result_delay: Duration::ZERO,
        }
    }
}

/// Configurable recognizer double.
///
/// `start` hands back the channel pair and spawns a task that owns the
/// input receiver; the task drops the result sender once all input is
/// processed, which is the completion signal the session waits on.
pub struct MockRecognitionEngine {
    config: MockConfig,
    reserved: Option<String>,
}

impl MockRecognitionEngine {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            reserved: None,
        }
    }

    pub fn with_final_text(text: impl Into<String>) -> Self {
        Self::new(MockConfig {
            final_text: Some(text.into()),
            ..Default::default()
        })
    }
}

impl Default for MockRecognitionEngine {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

#[async_trait]
impl RecognitionEngine for MockRecognitionEngine {
    async fn reserve(&mut self, locale: &str) -> Result<(), SessionError> {
        // Idempotent: re-reserving the held locale succeeds.
        if self.reserved.as_deref() == Some(locale) {
            return Ok(());
        }
        if self.config.locales.iter().any(|l| l == locale) {
            self.reserved = Some(locale.to_string());
            Ok(())
        } else {
            Err(SessionError::ReservationFailed(format!(
                "locale {locale} not installed"
            )))
        }
    }

    fn compatible_formats(&self) -> Vec<CanonicalFormat> {
        if self.reserved.is_some() {
            self.config.formats.clone()
        } else {
            Vec::new()
        }
    }

    async fn start(&mut self, format: CanonicalFormat) -> Result<EngineStream, SessionError> {
        if self.reserved.is_none() {
            return Err(SessionError::ReservationFailed(
                "start before reserve".to_string(),
            ));
        }
        debug!(target: "stt", ?format, "mock engine started");
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_recognizer(self.config.clone(), input_rx, result_tx));
        Ok(EngineStream {
            input: input_tx,
            results: result_rx,
        })
    }

    async fn release(&mut self) {
        self.reserved = None;
    }
}

async fn run_recognizer(
    config: MockConfig,
    mut input: mpsc::UnboundedReceiver<AudioFrame>,
    results: mpsc::UnboundedSender<EngineResult>,
) {
    let mut frames = 0usize;
    let mut clock = 0.0f32;

    while let Some(frame) = input.recv().await {
        frames += 1;
        let t0 = clock;
        clock += frame.duration().as_secs_f32();

        if config.fatal_after_frames == Some(frames) {
            pause(config.result_delay).await;
            let _ = results.send(EngineResult::Fatal {
                message: "mock recognizer fault".to_string(),
            });
            return;
        }
        if let Some((n, text)) = &config.final_every {
            if *n > 0 && frames % n == 0 {
                pause(config.result_delay).await;
                let segment = TranscriptSegment::final_(text.clone())
                    .with_times(t0, clock)
                    .with_confidence(0.9);
                let _ = results.send(EngineResult::Final(segment));
                continue;
            }
        }
        if let Some(n) = config.volatile_every {
            if n > 0 && frames % n == 0 {
                pause(config.result_delay).await;
                let segment =
                    TranscriptSegment::volatile(format!("partial after {frames} frames"))
                        .with_times(0.0, clock);
                let _ = results.send(EngineResult::Volatile(segment));
            }
        }
    }

    // End-of-input: finalize whatever is pending, then hang up. A session
    // with no audio finalizes with no results at all.
    if frames > 0 {
        if let Some(text) = &config.final_text {
            pause(config.result_delay).await;
            let segment = TranscriptSegment::final_(text.clone())
                .with_times(0.0, clock)
                .with_confidence(0.95);
            let _ = results.send(EngineResult::Final(segment));
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
