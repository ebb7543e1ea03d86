//! Streaming transcription session
//!
//! A session is created per meeting and never reused across meetings:
//! recognizers do not guarantee safe concurrent reuse, and a fresh session
//! avoids cross-meeting state bleed.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use quorum_audio::{AudioFrame, CanonicalFormat};

use crate::engine::{EngineResult, RecognitionEngine, SessionError};
use crate::state::{SessionState, SessionStateCell};
use crate::types::TranscriptSegment;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recognition locale to reserve.
    pub locale: String,
    /// Tried in order when the requested locale is unsupported.
    pub fallback_locales: Vec<String>,
    /// Prefer a compatible format at this rate when the engine offers one.
    pub preferred_sample_rate: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            fallback_locales: vec!["en-GB".to_string(), "en".to_string()],
            preferred_sample_rate: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    pub frames_fed: u64,
    pub frames_dropped: u64,
    pub volatile_count: u64,
    pub final_count: u64,
    pub skipped_errors: u64,
}

/// Two explicit accumulators keep the "never revise a final segment"
/// invariant mechanically enforceable.
#[derive(Debug, Default)]
struct TranscriptBuffers {
    finals: Vec<TranscriptSegment>,
    volatile: Option<TranscriptSegment>,
}

impl TranscriptBuffers {
    /// The externally visible transcript: accumulated finals plus the
    /// current volatile tail.
    fn visible_text(&self) -> String {
        let mut parts: Vec<&str> = self.finals.iter().map(|s| s.text.as_str()).collect();
        if let Some(v) = &self.volatile {
            parts.push(v.text.as_str());
        }
        parts.join(" ")
    }

    fn final_text(&self) -> String {
        self.finals
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn clear(&mut self) {
        self.finals.clear();
        self.volatile = None;
    }
}

/// Owns one recognition engine instance for the duration of a meeting.
pub struct StreamingTranscriptionSession {
    engine: Box<dyn RecognitionEngine>,
    config: SessionConfig,
    state: Arc<SessionStateCell>,
    buffers: Arc<RwLock<TranscriptBuffers>>,
    metrics: Arc<RwLock<SessionMetrics>>,
    last_error: Arc<Mutex<Option<SessionError>>>,
    negotiated_format: Option<CanonicalFormat>,
    reserved_locale: Option<String>,
    input_tx: RwLock<Option<mpsc::UnboundedSender<AudioFrame>>>,
    drain_handle: Option<JoinHandle<()>>,
    // Moved into the drain task on start; dropping it there closes the
    // segment stream, signaling downstream consumers that no more finals
    // can arrive.
    segment_tx: Option<mpsc::UnboundedSender<TranscriptSegment>>,
    segment_rx: Option<mpsc::UnboundedReceiver<TranscriptSegment>>,
}

impl StreamingTranscriptionSession {
    pub fn new(engine: Box<dyn RecognitionEngine>, config: SessionConfig) -> Self {
        let (segment_tx, segment_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            config,
            state: Arc::new(SessionStateCell::new()),
            buffers: Arc::new(RwLock::new(TranscriptBuffers::default())),
            metrics: Arc::new(RwLock::new(SessionMetrics::default())),
            last_error: Arc::new(Mutex::new(None)),
            negotiated_format: None,
            reserved_locale: None,
            input_tx: RwLock::new(None),
            drain_handle: None,
            segment_tx: Some(segment_tx),
            segment_rx: Some(segment_rx),
        }
    }

    /// Reserve a locale (falling back through the configured list) and
    /// negotiate the canonical audio format. Fatal failures return the
    /// session to `Uninitialized`.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        self.state.transition(SessionState::Reserving)?;

        let mut requested = vec![self.config.locale.clone()];
        requested.extend(self.config.fallback_locales.iter().cloned());

        let mut reserved = None;
        for locale in &requested {
            match self.engine.reserve(locale).await {
                Ok(()) => {
                    reserved = Some(locale.clone());
                    break;
                }
                Err(e) => debug!(target: "stt", %locale, error = %e, "locale unavailable"),
            }
        }
        let locale = match reserved {
            Some(l) => l,
            None => {
                self.state.transition(SessionState::Uninitialized)?;
                return Err(SessionError::NoSupportedLocale { requested });
            }
        };

        let formats = self.engine.compatible_formats();
        let format = match self.pick_format(&formats) {
            Some(f) => f,
            None => {
                self.engine.release().await;
                self.state.transition(SessionState::Uninitialized)?;
                return Err(SessionError::NoCompatibleFormat);
            }
        };

        info!(target: "stt", %locale, ?format, "session reserved");
        self.reserved_locale = Some(locale);
        self.negotiated_format = Some(format);
        self.state.transition(SessionState::Ready)
    }

    fn pick_format(&self, formats: &[CanonicalFormat]) -> Option<CanonicalFormat> {
        if let Some(rate) = self.config.preferred_sample_rate {
            if let Some(f) = formats.iter().find(|f| f.sample_rate_hz == rate) {
                return Some(*f);
            }
        }
        formats.first().copied()
    }

    /// Start streaming. On engine-start failure the session stays `Ready`
    /// and never enters `Streaming`.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.state.current() != SessionState::Ready {
            return Err(SessionError::InvalidTransition {
                from: self.state.current(),
                to: SessionState::Streaming,
            });
        }
        // Set while Ready, so negotiated_format is always present here.
        let format = self
            .negotiated_format
            .ok_or(SessionError::NoCompatibleFormat)?;

        let stream = self.engine.start(format).await?;
        *self.input_tx.write() = Some(stream.input);
        self.state.transition(SessionState::Streaming)?;

        self.drain_handle = Some(tokio::spawn(drain_results(
            stream.results,
            self.buffers.clone(),
            self.metrics.clone(),
            self.state.clone(),
            self.last_error.clone(),
            self.segment_tx.take(),
        )));
        Ok(())
    }

    /// Enqueue a converted frame. Never blocks; a no-op outside `Streaming`
    /// (frames produced before start or after stop are dropped, not queued).
    pub fn feed(&self, frame: AudioFrame) {
        if self.state.current() != SessionState::Streaming {
            trace!(target: "stt", "frame outside streaming window dropped");
            self.metrics.write().frames_dropped += 1;
            return;
        }
        let guard = self.input_tx.read();
        if let Some(tx) = guard.as_ref() {
            if tx.send(frame).is_ok() {
                self.metrics.write().frames_fed += 1;
                return;
            }
        }
        self.metrics.write().frames_dropped += 1;
    }

    /// Signal end-of-input, wait for the engine to drain every in-flight
    /// result, release resources, and return the finalized transcript. A
    /// session that saw no results finalizes with an empty string.
    pub async fn stop(&mut self) -> Result<String, SessionError> {
        match self.state.current() {
            SessionState::Streaming => {
                self.state.transition(SessionState::Finalizing)?;
                // Dropping the sender is the end-of-input signal.
                self.input_tx.write().take();
                if let Some(handle) = self.drain_handle.take() {
                    let _ = handle.await;
                }
                self.engine.release().await;
                // The drain task may already have moved us to Stopped on a
                // late fatal result.
                if self.state.current() == SessionState::Finalizing {
                    self.state.transition(SessionState::Stopped)?;
                    // A clean finalize leaves no volatile tail behind.
                    self.buffers.write().volatile = None;
                }
                Ok(self.buffers.read().final_text())
            }
            // Already stopped (fatal mid-stream): the accumulated-so-far
            // transcript is still retrievable, never discarded.
            SessionState::Stopped => {
                if let Some(handle) = self.drain_handle.take() {
                    let _ = handle.await;
                }
                self.input_tx.write().take();
                self.engine.release().await;
                Ok(self.buffers.read().final_text())
            }
            other => Err(SessionError::InvalidTransition {
                from: other,
                to: SessionState::Finalizing,
            }),
        }
    }

    /// Return a stopped session to `Uninitialized` for explicit reuse of the
    /// wrapper (the engine decides what reuse means for it).
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.state.transition(SessionState::Uninitialized)?;
        self.buffers.write().clear();
        *self.metrics.write() = SessionMetrics::default();
        *self.last_error.lock() = None;
        self.negotiated_format = None;
        self.reserved_locale = None;
        Ok(())
    }

    /// Accumulated finals plus the current volatile tail, at any time —
    /// including after a fatal error.
    pub fn transcript(&self) -> String {
        self.buffers.read().visible_text()
    }

    pub fn final_segments(&self) -> Vec<TranscriptSegment> {
        self.buffers.read().finals.clone()
    }

    /// Receiver of finalized segments, for the orchestrator's handoff task.
    /// Yields each final exactly once; `None` after the first call.
    pub fn take_segments(&mut self) -> Option<mpsc::UnboundedReceiver<TranscriptSegment>> {
        self.segment_rx.take()
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> crossbeam_channel::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn negotiated_format(&self) -> Option<CanonicalFormat> {
        self.negotiated_format
    }

    pub fn reserved_locale(&self) -> Option<&str> {
        self.reserved_locale.as_deref()
    }

    pub fn metrics(&self) -> SessionMetrics {
        self.metrics.read().clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.last_error.lock().clone()
    }
}

/// The session's single intentional suspension point: awaits each result
/// from the engine and reconciles it into the transcript buffers.
async fn drain_results(
    mut results: mpsc::UnboundedReceiver<EngineResult>,
    buffers: Arc<RwLock<TranscriptBuffers>>,
    metrics: Arc<RwLock<SessionMetrics>>,
    state: Arc<SessionStateCell>,
    last_error: Arc<Mutex<Option<SessionError>>>,
    segment_tx: Option<mpsc::UnboundedSender<TranscriptSegment>>,
) {
    let mut fatal = false;
    while let Some(result) = results.recv().await {
        match result {
            EngineResult::Volatile(segment) => {
                metrics.write().volatile_count += 1;
                buffers.write().volatile = Some(segment);
            }
            EngineResult::Final(segment) => {
                metrics.write().final_count += 1;
                {
                    let mut b = buffers.write();
                    b.volatile = None;
                    b.finals.push(segment.clone());
                }
                if let Some(tx) = &segment_tx {
                    let _ = tx.send(segment);
                }
            }
            EngineResult::Error { code, message } => {
                // Transient: a single undecodable result never terminates
                // the session.
                metrics.write().skipped_errors += 1;
                warn!(target: "stt", %code, %message, "skipping malformed engine result");
            }
            EngineResult::Fatal { message } => {
                warn!(target: "stt", %message, "engine reported fatal error");
                *last_error.lock() = Some(SessionError::EngineFatal(message));
                fatal = true;
                break;
            }
        }
    }

    match state.current() {
        SessionState::Streaming => {
            if !fatal {
                // Engine hung up without finalize; treat as fatal.
                *last_error.lock() = Some(SessionError::EngineFatal(
                    "engine closed result stream unexpectedly".to_string(),
                ));
            }
            let _ = state.transition(SessionState::Stopped);
        }
        SessionState::Finalizing if fatal => {
            let _ = state.transition(SessionState::Stopped);
        }
        _ => {}
    }

    let m = metrics.read();
    info!(
        target: "stt",
        volatiles = m.volatile_count,
        finals = m.final_count,
        skipped = m.skipped_errors,
        "result drain complete"
    );
}
