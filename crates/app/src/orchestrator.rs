use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use quorum_audio::{convert, AudioFrame, CanonicalFormat, ConversionError};
use quorum_foundation::PipelineError;
use quorum_leakage::{LeakageConfig, LeakageDecision, LeakageDetector};
use quorum_stt::{
    RecognitionEngine, SessionError, StreamingTranscriptionSession, TranscriptSegment,
};
use quorum_telemetry::PipelineMetrics;

use crate::handoff::{HandoffSegment, MeetingSummary, SpeakerResolver};
use crate::settings::PipelineSettings;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Pipeline not started")]
    NotStarted,
}

impl From<OrchestratorError> for PipelineError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Session(
                e @ (SessionError::NoSupportedLocale { .. } | SessionError::NoCompatibleFormat),
            ) => PipelineError::Config(e.to_string()),
            OrchestratorError::Session(e) => PipelineError::Session(e.to_string()),
            OrchestratorError::Conversion(e @ ConversionError::ConvertFailed(_)) => {
                PipelineError::Transient(e.to_string())
            }
            OrchestratorError::Conversion(e) => PipelineError::Conversion(e.to_string()),
            OrchestratorError::NotStarted => {
                PipelineError::Fatal("pipeline not started".to_string())
            }
        }
    }
}

/// The only component permitted to route data between the detector, the
/// converter, and the transcription session.
///
/// Reference frames always reach the detector so its history stays current
/// regardless of what happens to microphone frames; microphone frames are
/// gated, converted with a per-call converter, and fed without blocking.
/// Nothing here retries automatically — failures surface to the caller,
/// which decides whether to restart a session.
pub struct MeetingAudioOrchestrator {
    detector: Arc<LeakageDetector>,
    session: StreamingTranscriptionSession,
    format: Option<CanonicalFormat>,
    metrics: Arc<PipelineMetrics>,
    speaker_resolver: Option<Arc<dyn SpeakerResolver>>,
    handoff_rx: Option<mpsc::UnboundedReceiver<HandoffSegment>>,
    handoff_handle: Option<JoinHandle<()>>,
}

impl MeetingAudioOrchestrator {
    pub fn new(engine: Box<dyn RecognitionEngine>, settings: PipelineSettings) -> Self {
        Self::with_detector_config(engine, settings.session.clone(), settings.leakage)
    }

    fn with_detector_config(
        engine: Box<dyn RecognitionEngine>,
        session_config: quorum_stt::SessionConfig,
        leakage_config: LeakageConfig,
    ) -> Self {
        Self {
            detector: Arc::new(LeakageDetector::new(leakage_config)),
            session: StreamingTranscriptionSession::new(engine, session_config),
            format: None,
            metrics: Arc::new(PipelineMetrics::new()),
            speaker_resolver: None,
            handoff_rx: None,
            handoff_handle: None,
        }
    }

    pub fn with_speaker_resolver(mut self, resolver: Arc<dyn SpeakerResolver>) -> Self {
        self.speaker_resolver = Some(resolver);
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    pub fn detector(&self) -> &LeakageDetector {
        &self.detector
    }

    /// Bring the session up and spawn the handoff task pairing finalized
    /// segments with speaker labels.
    pub async fn start(&mut self) -> Result<(), OrchestratorError> {
        self.session.initialize().await?;

        let segments = self.session.take_segments();
        self.session.start().await?;
        self.format = self.session.negotiated_format();

        if let Some(segments) = segments {
            let (handoff_tx, handoff_rx) = mpsc::unbounded_channel();
            self.handoff_rx = Some(handoff_rx);
            self.handoff_handle = Some(tokio::spawn(pair_segments(
                segments,
                handoff_tx,
                self.speaker_resolver.clone(),
                self.metrics.clone(),
            )));
        }
        info!(target: "pipeline", format = ?self.format, "meeting pipeline started");
        Ok(())
    }

    /// Reference (system output) audio, forwarded unconditionally. Both
    /// streams are expected at the detector's configured sample rate.
    pub fn on_system_audio(&self, samples: &[f32]) {
        self.metrics.record_reference(samples.len());
        self.detector.process_system_audio(samples);
    }

    /// Gate one microphone frame, converting and feeding it when genuine.
    ///
    /// `system_level` is the caller's current system-output RMS, used for
    /// the energy-ratio override. Suppressed frames contribute to leakage
    /// statistics only and never reach transcription.
    pub fn on_microphone_frame(
        &self,
        frame: AudioFrame,
        system_level: Option<f32>,
    ) -> Result<LeakageDecision, OrchestratorError> {
        let format = self.format.ok_or(OrchestratorError::NotStarted)?;
        self.metrics.record_mic_frame();

        let decision = self
            .detector
            .detect_genuine_speech(&frame.samples, system_level);
        if !decision.is_genuine_speech {
            self.metrics.record_suppressed();
            debug!(target: "pipeline", reason = ?decision.reason, "frame suppressed");
            return Ok(decision);
        }

        let converted = convert(frame, &format).inspect_err(|_| {
            self.metrics.record_conversion_error();
        })?;
        self.session.feed(converted);
        self.metrics.record_forwarded();
        Ok(decision)
    }

    /// Receiver for finalized, speaker-paired segments. Closes once the
    /// meeting stops and every in-flight segment has been delivered.
    pub fn take_handoff(&mut self) -> Option<mpsc::UnboundedReceiver<HandoffSegment>> {
        self.handoff_rx.take()
    }

    /// Stop the meeting: finalize the session (draining in-flight results),
    /// wait for the handoff task, and return the transcript with final
    /// leakage statistics.
    pub async fn stop(&mut self) -> Result<MeetingSummary, OrchestratorError> {
        let transcript = self.session.stop().await?;
        if let Some(handle) = self.handoff_handle.take() {
            let _ = handle.await;
        }
        let stats = self.detector.stats();
        info!(
            target: "pipeline",
            transcript_chars = transcript.len(),
            genuine = stats.genuine_frames,
            leaked = stats.leakage_frames,
            "meeting stopped"
        );
        Ok(MeetingSummary { transcript, stats })
    }

    /// Visible transcript so far (finals plus volatile tail).
    pub fn transcript(&self) -> String {
        self.session.transcript()
    }
}

async fn pair_segments(
    mut segments: mpsc::UnboundedReceiver<TranscriptSegment>,
    handoff_tx: mpsc::UnboundedSender<HandoffSegment>,
    resolver: Option<Arc<dyn SpeakerResolver>>,
    metrics: Arc<PipelineMetrics>,
) {
    while let Some(segment) = segments.recv().await {
        let speaker = resolver
            .as_ref()
            .and_then(|r| r.resolve(segment.t0, segment.t1));
        metrics.record_segment();
        let _ = handoff_tx.send(HandoffSegment {
            text: segment.text,
            t0: segment.t0,
            t1: segment.t1,
            confidence: segment.confidence,
            speaker,
        });
    }
}
