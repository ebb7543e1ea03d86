use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::constants::{CANONICAL_SAMPLE_RATE_HZ, CHANNELS_MONO};

/// An owned chunk of PCM audio moving through the pipeline.
///
/// Samples are interleaved f32 in [-1.0, 1.0]. Ownership transfers on every
/// pipeline hop; no stage holds a shared mutable alias.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub timestamp: Instant,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate_hz,
            channels,
            timestamp: Instant::now(),
        }
    }

    /// Samples per channel.
    pub fn len_per_channel(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.len_per_channel() as f64 / self.sample_rate_hz as f64)
    }

    pub fn format(&self) -> CanonicalFormat {
        CanonicalFormat {
            sample_rate_hz: self.sample_rate_hz,
            channels: self.channels,
            sample_kind: SampleKind::F32,
        }
    }
}

/// Sample representation an engine declares itself compatible with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    F32,
    I16,
}

/// The single audio representation negotiated with the recognition engine
/// for a session; fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFormat {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub sample_kind: SampleKind,
}

impl CanonicalFormat {
    pub fn matches(&self, frame: &AudioFrame) -> bool {
        self.sample_kind == SampleKind::F32
            && self.sample_rate_hz == frame.sample_rate_hz
            && self.channels == frame.channels
    }
}

impl Default for CanonicalFormat {
    fn default() -> Self {
        Self {
            sample_rate_hz: CANONICAL_SAMPLE_RATE_HZ,
            channels: CHANNELS_MONO,
            sample_kind: SampleKind::F32,
        }
    }
}
