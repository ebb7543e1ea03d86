//! Audio constants shared across the pipeline

/// Sample rate the recognition engines in this pipeline canonically run at (Hz)
pub const CANONICAL_SAMPLE_RATE_HZ: u32 = 16_000;

/// Mono channel count for all analysis-side audio
pub const CHANNELS_MONO: u16 = 1;
