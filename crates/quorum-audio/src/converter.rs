use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;
use tracing::trace;

use crate::frame::{AudioFrame, CanonicalFormat, SampleKind};

/// Conversion failures, split so callers can tell configuration problems
/// from transient ones.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Converter could not be constructed: {0}")]
    ConverterBuild(String),

    #[error("Conversion failed: {0}")]
    ConvertFailed(String),

    #[error("Could not allocate output buffer of {requested} samples")]
    OutputAlloc { requested: usize },

    #[error("Cannot bridge {from} -> {to}")]
    Unbridgeable { from: String, to: String },
}

/// Convert a frame into the canonical format the recognition engine needs.
///
/// A fresh resampler is constructed on every call. Converters keep internal
/// filter state, and a pooled instance shared across concurrently converted
/// frames has produced races before; per-call construction makes the whole
/// operation stateless from the caller's point of view.
///
/// Same input and output format is a no-op returning the frame unchanged.
pub fn convert(frame: AudioFrame, target: &CanonicalFormat) -> Result<AudioFrame, ConversionError> {
    if target.sample_kind == SampleKind::I16 {
        return Err(ConversionError::Unbridgeable {
            from: "f32 pipeline audio".into(),
            to: "i16 canonical format".into(),
        });
    }
    if target.matches(&frame) {
        return Ok(frame);
    }
    if target.channels != 1 && target.channels != frame.channels {
        return Err(ConversionError::Unbridgeable {
            from: format!("{} channel(s)", frame.channels),
            to: format!("{} channel(s)", target.channels),
        });
    }

    let timestamp = frame.timestamp;
    let in_rate = frame.sample_rate_hz;
    let channels = if target.channels == 1 && frame.channels != 1 {
        vec![downmix_mono(&frame.samples, frame.channels)]
    } else {
        deinterleave(&frame.samples, frame.channels)
    };

    let converted = if in_rate == target.sample_rate_hz {
        channels
    } else {
        resample(channels, in_rate, target.sample_rate_hz)?
    };

    let samples = interleave(&converted)?;
    trace!(
        target: "pipeline",
        in_rate,
        out_rate = target.sample_rate_hz,
        out_len = samples.len(),
        "converted frame"
    );

    Ok(AudioFrame {
        samples,
        sample_rate_hz: target.sample_rate_hz,
        channels: target.channels,
        timestamp,
    })
}

fn downmix_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    interleaved
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

fn deinterleave(interleaved: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let ch = channels.max(1) as usize;
    let per_channel = interleaved.len() / ch;
    let mut out = vec![Vec::with_capacity(per_channel); ch];
    for frame in interleaved.chunks_exact(ch) {
        for (c, &sample) in frame.iter().enumerate() {
            out[c].push(sample);
        }
    }
    out
}

fn interleave(channels: &[Vec<f32>]) -> Result<Vec<f32>, ConversionError> {
    let per_channel = channels.first().map(|c| c.len()).unwrap_or(0);
    let total = per_channel * channels.len();
    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| ConversionError::OutputAlloc { requested: total })?;
    for i in 0..per_channel {
        for channel in channels {
            out.push(channel[i]);
        }
    }
    Ok(out)
}

/// Resample each channel, producing exactly `ceil(len * out/in)` samples per
/// channel: the resampler's filter-delay shortfall is zero-padded and any
/// excess truncated, so the output capacity contract holds for every input
/// length.
fn resample(
    channels: Vec<Vec<f32>>,
    in_rate: u32,
    out_rate: u32,
) -> Result<Vec<Vec<f32>>, ConversionError> {
    let in_len = channels.first().map(|c| c.len()).unwrap_or(0);
    if in_len == 0 {
        return Ok(channels);
    }
    let ratio = out_rate as f64 / in_rate as f64;
    let expected = (in_len as f64 * ratio).ceil() as usize;

    // Balanced speech-quality sinc parameters.
    let sinc_params = SincInterpolationParameters {
        sinc_len: 64,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 128,
        window: WindowFunction::Blackman2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, sinc_params, in_len, channels.len())
        .map_err(|e| ConversionError::ConverterBuild(e.to_string()))?;

    let mut out = resampler
        .process(&channels, None)
        .map_err(|e| ConversionError::ConvertFailed(e.to_string()))?;

    // Flush the filter tail held back by the sinc delay.
    let flushed = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| ConversionError::ConvertFailed(e.to_string()))?;
    for (channel, tail) in out.iter_mut().zip(flushed) {
        channel.extend(tail);
    }

    for channel in out.iter_mut() {
        channel.resize(expected, 0.0);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CANONICAL_SAMPLE_RATE_HZ;

    fn canonical() -> CanonicalFormat {
        CanonicalFormat::default()
    }

    #[test]
    fn matching_format_is_identity() {
        let samples: Vec<f32> = (0..1600).map(|i| (i as f32 / 1600.0).sin()).collect();
        let frame = AudioFrame::new(samples.clone(), CANONICAL_SAMPLE_RATE_HZ, 1);
        let out = convert(frame, &canonical()).unwrap();
        assert_eq!(out.samples, samples);
        assert_eq!(out.sample_rate_hz, CANONICAL_SAMPLE_RATE_HZ);
    }

    #[test]
    fn stereo_downmix_averages_channels() {
        // L = 0.5, R = -0.5 -> mono 0.0
        let mut samples = Vec::new();
        for _ in 0..800 {
            samples.push(0.5);
            samples.push(-0.5);
        }
        let frame = AudioFrame::new(samples, CANONICAL_SAMPLE_RATE_HZ, 2);
        let out = convert(frame, &canonical()).unwrap();
        assert_eq!(out.channels, 1);
        assert_eq!(out.samples.len(), 800);
        assert!(out.samples.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn downsample_48k_output_capacity() {
        let frame = AudioFrame::new(vec![0.1; 4800], 48_000, 1);
        let out = convert(frame, &canonical()).unwrap();
        // ceil(4800 * 16000/48000) = 1600, exact by contract.
        assert_eq!(out.samples.len(), 1600);
        assert_eq!(out.sample_rate_hz, 16_000);
    }

    #[test]
    fn upsample_rounds_up() {
        let frame = AudioFrame::new(vec![0.1; 441], 44_100, 1);
        let out = convert(frame, &canonical()).unwrap();
        assert_eq!(out.samples.len(), 160);
    }

    #[test]
    fn i16_target_is_unbridgeable() {
        let frame = AudioFrame::new(vec![0.0; 160], 16_000, 1);
        let target = CanonicalFormat {
            sample_kind: SampleKind::I16,
            ..CanonicalFormat::default()
        };
        match convert(frame, &target) {
            Err(ConversionError::Unbridgeable { .. }) => {}
            other => panic!("expected Unbridgeable, got {:?}", other.map(|f| f.samples.len())),
        }
    }

    #[test]
    fn upmix_target_is_unbridgeable() {
        let frame = AudioFrame::new(vec![0.0; 160], 16_000, 1);
        let target = CanonicalFormat {
            channels: 2,
            ..CanonicalFormat::default()
        };
        assert!(matches!(
            convert(frame, &target),
            Err(ConversionError::Unbridgeable { .. })
        ));
    }

    #[test]
    fn preserves_timestamp() {
        let frame = AudioFrame::new(vec![0.1; 4800], 48_000, 1);
        let ts = frame.timestamp;
        let out = convert(frame, &canonical()).unwrap();
        assert_eq!(out.timestamp, ts);
    }
}
