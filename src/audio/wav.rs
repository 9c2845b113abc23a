//! In-memory WAV encoding and decoding.
//!
//! Speech services hand back WAV bytes; playback wants mono `f32`.

use crate::error::{HeadError, Result};
use crate::ports::SynthesizedSpeech;
use std::io::Cursor;

/// Decode WAV bytes to mono `f32` samples, averaging channels.
///
/// # Errors
///
/// Returns [`HeadError::Audio`] for malformed data or unsupported formats.
pub fn decode_wav(bytes: &[u8]) -> Result<SynthesizedSpeech> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(HeadError::Audio(format!(
                    "unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(SynthesizedSpeech {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Encode mono `f32` samples as 16-bit PCM WAV bytes.
///
/// # Errors
///
/// Returns [`HeadError::Audio`] if the writer fails.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
