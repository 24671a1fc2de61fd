//! WAV file I/O and edge shaping.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use tts_core::{TtsError, TtsResult, Waveform};

use crate::resample::mix_to_mono;

/// Default edge fade applied to decoded speech, in milliseconds.
pub const DEFAULT_FADE_MS: f32 = 5.0;

fn map_hound(e: hound::Error) -> TtsError {
    match e {
        hound::Error::IoError(io) => TtsError::Io(io),
        other => TtsError::invalid_audio(other.to_string()),
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn pcm16_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write a waveform to a 16-bit mono WAV file.
pub fn write_wav(path: impl AsRef<Path>, waveform: &Waveform) -> TtsResult<()> {
    let mut writer =
        WavWriter::create(path.as_ref(), pcm16_spec(waveform.sample_rate())).map_err(map_hound)?;
    for &sample in waveform.samples() {
        writer.write_sample(to_i16(sample)).map_err(map_hound)?;
    }
    writer.finalize().map_err(map_hound)
}

/// Encode a waveform as an in-memory 16-bit mono WAV file.
pub fn wav_bytes(waveform: &Waveform) -> TtsResult<Vec<u8>> {
    let mut cursor = io::Cursor::new(Vec::new());
    write_wav_to(&mut cursor, waveform)?;
    Ok(cursor.into_inner())
}

/// Write a waveform as WAV into any seekable writer.
pub fn write_wav_to<W: Write + Seek>(writer: W, waveform: &Waveform) -> TtsResult<()> {
    let mut writer = WavWriter::new(writer, pcm16_spec(waveform.sample_rate())).map_err(map_hound)?;
    for &sample in waveform.samples() {
        writer.write_sample(to_i16(sample)).map_err(map_hound)?;
    }
    writer.finalize().map_err(map_hound)
}

/// Write audio samples to a writer as raw PCM (16-bit LE).
pub fn write_raw_pcm<W: Write>(writer: &mut W, samples: &[f32]) -> TtsResult<()> {
    for &sample in samples {
        writer.write_all(&to_i16(sample).to_le_bytes())?;
    }
    Ok(())
}

/// Read a WAV file into a mono waveform at its native rate.
///
/// Multi-channel files are averaged down to one channel.
pub fn read_wav(path: impl AsRef<Path>) -> TtsResult<Waveform> {
    let reader = WavReader::open(path.as_ref()).map_err(map_hound)?;
    decode_reader(reader)
}

/// Read WAV data from any reader.
pub fn read_wav_from<R: Read>(reader: R) -> TtsResult<Waveform> {
    decode_reader(WavReader::new(reader).map_err(map_hound)?)
}

fn decode_reader<R: Read>(mut reader: WavReader<R>) -> TtsResult<Waveform> {
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_hound)?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_hound)?,
    };

    let mono = mix_to_mono(&interleaved, spec.channels as usize)?;
    Ok(Waveform::new(mono, spec.sample_rate))
}

fn fade_len(samples: &[f32], fade_ms: f32, sample_rate: u32) -> usize {
    let n = ((fade_ms.max(0.0) / 1000.0) * sample_rate as f32) as usize;
    n.min(samples.len())
}

/// Hann fade-in over the first `fade_ms` milliseconds.
pub fn apply_fade_in(samples: &mut [f32], fade_ms: f32, sample_rate: u32) {
    let n = fade_len(samples, fade_ms, sample_rate);
    for (i, sample) in samples[..n].iter_mut().enumerate() {
        let t = i as f32 / n.max(1) as f32;
        *sample *= 0.5 * (1.0 - (std::f32::consts::PI * t).cos());
    }
}

/// Hann fade-out over the last `fade_ms` milliseconds.
pub fn apply_fade_out(samples: &mut [f32], fade_ms: f32, sample_rate: u32) {
    let n = fade_len(samples, fade_ms, sample_rate);
    let start = samples.len() - n;
    for (i, sample) in samples[start..].iter_mut().enumerate() {
        let t = (i + 1) as f32 / n.max(1) as f32;
        *sample *= 0.5 * (1.0 + (std::f32::consts::PI * t).cos());
    }
}

/// Remove the step at every frame boundary.
///
/// Frames decoded independently rarely meet at the same value. Half of the
/// jump is spread over `blend` samples on each side with a raised-cosine
/// ramp, so the frame interiors stay untouched.
pub fn smooth_frame_boundaries(samples: &mut [f32], frame_samples: usize, blend: usize) {
    if frame_samples == 0 || blend == 0 || samples.len() < frame_samples * 2 {
        return;
    }
    let blend = blend.min(frame_samples / 2).max(1);

    for boundary in (frame_samples..samples.len()).step_by(frame_samples) {
        let half_jump = (samples[boundary] - samples[boundary - 1]) * 0.5;
        for k in 0..blend {
            let w = 0.5 * (1.0 + (std::f32::consts::PI * k as f32 / blend as f32).cos());
            samples[boundary - 1 - k] += half_jump * w;
            if boundary + k < samples.len() {
                samples[boundary + k] -= half_jump * w;
            }
        }
    }
}
