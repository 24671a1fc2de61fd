//! Sample-rate and channel conversion.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;
use tts_core::{TtsError, TtsResult, Waveform};

/// Average interleaved multi-channel samples down to mono.
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> TtsResult<Vec<f32>> {
    if channels == 0 {
        return Err(TtsError::invalid_audio("audio has zero channels"));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    if interleaved.len() % channels != 0 {
        return Err(TtsError::invalid_audio(format!(
            "{} samples do not divide into {channels} channels",
            interleaved.len()
        )));
    }
    let scale = 1.0 / channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}

const SINC_LEN: usize = 256;

/// Resample mono samples with a windowed-sinc interpolator.
///
/// The output length is `round(len * to_rate / from_rate)` and sample `i`
/// lines up with input time `i / to_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> TtsResult<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(TtsError::invalid_audio(format!(
            "cannot resample from {from_rate} Hz to {to_rate} Hz"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // Trailing silence pushes the delayed tail of the signal out of the filter.
    let mut padded = samples.to_vec();
    padded.resize(samples.len() + SINC_LEN, 0.0);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, padded.len(), 1)
        .map_err(|e| TtsError::invalid_audio(format!("resampler setup failed: {e}")))?;
    let mut output = resampler
        .process(&[padded], None)
        .map_err(|e| TtsError::invalid_audio(format!("resampling failed: {e}")))?;

    let mut mono = output.pop().unwrap_or_default();
    mono.resize(expected, 0.0);
    debug!(from_rate, to_rate, input = samples.len(), output = mono.len(), "resampled");
    Ok(mono)
}

/// Convert a waveform to the given rate, returning it unchanged when it already matches.
pub fn to_rate(waveform: &Waveform, rate: u32) -> TtsResult<Waveform> {
    if waveform.sample_rate() == rate {
        return Ok(waveform.clone());
    }
    let samples = resample(waveform.samples(), waveform.sample_rate(), rate)?;
    Ok(Waveform::new(samples, rate))
}
