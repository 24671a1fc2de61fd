//! Gain-shape vector quantizer.
//!
//! Each frame of `hop` samples is coded as one unit-norm shape from a
//! codebook plus one of a small set of log-spaced gain levels. The code of a
//! frame is `shape * num_gains + gain`, so the codebook size is
//! `num_shapes * num_gains`.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};
use tts_core::{AudioCodec, CodecConfig, TtsError, TtsResult, Waveform};

use crate::resample;
use crate::wav::smooth_frame_boundaries;
use crate::{DEFAULT_SAMPLE_RATE, SAMPLES_PER_TOKEN};

/// Number of shapes in the built-in codebook.
pub const DEFAULT_NUM_SHAPES: usize = 256;
/// Number of gain levels in the built-in codebook.
pub const DEFAULT_NUM_GAINS: usize = 16;

const PHASES_PER_BAND: usize = 4;
const MIN_FREQ_HZ: f32 = 60.0;
const MAX_FREQ_HZ: f32 = 6000.0;
const MIN_GAIN: f32 = 0.01;
// Norm of a full-scale frame is sqrt(hop), about 17.9 for 320 samples.
const MAX_GAIN: f32 = 18.0;
const BOUNDARY_BLEND: usize = 32;

const SHAPES_KEY: &str = "shapes";
const GAINS_KEY: &str = "gains";

fn tensor_err(what: &str) -> impl Fn(candle_core::Error) -> TtsError + '_ {
    move |e| TtsError::internal(format!("{what}: {e}"))
}

/// Gain-shape VQ codec over fixed-size frames.
#[derive(Debug, Clone)]
pub struct VqCodec {
    /// Unit-norm shapes, `[num_shapes, hop]`.
    shapes: Tensor,
    /// Transposed shapes for scoring, `[hop, num_shapes]`.
    shapes_t: Tensor,
    gains: Vec<f32>,
    sample_rate: u32,
    hop: usize,
    silence_threshold: f32,
    device: Device,
}

impl VqCodec {
    /// Build the codec described by a config: weights from disk when a path
    /// is set, the seeded codebook otherwise.
    pub fn from_config(config: &CodecConfig) -> TtsResult<Self> {
        let codec = match &config.weights_path {
            Some(path) => Self::load(path, DEFAULT_SAMPLE_RATE)?,
            None => Self::seeded(config.seed)?,
        };
        Ok(codec.with_silence_threshold(config.silence_threshold))
    }

    /// Deterministic built-in codebook: sinusoids in log-spaced frequency
    /// bands, four phases per band, with the frequency jittered inside the
    /// band by the seed.
    pub fn seeded(seed: u64) -> TtsResult<Self> {
        let hop = SAMPLES_PER_TOKEN;
        let sample_rate = DEFAULT_SAMPLE_RATE;
        let bands = DEFAULT_NUM_SHAPES / PHASES_PER_BAND;
        let mut rng = StdRng::seed_from_u64(seed);

        let log_lo = MIN_FREQ_HZ.ln();
        let band_width = (MAX_FREQ_HZ.ln() - log_lo) / bands as f32;
        let mut data = Vec::with_capacity(DEFAULT_NUM_SHAPES * hop);

        for band in 0..bands {
            let log_f = log_lo + band_width * (band as f32 + rng.gen_range(0.0..1.0));
            let freq = log_f.exp();
            for p in 0..PHASES_PER_BAND {
                let phase = std::f32::consts::FRAC_PI_2 * p as f32;
                let omega = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
                let shape: Vec<f32> = (0..hop).map(|n| (omega * n as f32 + phase).sin()).collect();
                let norm = shape.iter().map(|x| x * x).sum::<f32>().sqrt().max(f32::EPSILON);
                data.extend(shape.into_iter().map(|x| x / norm));
            }
        }

        let device = Device::Cpu;
        let shapes = Tensor::from_vec(data, (DEFAULT_NUM_SHAPES, hop), &device)
            .map_err(tensor_err("failed to build codebook"))?;
        Self::from_parts(shapes, default_gains(), sample_rate)
    }

    /// Load a codebook from a safetensors file with `shapes` `[S, hop]` and
    /// `gains` `[G]` tensors.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, sample_rate: u32) -> TtsResult<Self> {
        let path = path.as_ref();
        info!("Loading codec codebook from {}", path.display());

        let device = Device::Cpu;
        let mut tensors =
            candle_core::safetensors::load(path, &device).map_err(|e| TtsError::ModelLoad {
                path: path.to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            })?;

        let shapes = tensors
            .remove(SHAPES_KEY)
            .ok_or_else(|| TtsError::config(format!("codebook has no `{SHAPES_KEY}` tensor")))?
            .to_dtype(DType::F32)
            .map_err(tensor_err("failed to convert shapes"))?;
        let gains = tensors
            .remove(GAINS_KEY)
            .ok_or_else(|| TtsError::config(format!("codebook has no `{GAINS_KEY}` tensor")))?
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(tensor_err("failed to read gains"))?;

        Self::from_parts(shapes, gains, sample_rate)
    }

    /// Write the codebook to a safetensors file readable by [`Self::load`].
    pub fn save(&self, path: impl AsRef<Path>) -> TtsResult<()> {
        let gains = Tensor::from_vec(self.gains.clone(), self.gains.len(), &self.device)
            .map_err(tensor_err("failed to build gains tensor"))?;
        let tensors = HashMap::from([
            (SHAPES_KEY.to_string(), self.shapes.clone()),
            (GAINS_KEY.to_string(), gains),
        ]);
        candle_core::safetensors::save(&tensors, path.as_ref())
            .map_err(|e| TtsError::Io(std::io::Error::other(e.to_string())))
    }

    fn from_parts(shapes: Tensor, gains: Vec<f32>, sample_rate: u32) -> TtsResult<Self> {
        let (num_shapes, hop) = shapes
            .dims2()
            .map_err(|e| TtsError::config(format!("codebook shapes must be 2-D: {e}")))?;
        if num_shapes == 0 || hop == 0 {
            return Err(TtsError::config("codebook shapes tensor is empty"));
        }
        if gains.is_empty() || gains.iter().any(|g| !g.is_finite() || *g < 0.0) {
            return Err(TtsError::config("codebook gains must be finite and non-negative"));
        }
        if gains.windows(2).any(|w| w[1] < w[0]) {
            return Err(TtsError::config("codebook gains must be ascending"));
        }
        if sample_rate == 0 {
            return Err(TtsError::config("codec sample rate must be positive"));
        }

        let shapes_t = shapes
            .t()
            .and_then(|t| t.contiguous())
            .map_err(tensor_err("failed to transpose codebook"))?;
        let device = shapes.device().clone();
        debug!(num_shapes, hop, num_gains = gains.len(), "codebook ready");

        Ok(Self {
            shapes,
            shapes_t,
            gains,
            sample_rate,
            hop,
            silence_threshold: CodecConfig::default().silence_threshold,
            device,
        })
    }

    /// Set the RMS level below which input is rejected as silent.
    pub fn with_silence_threshold(mut self, threshold: f32) -> Self {
        self.silence_threshold = threshold;
        self
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.dims()[0]
    }

    pub fn num_gains(&self) -> usize {
        self.gains.len()
    }

    fn quantize_gain(&self, gain: f32) -> u32 {
        // Gains are ascending; pick the nearest level in the log domain.
        let target = gain.max(f32::MIN_POSITIVE).ln();
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, &level) in self.gains.iter().enumerate() {
            let dist = (level.max(f32::MIN_POSITIVE).ln() - target).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        best as u32
    }

    fn check_input(&self, waveform: &Waveform) -> TtsResult<()> {
        if waveform.is_empty() {
            return Err(TtsError::invalid_audio("waveform has no samples"));
        }
        if waveform.sample_rate() == 0 {
            return Err(TtsError::invalid_audio("waveform sample rate is zero"));
        }
        if waveform.samples().iter().any(|s| !s.is_finite()) {
            return Err(TtsError::invalid_audio("waveform contains non-finite samples"));
        }
        let rms = waveform.rms();
        if rms < self.silence_threshold {
            return Err(TtsError::invalid_audio(format!(
                "waveform is silent (rms {rms:.2e} below {:.2e})",
                self.silence_threshold
            )));
        }
        Ok(())
    }
}

fn default_gains() -> Vec<f32> {
    let ratio = (MAX_GAIN / MIN_GAIN).ln();
    (0..DEFAULT_NUM_GAINS)
        .map(|j| MIN_GAIN * (ratio * j as f32 / (DEFAULT_NUM_GAINS - 1) as f32).exp())
        .collect()
}

impl AudioCodec for VqCodec {
    #[instrument(skip(self, waveform), fields(samples = waveform.num_samples(), rate = waveform.sample_rate()))]
    fn encode(&self, waveform: &Waveform) -> TtsResult<Vec<u32>> {
        self.check_input(waveform)?;

        let mut samples =
            resample::resample(waveform.samples(), waveform.sample_rate(), self.sample_rate)?;
        let num_frames = samples.len().div_ceil(self.hop);
        if num_frames == 0 {
            return Err(TtsError::invalid_audio(format!(
                "{} samples at {} Hz are too short to encode at {} Hz",
                waveform.num_samples(),
                waveform.sample_rate(),
                self.sample_rate
            )));
        }
        samples.resize(num_frames * self.hop, 0.0);

        let frames = Tensor::from_vec(samples, (num_frames, self.hop), &self.device)
            .map_err(tensor_err("failed to frame audio"))?;
        let scores = frames
            .matmul(&self.shapes_t)
            .map_err(tensor_err("failed to score frames"))?;
        let best = scores
            .argmax(1)
            .and_then(|t| t.to_vec1::<u32>())
            .map_err(tensor_err("failed to pick shapes"))?;
        let proj = scores
            .max(1)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(tensor_err("failed to read projections"))?;

        let num_gains = self.gains.len() as u32;
        let codes: Vec<u32> = best
            .iter()
            .zip(&proj)
            .map(|(&shape, &p)| shape * num_gains + self.quantize_gain(p.max(0.0)))
            .collect();

        debug!(num_codes = codes.len(), "encoded audio");
        Ok(codes)
    }

    #[instrument(skip(self, codes), fields(num_codes = codes.len()))]
    fn decode(&self, codes: &[u32]) -> TtsResult<Waveform> {
        if codes.is_empty() {
            return Err(TtsError::invalid_token("no acoustic codes to decode"));
        }
        let size = self.codebook_size();
        if let Some(&bad) = codes.iter().find(|&&c| c as usize >= size) {
            return Err(TtsError::invalid_token(format!(
                "acoustic code {bad} outside codebook of {size}"
            )));
        }

        let num_gains = self.gains.len() as u32;
        let shape_ids: Vec<u32> = codes.iter().map(|c| c / num_gains).collect();
        let gains: Vec<f32> = codes
            .iter()
            .map(|c| self.gains[(c % num_gains) as usize])
            .collect();

        let ids = Tensor::from_vec(shape_ids, codes.len(), &self.device)
            .map_err(tensor_err("failed to build code tensor"))?;
        let gains = Tensor::from_vec(gains, (codes.len(), 1), &self.device)
            .map_err(tensor_err("failed to build gain tensor"))?;
        let mut samples = self
            .shapes
            .index_select(&ids, 0)
            .and_then(|frames| frames.broadcast_mul(&gains))
            .and_then(|frames| frames.flatten_all())
            .and_then(|flat| flat.to_vec1::<f32>())
            .map_err(tensor_err("failed to synthesize frames"))?;

        smooth_frame_boundaries(&mut samples, self.hop, BOUNDARY_BLEND);
        Ok(Waveform::new(samples, self.sample_rate))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn samples_per_token(&self) -> usize {
        self.hop
    }

    fn codebook_size(&self) -> usize {
        self.num_shapes() * self.gains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, secs: f32, rate: u32, amp: f32) -> Waveform {
        let n = (secs * rate as f32) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * amp)
            .collect();
        Waveform::new(samples, rate)
    }

    #[test]
    fn test_seeded_codebook_dimensions() {
        let codec = VqCodec::seeded(7).unwrap();
        assert_eq!(codec.codebook_size(), 4096);
        assert_eq!(codec.samples_per_token(), 320);
        assert_eq!(codec.sample_rate(), 24_000);
        assert!((codec.tokens_per_second() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_gain_levels_ascend() {
        let gains = default_gains();
        assert_eq!(gains.len(), DEFAULT_NUM_GAINS);
        assert!((gains[0] - MIN_GAIN).abs() < 1e-6);
        assert!((gains[DEFAULT_NUM_GAINS - 1] - MAX_GAIN).abs() < 1e-3);
        assert!(gains.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_quantize_gain_nearest_level() {
        let codec = VqCodec::seeded(1).unwrap();
        assert_eq!(codec.quantize_gain(0.0), 0);
        assert_eq!(codec.quantize_gain(1000.0), (DEFAULT_NUM_GAINS - 1) as u32);
        let mid = codec.gains[5];
        assert_eq!(codec.quantize_gain(mid * 1.01), 5);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = VqCodec::seeded(3).unwrap();
        let wav = tone(220.0, 0.2, 24_000, 0.5);
        assert_eq!(codec.encode(&wav).unwrap(), codec.encode(&wav).unwrap());
    }

    #[test]
    fn test_same_seed_same_codebook() {
        let wav = tone(440.0, 0.1, 24_000, 0.3);
        let a = VqCodec::seeded(11).unwrap().encode(&wav).unwrap();
        let b = VqCodec::seeded(11).unwrap().encode(&wav).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_length_rounds_up() {
        let codec = VqCodec::seeded(3).unwrap();
        let wav = tone(300.0, 1.0, 24_000, 0.5);
        let mut samples = wav.samples().to_vec();
        samples.truncate(24_000 - 100);
        let codes = codec.encode(&Waveform::new(samples, 24_000)).unwrap();
        assert_eq!(codes.len(), 75);
    }

    #[test]
    fn test_rejects_bad_input() {
        let codec = VqCodec::seeded(3).unwrap();
        assert!(matches!(
            codec.encode(&Waveform::new(vec![], 24_000)),
            Err(TtsError::InvalidAudio(_))
        ));
        assert!(matches!(
            codec.encode(&Waveform::new(vec![0.0; 4800], 24_000)),
            Err(TtsError::InvalidAudio(_))
        ));
        assert!(matches!(
            codec.encode(&Waveform::new(vec![0.1; 4800], 0)),
            Err(TtsError::InvalidAudio(_))
        ));
        assert!(matches!(
            codec.encode(&Waveform::new(vec![f32::NAN; 4800], 24_000)),
            Err(TtsError::InvalidAudio(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_codes() {
        let codec = VqCodec::seeded(3).unwrap();
        assert!(matches!(codec.decode(&[]), Err(TtsError::InvalidToken(_))));
        assert!(matches!(codec.decode(&[4096]), Err(TtsError::InvalidToken(_))));
    }

    #[test]
    fn test_decode_length_and_rate() {
        let codec = VqCodec::seeded(3).unwrap();
        let wav = codec.decode(&[0, 17, 4095]).unwrap();
        assert_eq!(wav.num_samples(), 3 * 320);
        assert_eq!(wav.sample_rate(), 24_000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codebook.safetensors");
        let codec = VqCodec::seeded(5).unwrap();
        codec.save(&path).unwrap();

        let loaded = VqCodec::load(&path, 24_000).unwrap();
        assert_eq!(loaded.codebook_size(), codec.codebook_size());
        let wav = tone(500.0, 0.1, 24_000, 0.4);
        assert_eq!(loaded.encode(&wav).unwrap(), codec.encode(&wav).unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        let err = VqCodec::load("/nonexistent/codebook.safetensors", 24_000).unwrap_err();
        assert!(matches!(err, TtsError::ModelLoad { .. }));
    }

    #[test]
    fn test_encode_rejects_audio_lost_in_resampling() {
        let codec = VqCodec::seeded(1).unwrap();
        let result = codec.encode(&Waveform::new(vec![0.1], 96_000));
        assert!(matches!(result, Err(TtsError::InvalidAudio(_))));
    }
}
