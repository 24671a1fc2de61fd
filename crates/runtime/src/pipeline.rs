//! TTS pipeline: text → prompt → generation → audio.
//!
//! [`TtsPipeline`] wires the text encoder, prompt assembler, generation
//! engine, output assembler and speaker profile builder together, after
//! checking that every component agrees with the [`ModelSpec`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use audio_codec::VqCodec;
use forced_aligner::{CharVocabulary, EmissionModel, EnergyEmissionModel, ForcedAligner};
use generation::{CancellationToken, GenerationEngine, MockBackend};
use text_normalizer::Normalizer;
use text_tokenizer::{ByteTokenizer, TextEncoder};
use tracing::{info, instrument, warn};
use tts_core::{
    AlignerConfig, AudioCodec, Backend, GenerationConfig, Lang, ModelSpec, SpeakerProfile,
    TextNormalizer, TextTokenizer, Transcriber, TtsConfig, TtsError, TtsResult, Waveform,
};

use crate::metrics::TtsMetrics;
use crate::output::{OutputAssembler, Synthesis};
use crate::prompt::PromptAssembler;
use crate::speaker::{self, SpeakerProfileBuilder};
use crate::speakers;

fn error_kind(err: &TtsError) -> &'static str {
    match err.root_cause() {
        TtsError::Config(_) => "config",
        TtsError::InvalidAudio(_) => "invalid_audio",
        TtsError::InvalidToken(_) => "invalid_token",
        TtsError::AlignmentFailed(_) => "alignment",
        TtsError::ContextOverflow { .. } => "context_overflow",
        TtsError::Backend(_) => "backend",
        TtsError::Transcription(_) => "transcription",
        TtsError::EmptyGeneration => "empty_generation",
        TtsError::Serialization(_) => "serialization",
        TtsError::Cancelled { .. } => "cancelled",
        TtsError::Normalization(_) | TtsError::Tokenization(_) => "text",
        _ => "other",
    }
}

/// Components for a [`TtsPipeline`]; anything left unset gets the built-in
/// implementation.
#[derive(Default)]
pub struct TtsPipelineBuilder {
    spec: Option<ModelSpec>,
    backend: Option<Arc<dyn Backend>>,
    codec: Option<Arc<dyn AudioCodec>>,
    normalizer: Option<Arc<dyn TextNormalizer>>,
    tokenizer: Option<Arc<dyn TextTokenizer>>,
    emissions: Option<Arc<dyn EmissionModel>>,
    aligner: AlignerConfig,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl TtsPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_spec(mut self, spec: ModelSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Sequence model backend. Required.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn AudioCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn TextTokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn emission_model(mut self, model: Arc<dyn EmissionModel>) -> Self {
        self.emissions = Some(model);
        self
    }

    pub fn aligner_config(mut self, config: AlignerConfig) -> Self {
        self.aligner = config;
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Check the components against the model constants and build.
    ///
    /// A component that disagrees with the [`ModelSpec`] is a `Config` error.
    pub fn build(self) -> TtsResult<TtsPipeline> {
        let spec = self.spec.unwrap_or_default();
        spec.validate()?;

        let backend = self
            .backend
            .ok_or_else(|| TtsError::config("pipeline needs a backend"))?;
        if backend.context_capacity() != spec.context_window {
            return Err(TtsError::config(format!(
                "backend {} has a context of {} tokens, model spec says {}",
                backend.name(),
                backend.context_capacity(),
                spec.context_window
            )));
        }

        let codec: Arc<dyn AudioCodec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(VqCodec::seeded(tts_core::CodecConfig::default().seed)?),
        };
        check_codec(&spec, codec.as_ref())?;

        let encoder = TextEncoder::new(
            self.normalizer.unwrap_or_else(|| Arc::new(Normalizer::new())),
            self.tokenizer.unwrap_or_else(|| Arc::new(ByteTokenizer::new())),
            spec.layout.clone(),
        )?;

        let emissions: Arc<dyn EmissionModel> = match self.emissions {
            Some(model) => model,
            None => Arc::new(EnergyEmissionModel::new(&self.aligner)?),
        };
        let aligner = ForcedAligner::new(
            CharVocabulary::latin(),
            emissions,
            self.aligner.min_confidence,
        );

        let mut profiles = SpeakerProfileBuilder::new(codec.clone(), aligner, encoder.clone());
        if let Some(transcriber) = self.transcriber {
            profiles = profiles.with_transcriber(transcriber);
        }

        info!(
            backend = backend.name(),
            model = %spec.name,
            version = %spec.version,
            sample_rate = spec.sample_rate,
            context_window = spec.context_window,
            "pipeline ready"
        );

        Ok(TtsPipeline {
            prompt: PromptAssembler::new(spec.layout.clone())?,
            engine: GenerationEngine::new(backend, spec.layout.clone())?,
            output: OutputAssembler::new(spec.layout.clone(), codec),
            encoder,
            profiles,
            metrics: TtsMetrics::new(),
            spec,
        })
    }
}

fn check_codec(spec: &ModelSpec, codec: &dyn AudioCodec) -> TtsResult<()> {
    if codec.sample_rate() != spec.sample_rate {
        return Err(TtsError::config(format!(
            "codec runs at {} Hz, model spec says {} Hz",
            codec.sample_rate(),
            spec.sample_rate
        )));
    }
    if codec.samples_per_token() != spec.samples_per_token() {
        return Err(TtsError::config(format!(
            "codec has {} samples per token, model spec says {}",
            codec.samples_per_token(),
            spec.samples_per_token()
        )));
    }
    if codec.codebook_size() != spec.codebook_size {
        return Err(TtsError::config(format!(
            "codec has {} codes, model spec says {}",
            codec.codebook_size(),
            spec.codebook_size
        )));
    }
    Ok(())
}

/// The main TTS pipeline combining all processing stages.
///
/// Shared read-only between requests; every call owns its own generation
/// state.
pub struct TtsPipeline {
    spec: ModelSpec,
    encoder: TextEncoder,
    prompt: PromptAssembler,
    engine: GenerationEngine,
    output: OutputAssembler,
    profiles: SpeakerProfileBuilder,
    metrics: TtsMetrics,
}

impl std::fmt::Debug for TtsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsPipeline")
            .field("spec", &self.spec)
            .field("backend", &self.engine.backend().name())
            .finish()
    }
}

impl TtsPipeline {
    pub fn builder() -> TtsPipelineBuilder {
        TtsPipelineBuilder::new()
    }

    /// Pipeline over the deterministic mock backend and built-in components.
    pub fn new_mock() -> TtsResult<Self> {
        Self::mock_from_config(&TtsConfig::default())
    }

    /// Mock backend with codec, aligner and model constants from a config.
    pub fn mock_from_config(config: &TtsConfig) -> TtsResult<Self> {
        let backend = MockBackend::new(config.model.layout.clone(), config.model.context_window);
        Self::from_config(config, Arc::new(backend))
    }

    /// Build from a config file's contents and a backend.
    ///
    /// When the config names a speakers directory, the process-wide speaker
    /// registry is loaded from it unless one is already installed.
    #[instrument(skip_all)]
    pub fn from_config(config: &TtsConfig, backend: Arc<dyn Backend>) -> TtsResult<Self> {
        config.validate()?;
        if let Some(dir) = &config.speakers_dir {
            speakers::init_from_dir(dir)?;
        }
        let codec = VqCodec::from_config(&config.codec)?;
        Self::builder()
            .model_spec(config.model.clone())
            .backend(backend)
            .codec(Arc::new(codec))
            .aligner_config(config.aligner.clone())
            .build()
    }

    pub fn model_spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn encoder(&self) -> &TextEncoder {
        &self.encoder
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    /// Synthesize speech and return the waveform.
    pub fn generate(
        &self,
        text: &str,
        lang: Lang,
        profile: Option<&SpeakerProfile>,
        config: &GenerationConfig,
    ) -> TtsResult<Waveform> {
        self.synthesize(text, lang, profile, config, None)
            .map(|s| s.waveform)
    }

    /// Synthesize speech, reporting codes, stop reason and step count.
    ///
    /// `cancel` is checked between sampling steps.
    #[instrument(skip(self, text, profile, config, cancel), fields(text_len = text.len(), lang = %lang, with_profile = profile.is_some()))]
    pub fn synthesize(
        &self,
        text: &str,
        lang: Lang,
        profile: Option<&SpeakerProfile>,
        config: &GenerationConfig,
        cancel: Option<&CancellationToken>,
    ) -> TtsResult<Synthesis> {
        self.metrics.generation_requested();
        let started = Instant::now();
        let result = self.synthesize_inner(text, lang, profile, config, cancel);
        match &result {
            Ok(s) => self.metrics.generation_completed(
                s.stop_reason,
                s.steps,
                started.elapsed().as_secs_f64(),
                s.duration_secs() as f64,
            ),
            Err(e) => self.metrics.generation_failed(error_kind(e)),
        }
        result
    }

    fn synthesize_inner(
        &self,
        text: &str,
        lang: Lang,
        profile: Option<&SpeakerProfile>,
        config: &GenerationConfig,
        cancel: Option<&CancellationToken>,
    ) -> TtsResult<Synthesis> {
        config.validate()?;
        if config.max_length > self.spec.context_window {
            return Err(TtsError::config(format!(
                "max_length {} exceeds the context window of {}",
                config.max_length, self.spec.context_window
            )));
        }
        if let Some(p) = profile {
            if p.language() != lang {
                warn!(profile = %p.language(), requested = %lang, "speaker profile language differs from the text");
            }
        }

        let encoded = self.encoder.encode(text, Some(lang))?;
        let prompt = self.prompt.assemble(&encoded.tokens, profile)?;
        let generated = self.engine.run(&prompt, config, cancel)?;
        let (waveform, codes) = self.output.assemble(&generated.tokens)?;

        info!(
            words = encoded.text.words.len(),
            prompt_len = prompt.len(),
            steps = generated.steps,
            reason = %generated.stop_reason,
            duration_ms = waveform.duration_ms(),
            "synthesis complete"
        );
        Ok(Synthesis {
            waveform,
            codes,
            stop_reason: generated.stop_reason,
            steps: generated.steps,
        })
    }

    /// Run [`Self::synthesize`] on the blocking thread pool.
    pub async fn generate_async(
        self: &Arc<Self>,
        text: String,
        lang: Lang,
        profile: Option<Arc<SpeakerProfile>>,
        config: GenerationConfig,
        cancel: Option<CancellationToken>,
    ) -> TtsResult<Synthesis> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            pipeline.synthesize(&text, lang, profile.as_deref(), &config, cancel.as_ref())
        })
        .await
        .map_err(|e| TtsError::internal(format!("synthesis task failed: {e}")))?
    }

    /// Build a speaker profile from a reference recording.
    pub fn build_speaker_profile(
        &self,
        waveform: &Waveform,
        transcript: Option<&str>,
        lang: Lang,
    ) -> TtsResult<SpeakerProfile> {
        let result = self.profiles.build(waveform, transcript, lang);
        match &result {
            Ok(_) => self.metrics.profile_built(),
            Err(_) => self.metrics.profile_failed(),
        }
        result
    }

    pub fn save_speaker(&self, profile: &SpeakerProfile, path: impl AsRef<Path>) -> TtsResult<()> {
        speaker::save_speaker(profile, path)
    }

    /// Load a profile and check its tokens against this pipeline's layout.
    pub fn load_speaker(&self, path: impl AsRef<Path>) -> TtsResult<SpeakerProfile> {
        let profile = speaker::load_speaker(path)?;
        profile.validate_tokens(&self.spec.layout)?;
        Ok(profile)
    }

    /// A speaker from the process-wide registry.
    pub fn default_speaker(&self, lang: Lang, name: &str) -> Option<Arc<SpeakerProfile>> {
        speakers::global().and_then(|r| r.get(lang, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_pipeline_matches_v1() {
        let pipeline = TtsPipeline::new_mock().unwrap();
        assert_eq!(pipeline.sample_rate(), 24_000);
        assert_eq!(pipeline.model_spec(), &ModelSpec::v1());
    }

    #[test]
    fn test_builder_requires_backend() {
        assert!(matches!(
            TtsPipeline::builder().build(),
            Err(TtsError::Config(_))
        ));
    }

    #[test]
    fn test_context_mismatch_rejected() {
        let spec = ModelSpec::v1();
        let backend = MockBackend::new(spec.layout.clone(), 1024);
        let err = TtsPipeline::builder()
            .model_spec(spec)
            .backend(Arc::new(backend))
            .build()
            .unwrap_err();
        assert!(matches!(err, TtsError::Config(_)));
    }

    #[test]
    fn test_codec_mismatch_rejected() {
        let mut spec = ModelSpec::v1();
        spec.sample_rate = 16_000;
        spec.tokens_per_second = 50;
        let backend = MockBackend::new(spec.layout.clone(), spec.context_window);
        let err = TtsPipeline::builder()
            .model_spec(spec)
            .backend(Arc::new(backend))
            .build()
            .unwrap_err();
        assert!(matches!(err, TtsError::Config(msg) if msg.contains("Hz")));
    }

    #[test]
    fn test_max_length_beyond_context_rejected() {
        let pipeline = TtsPipeline::new_mock().unwrap();
        let config = GenerationConfig::new(0.1, 1.1, 5000).unwrap();
        assert!(matches!(
            pipeline.generate("hi", Lang::En, None, &config),
            Err(TtsError::Config(_))
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(error_kind(&TtsError::EmptyGeneration), "empty_generation");
        let wrapped = TtsError::speaker_profile("alignment", TtsError::alignment("x"));
        assert_eq!(error_kind(&wrapped), "alignment");
    }
}
