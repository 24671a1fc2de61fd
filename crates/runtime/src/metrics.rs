//! Metrics recorded through the `metrics` facade.
//!
//! The library installs no recorder; a host that wants the numbers installs
//! one (Prometheus, statsd, ...) before building the pipeline.

use generation::StopReason;
use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Metrics recorder for synthesis and speaker-profile operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtsMetrics;

impl TtsMetrics {
    /// Register metric descriptions with whatever recorder is installed.
    pub fn new() -> Self {
        describe_counter!(
            "tts_generation_requests_total",
            "Total number of generation requests received"
        );
        describe_counter!(
            "tts_generation_completed_total",
            "Generations that produced audio, labelled by stop reason"
        );
        describe_counter!(
            "tts_generation_failed_total",
            "Generations that failed, labelled by error kind"
        );
        describe_histogram!("tts_generation_steps", "Sampling steps per generation");
        describe_histogram!(
            "tts_rtf",
            "Real-time factor (processing time / audio duration)"
        );
        describe_counter!(
            "tts_speaker_profiles_built_total",
            "Speaker profiles built successfully"
        );
        describe_counter!(
            "tts_speaker_profiles_failed_total",
            "Speaker profile builds that failed"
        );
        Self
    }

    pub fn generation_requested(&self) {
        counter!("tts_generation_requests_total").increment(1);
    }

    /// Record a finished generation and its real-time factor.
    pub fn generation_completed(&self, reason: StopReason, steps: usize, elapsed_secs: f64, audio_secs: f64) {
        counter!("tts_generation_completed_total", "reason" => reason.as_str()).increment(1);
        histogram!("tts_generation_steps").record(steps as f64);
        if audio_secs > 0.0 {
            histogram!("tts_rtf").record(elapsed_secs / audio_secs);
        }
    }

    pub fn generation_failed(&self, kind: &'static str) {
        counter!("tts_generation_failed_total", "kind" => kind).increment(1);
    }

    pub fn profile_built(&self) {
        counter!("tts_speaker_profiles_built_total").increment(1);
    }

    pub fn profile_failed(&self) {
        counter!("tts_speaker_profiles_failed_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_without_recorder() {
        let metrics = TtsMetrics::new();
        metrics.generation_requested();
        metrics.generation_completed(StopReason::EndOfGeneration, 12, 0.01, 0.16);
        metrics.generation_completed(StopReason::MaxLength, 1, 0.01, 0.0);
        metrics.generation_failed("backend");
        metrics.profile_built();
        metrics.profile_failed();
    }
}
