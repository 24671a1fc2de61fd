//! Alignment of synthetic recordings with known word positions.

use forced_aligner::ForcedAligner;
use tts_core::{AlignerConfig, TtsError, Waveform};

const WORDS: [&str; 20] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliett",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
];

const RATE: u32 = 16_000;
const SLOT_SECS: f32 = 0.6;
const VOICE_START: f32 = 0.1;
const VOICE_END: f32 = 0.5;

/// One voiced burst per word inside a fixed slot, silence elsewhere.
fn bursts(num_words: usize) -> Waveform {
    let slot = (SLOT_SECS * RATE as f32) as usize;
    let start = (VOICE_START * RATE as f32) as usize;
    let end = (VOICE_END * RATE as f32) as usize;
    let mut samples = vec![0.0f32; slot * num_words];
    for w in 0..num_words {
        for i in start..end {
            let t = i as f32 / RATE as f32;
            samples[w * slot + i] = (2.0 * std::f32::consts::PI * (150.0 + 10.0 * w as f32) * t)
                .sin()
                * 0.3;
        }
    }
    Waveform::new(samples, RATE)
}

fn aligner() -> ForcedAligner {
    ForcedAligner::with_defaults(&AlignerConfig::default()).unwrap()
}

#[test]
fn test_twenty_words_in_twelve_seconds() {
    let wav = bursts(20);
    assert!((wav.duration_ms() - 12_000.0).abs() < 1.0);

    let result = aligner().align(&wav, &WORDS.join(" ")).unwrap();
    assert_eq!(result.words.len(), 20);
    assert_eq!(result.num_frames, 600);

    for (i, word) in result.words.iter().enumerate() {
        assert_eq!(word.word, WORDS[i]);
        let slot = i as f32 * SLOT_SECS;
        assert!(
            (word.start_secs - (slot + VOICE_START)).abs() <= 0.05,
            "{} starts at {}",
            word.word,
            word.start_secs
        );
        assert!(
            (word.end_secs - (slot + VOICE_END)).abs() <= 0.05,
            "{} ends at {}",
            word.word,
            word.end_secs
        );
    }
}

#[test]
fn test_double_letter_word_stays_in_its_burst() {
    let result = aligner().align(&bursts(2), "juliett kilo").unwrap();
    let juliett = &result.words[0];
    assert!((juliett.end_secs - VOICE_END).abs() <= 0.05, "juliett ends at {}", juliett.end_secs);
    let kilo = &result.words[1];
    assert!(
        (kilo.start_secs - (SLOT_SECS + VOICE_START)).abs() <= 0.05,
        "kilo starts at {}",
        kilo.start_secs
    );
}

#[test]
fn test_boundaries_are_monotonic() {
    let result = aligner().align(&bursts(20), &WORDS.join(" ")).unwrap();
    for pair in result.words.windows(2) {
        assert!(pair[0].start_frame <= pair[0].end_frame);
        assert!(pair[0].end_frame < pair[1].start_frame);
        assert!(pair[0].end_secs <= pair[1].start_secs);
    }
}

#[test]
fn test_any_input_rate() {
    let wav16 = bursts(4);
    let samples24 = audio_rate(&wav16, 24_000);
    let result = aligner().align(&samples24, "alpha bravo charlie delta").unwrap();
    assert_eq!(result.words.len(), 4);
    assert!((result.words[3].start_secs - (3.0 * SLOT_SECS + VOICE_START)).abs() <= 0.05);
}

fn audio_rate(wav: &Waveform, rate: u32) -> Waveform {
    audio_codec::resample::to_rate(wav, rate).unwrap()
}

#[test]
fn test_mismatched_transcript_rejected() {
    // One short burst in ten seconds cannot carry a thirty-word transcript.
    let rate = RATE as usize;
    let mut samples = vec![0.0f32; rate * 10];
    for (i, s) in samples[rate..rate + rate / 5].iter_mut().enumerate() {
        *s = (i as f32 * 0.06).sin() * 0.3;
    }
    let wav = Waveform::new(samples, RATE);
    let transcript = WORDS.iter().chain(WORDS[..10].iter()).copied().collect::<Vec<_>>().join(" ");

    let err = aligner().align(&wav, &transcript).unwrap_err();
    assert!(matches!(err, TtsError::AlignmentFailed(_)), "{err}");
}

#[test]
fn test_audio_too_short() {
    let wav = Waveform::new(vec![0.2; 1600], RATE);
    let err = aligner().align(&wav, &WORDS.join(" ")).unwrap_err();
    assert!(matches!(err, TtsError::AlignmentFailed(_)));
}

#[test]
fn test_audio_shorter_than_one_frame() {
    let result = aligner().align(&Waveform::new(vec![0.5], 48_000), "a");
    assert!(matches!(result, Err(TtsError::InvalidAudio(_))));
}

#[test]
fn test_empty_transcript() {
    let err = aligner().align(&bursts(1), "   ").unwrap_err();
    assert!(matches!(err, TtsError::AlignmentFailed(_)));
}

#[test]
fn test_unknown_characters_still_align() {
    let result = aligner().align(&bursts(2), "世 界").unwrap();
    assert_eq!(result.words.len(), 2);
    assert_eq!(result.words[0].word, "世");
}
