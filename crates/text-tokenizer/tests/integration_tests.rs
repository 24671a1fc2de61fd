//! Integration tests for text-tokenizer crate.
//!
//! A small word-level `tokenizer.json` is written to a temp dir so the
//! HuggingFace wrapper is exercised without shipping model files.

use std::sync::Arc;

use text_normalizer::Normalizer;
use text_tokenizer::{TextEncoder, Tokenizer};
use tts_core::{Lang, NormText, TextTokenizer, TokenLayout, TtsError};

const WORD_LEVEL_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": { "[UNK]": 0, "hello": 1, "world": 2, "two": 3, "cats": 4 },
    "unk_token": "[UNK]"
  }
}"#;

fn word_tokenizer() -> Tokenizer {
    Tokenizer::from_json(WORD_LEVEL_JSON).expect("should parse tokenizer")
}

#[test]
fn test_load_tokenizer_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokenizer.json");
    std::fs::write(&path, WORD_LEVEL_JSON).unwrap();

    let tokenizer = Tokenizer::from_file(&path).expect("should load tokenizer");
    assert_eq!(tokenizer.vocab_size(), 5);
}

#[test]
fn test_missing_file_is_model_load_error() {
    let err = Tokenizer::from_file("/nonexistent/tokenizer.json").unwrap_err();
    assert!(matches!(err, TtsError::ModelLoad { .. }));
}

#[test]
fn test_invalid_json_is_config_error() {
    assert!(matches!(
        Tokenizer::from_json("{ not json"),
        Err(TtsError::Config(_))
    ));
}

#[test]
fn test_encode_decode_roundtrip() {
    let tokenizer = word_tokenizer();
    let text = NormText::from_words(vec!["hello".into(), "world".into()], Lang::En);
    let tokens = tokenizer.encode(&text).unwrap();

    assert_eq!(tokens.ids, vec![1, 2]);
    assert_eq!(tokens.offsets, vec![(0, 5), (6, 11)]);
    assert_eq!(tokenizer.decode(&tokens).unwrap(), "hello world");
}

#[test]
fn test_unknown_words_map_to_unk() {
    let tokenizer = word_tokenizer();
    let text = NormText::from_words(vec!["hello".into(), "dogs".into()], Lang::En);
    let tokens = tokenizer.encode(&text).unwrap();
    assert_eq!(tokens.ids, vec![1, 0]);
}

#[test]
fn test_text_encoder_with_hf_tokenizer() {
    let encoder = TextEncoder::new(
        Arc::new(Normalizer::new()),
        Arc::new(word_tokenizer()),
        TokenLayout::contiguous(16, 64),
    )
    .unwrap();

    let encoded = encoder.encode("2 cats", Some(Lang::En)).unwrap();
    assert_eq!(encoded.text.words, vec!["two", "cats"]);
    assert_eq!(encoded.tokens, vec![3, 4]);
    assert_eq!(encoder.decode(&encoded.tokens).unwrap(), "two cats");
}

#[test]
fn test_text_encoder_with_offset_layout() {
    let mut layout = TokenLayout::contiguous(16, 64);
    layout.text_offset = 500;
    layout.acoustic_offset = 1000;
    let encoder =
        TextEncoder::new(Arc::new(Normalizer::new()), Arc::new(word_tokenizer()), layout).unwrap();

    let encoded = encoder.encode("Hello world", None).unwrap();
    assert_eq!(encoded.tokens, vec![501, 502]);
}
