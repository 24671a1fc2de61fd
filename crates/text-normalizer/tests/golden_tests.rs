//! Golden tests for text normalization.
//!
//! Each case fixes the exact word list the tokenizer and aligner will see.

use text_normalizer::Normalizer;
use tts_core::{Lang, TextNormalizer};

struct GoldenTestCase {
    input: &'static str,
    expected: &'static [&'static str],
    lang: Lang,
    description: &'static str,
}

const GOLDEN_TESTS: &[GoldenTestCase] = &[
    GoldenTestCase {
        input: "In 2024, we had 42 events & 3 meetings.",
        expected: &[
            "in", "two", "thousand", "twenty", "four", "we", "had", "forty", "two", "events",
            "and", "three", "meetings",
        ],
        lang: Lang::En,
        description: "Cardinals and symbols",
    },
    GoldenTestCase {
        input: "The 1st and 2nd runners-up",
        expected: &["the", "first", "and", "second", "runners", "up"],
        lang: Lang::En,
        description: "Ordinals and hyphenated words",
    },
    GoldenTestCase {
        input: "It\u{2019}s 3.5% off",
        expected: &["its", "three", "point", "five", "percent", "off"],
        lang: Lang::En,
        description: "Decimal percentage with typographic apostrophe",
    },
    GoldenTestCase {
        input: "こんにちは、世界！",
        expected: &["konnichiha", "世", "界"],
        lang: Lang::Ja,
        description: "Kana romanized, Han segmented",
    },
    GoldenTestCase {
        input: "안녕하세요, 세계!",
        expected: &["annyeonghaseyo", "segye"],
        lang: Lang::Ko,
        description: "Hangul romanized",
    },
    GoldenTestCase {
        input: "你好，世界。",
        expected: &["你", "好", "世", "界"],
        lang: Lang::Zh,
        description: "Han segmented per character",
    },
];

#[test]
fn golden_corpus_with_language_tag() {
    let normalizer = Normalizer::new();
    for case in GOLDEN_TESTS {
        let result = normalizer
            .normalize(case.input, Some(case.lang))
            .unwrap_or_else(|e| panic!("{}: {e}", case.description));
        assert_eq!(result.words, case.expected, "{}", case.description);
        assert_eq!(result.lang, case.lang);
        assert_eq!(result.text, case.expected.join(" "));
    }
}

#[test]
fn golden_corpus_with_detected_language() {
    let normalizer = Normalizer::new();
    for case in GOLDEN_TESTS {
        let result = normalizer.normalize(case.input, None).unwrap();
        assert_eq!(result.lang, case.lang, "{}", case.description);
        assert_eq!(result.words, case.expected, "{}", case.description);
    }
}

#[test]
fn normalization_is_idempotent() {
    let normalizer = Normalizer::new();
    for case in GOLDEN_TESTS.iter().filter(|c| c.lang != Lang::Ja) {
        let once = normalizer.normalize(case.input, Some(case.lang)).unwrap();
        let twice = normalizer.normalize(&once.text, Some(case.lang)).unwrap();
        assert_eq!(once, twice, "{}", case.description);
    }
}
