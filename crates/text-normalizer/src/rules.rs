//! Normalization rules.

use tts_core::{Lang, TtsResult};
use unicode_segmentation::UnicodeSegmentation;

use crate::num2words;
use crate::romanize;

/// A text normalization rule.
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Get the rule name.
    fn name(&self) -> &str;

    /// Check if this rule applies to the given language.
    fn applies_to(&self, lang: Lang) -> bool;

    /// Apply the rule to the input text.
    fn apply(&self, input: &str, lang: Lang) -> TtsResult<String>;
}

/// Create the default set of normalization rules, in application order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(UnicodeCleanupRule),
        Box::new(SymbolRule),
        Box::new(NumberRule),
        Box::new(RomanizationRule),
        Box::new(SegmentationRule),
        Box::new(PunctuationRule),
        Box::new(WhitespaceRule),
    ]
}

/// Normalize whitespace (collapse multiple spaces, trim).
#[derive(Debug)]
pub struct WhitespaceRule;

impl Rule for WhitespaceRule {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn applies_to(&self, _lang: Lang) -> bool {
        true
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        Ok(input.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Map typographic and full-width characters onto plain ones.
#[derive(Debug)]
pub struct UnicodeCleanupRule;

impl Rule for UnicodeCleanupRule {
    fn name(&self) -> &str {
        "unicode_cleanup"
    }

    fn applies_to(&self, _lang: Lang) -> bool {
        true
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                '\u{00A0}' | '\u{3000}' => out.push(' '),
                '\u{2018}' | '\u{2019}' => out.push('\''),
                '\u{201C}' | '\u{201D}' => out.push('"'),
                '\u{2013}' => out.push('-'),
                '\u{2014}' => out.push_str(" - "),
                '\u{2026}' => out.push_str("..."),
                // Full-width ASCII variants.
                '\u{FF01}'..='\u{FF5E}' => {
                    out.push(char::from_u32(c as u32 - 0xFEE0).unwrap_or(c));
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }
}

/// Spell out common symbols in English text.
#[derive(Debug)]
pub struct SymbolRule;

impl Rule for SymbolRule {
    fn name(&self) -> &str {
        "symbol"
    }

    fn applies_to(&self, lang: Lang) -> bool {
        lang == Lang::En
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                '@' => out.push_str(" at "),
                '&' => out.push_str(" and "),
                '%' => out.push_str(" percent "),
                '+' => out.push_str(" plus "),
                '=' => out.push_str(" equals "),
                '#' => out.push_str(" number "),
                _ => out.push(c),
            }
        }
        Ok(out)
    }
}

/// Expand English numbers: cardinals, ordinals, decimals and negatives.
#[derive(Debug)]
pub struct NumberRule;

impl Rule for NumberRule {
    fn name(&self) -> &str {
        "number"
    }

    fn applies_to(&self, lang: Lang) -> bool {
        lang == Lang::En
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        let chars: Vec<char> = input.chars().collect();
        let mut out = String::with_capacity(input.len() * 2);
        let mut i = 0;

        while i < chars.len() {
            if !chars[i].is_ascii_digit() {
                out.push(chars[i]);
                i += 1;
                continue;
            }

            let start = i;
            let mut integer = String::new();
            while i < chars.len() {
                if chars[i].is_ascii_digit() {
                    integer.push(chars[i]);
                    i += 1;
                } else if chars[i] == ',' && is_thousands_group(&chars, i + 1) {
                    i += 1;
                } else {
                    break;
                }
            }

            let mut fraction = None;
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                let from = i + 1;
                i = from;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                fraction = Some(chars[from..i].iter().collect::<String>());
            }

            let ordinal = fraction.is_none() && has_ordinal_suffix(&chars, i);
            if ordinal {
                i += 2;
            }

            // A minus sign counts only at the start of a word, not in ranges like 10-12.
            let negative = start > 0
                && chars[start - 1] == '-'
                && (start == 1 || chars[start - 2].is_whitespace());
            if negative {
                out.pop();
            }

            out.push(' ');
            if negative {
                out.push_str("minus ");
            }
            out.push_str(&spell_integer(&integer, ordinal));
            if let Some(fraction) = fraction {
                out.push_str(" point ");
                out.push_str(&num2words::digits(&fraction));
            }
            out.push(' ');
        }

        Ok(out)
    }
}

fn is_thousands_group(chars: &[char], start: usize) -> bool {
    let end = start + 3;
    end <= chars.len()
        && chars[start..end].iter().all(char::is_ascii_digit)
        && chars.get(end).map_or(true, |c| !c.is_ascii_digit())
}

fn has_ordinal_suffix(chars: &[char], at: usize) -> bool {
    if at + 2 > chars.len() {
        return false;
    }
    let suffix: String = chars[at..at + 2].iter().collect::<String>().to_lowercase();
    let boundary = chars.get(at + 2).map_or(true, |c| !c.is_alphanumeric());
    boundary && matches!(suffix.as_str(), "st" | "nd" | "rd" | "th")
}

fn spell_integer(digits: &str, ordinal: bool) -> String {
    match digits.parse::<i64>() {
        Ok(n) if ordinal => num2words::ordinal(n as u64),
        Ok(n) => num2words::cardinal(n),
        Err(_) => num2words::digits(digits),
    }
}

/// Transliterate kana (Japanese) and Hangul (Korean) into Latin letters.
#[derive(Debug)]
pub struct RomanizationRule;

impl Rule for RomanizationRule {
    fn name(&self) -> &str {
        "romanization"
    }

    fn applies_to(&self, lang: Lang) -> bool {
        matches!(lang, Lang::Ja | Lang::Ko)
    }

    fn apply(&self, input: &str, lang: Lang) -> TtsResult<String> {
        Ok(match lang {
            Lang::Ja => romanize::romanize_kana(input),
            Lang::Ko => romanize::romanize_hangul(input),
            _ => input.to_string(),
        })
    }
}

/// Split text without whitespace word boundaries into UAX #29 words.
#[derive(Debug)]
pub struct SegmentationRule;

impl Rule for SegmentationRule {
    fn name(&self) -> &str {
        "segmentation"
    }

    fn applies_to(&self, lang: Lang) -> bool {
        matches!(lang, Lang::Ja | Lang::Zh)
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        Ok(input.unicode_words().collect::<Vec<_>>().join(" "))
    }
}

/// Lowercase and replace punctuation with word breaks.
#[derive(Debug)]
pub struct PunctuationRule;

impl Rule for PunctuationRule {
    fn name(&self) -> &str {
        "punctuation"
    }

    fn applies_to(&self, _lang: Lang) -> bool {
        true
    }

    fn apply(&self, input: &str, _lang: Lang) -> TtsResult<String> {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if c.is_alphanumeric() {
                out.extend(c.to_lowercase());
            } else if c == '\'' {
                // contractions stay one word
            } else {
                out.push(' ');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_rule() {
        let rule = WhitespaceRule;
        let result = rule.apply("  hello \t  world\n ", Lang::En).unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_unicode_cleanup_rule() {
        let rule = UnicodeCleanupRule;
        assert_eq!(rule.apply("hello—world", Lang::En).unwrap(), "hello - world");
        assert_eq!(
            rule.apply("\u{201C}hi\u{201D}", Lang::En).unwrap(),
            "\"hi\""
        );
        assert_eq!(rule.apply("ＡＢＣ１２", Lang::Ja).unwrap(), "ABC12");
    }

    #[test]
    fn test_symbol_rule() {
        let rule = SymbolRule;
        assert_eq!(rule.apply("you&me", Lang::En).unwrap(), "you and me");
        assert!(!rule.applies_to(Lang::Zh));
    }

    #[test]
    fn test_number_rule_cardinals() {
        let rule = NumberRule;
        let out = rule.apply("I have 42 apples", Lang::En).unwrap();
        assert_eq!(
            WhitespaceRule.apply(&out, Lang::En).unwrap(),
            "I have forty two apples"
        );

        let out = rule.apply("1,500 people", Lang::En).unwrap();
        assert_eq!(
            WhitespaceRule.apply(&out, Lang::En).unwrap(),
            "one thousand five hundred people"
        );
    }

    #[test]
    fn test_number_rule_ordinals_decimals_negatives() {
        let rule = NumberRule;
        let clean = |s: &str| {
            let expanded = rule.apply(s, Lang::En).unwrap();
            WhitespaceRule.apply(&expanded, Lang::En).unwrap()
        };

        assert_eq!(clean("the 21st century"), "the twenty first century");
        assert_eq!(clean("3.14"), "three point one four");
        assert_eq!(clean("it is -5 outside"), "it is minus five outside");
        assert_eq!(clean("pages 10-12"), "pages ten - twelve");
    }

    #[test]
    fn test_number_rule_huge_number_reads_digits() {
        let rule = NumberRule;
        let out = rule.apply("99999999999999999999", Lang::En).unwrap();
        assert!(out.trim().starts_with("nine nine nine"));
    }

    #[test]
    fn test_segmentation_rule() {
        let rule = SegmentationRule;
        assert_eq!(rule.apply("你好世界", Lang::Zh).unwrap(), "你 好 世 界");
        assert_eq!(
            rule.apply("konnichiha東京", Lang::Ja).unwrap(),
            "konnichiha 東 京"
        );
    }

    #[test]
    fn test_punctuation_rule() {
        let rule = PunctuationRule;
        let out = rule.apply("Hello, World! Don't", Lang::En).unwrap();
        assert_eq!(WhitespaceRule.apply(&out, Lang::En).unwrap(), "hello world dont");
    }
}
