//! Romanization of kana and Hangul.
//!
//! Kana follow modified Hepburn; Hangul syllables are decomposed into jamo and
//! transliterated with Revised Romanization (no sound-change rules across
//! syllable boundaries). Characters outside both scripts pass through.

const HANGUL_BASE: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
const VOWELS_PER_LEAD: u32 = 21 * 28;

const LEADS: [&str; 19] = [
    "g", "kk", "n", "d", "tt", "r", "m", "b", "pp", "s", "ss", "", "j", "jj", "ch", "k", "t", "p",
    "h",
];

const VOWELS: [&str; 21] = [
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wae", "oe", "yo", "u", "wo", "we",
    "wi", "yu", "eu", "ui", "i",
];

const TAILS: [&str; 28] = [
    "", "k", "k", "k", "n", "n", "n", "t", "l", "k", "m", "l", "l", "l", "p", "l", "m", "p", "p",
    "t", "t", "ng", "t", "t", "k", "t", "p", "t",
];

/// Whether the character is a precomposed Hangul syllable.
pub fn is_hangul_syllable(c: char) -> bool {
    (HANGUL_BASE..=HANGUL_LAST).contains(&(c as u32))
}

/// Whether the character is hiragana, katakana or the prolonged sound mark.
pub fn is_kana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}' | '\u{30A1}'..='\u{30FA}' | '\u{30FC}')
}

/// Romanize Hangul syllables, leaving everything else untouched.
pub fn romanize_hangul(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 2);
    for c in input.chars() {
        if !is_hangul_syllable(c) {
            out.push(c);
            continue;
        }
        let index = c as u32 - HANGUL_BASE;
        out.push_str(LEADS[(index / VOWELS_PER_LEAD) as usize]);
        out.push_str(VOWELS[((index % VOWELS_PER_LEAD) / 28) as usize]);
        out.push_str(TAILS[(index % 28) as usize]);
    }
    out
}

/// Romanize hiragana and katakana, leaving everything else untouched.
pub fn romanize_kana(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut geminate = false;

    for c in input.chars() {
        if c == '\u{30FC}' {
            if let Some(vowel) = out.chars().last().filter(|v| is_vowel(*v)) {
                out.push(vowel);
            }
            continue;
        }

        let Some(hira) = to_hiragana(c) else {
            geminate = false;
            out.push(c);
            continue;
        };

        match hira {
            'っ' => {
                geminate = true;
                continue;
            }
            'ゃ' | 'ゅ' | 'ょ' => {
                let vowel = match hira {
                    'ゃ' => 'a',
                    'ゅ' => 'u',
                    _ => 'o',
                };
                attach_glide(&mut out, vowel);
                continue;
            }
            _ => {}
        }

        match kana_syllable(hira) {
            Some(syllable) => {
                if geminate {
                    if syllable.starts_with("ch") {
                        out.push('t');
                    } else if let Some(first) = syllable.chars().next().filter(|f| !is_vowel(*f)) {
                        if first != 'n' || syllable.len() > 1 {
                            out.push(first);
                        }
                    }
                    geminate = false;
                }
                out.push_str(syllable);
            }
            None => out.push(c),
        }
    }
    out
}

/// Fold a small ya/yu/yo into the preceding i-row syllable.
fn attach_glide(out: &mut String, vowel: char) {
    for palatal in ["shi", "chi", "ji"] {
        if out.ends_with(palatal) {
            out.pop();
            out.push(vowel);
            return;
        }
    }
    let mut tail = out.chars().rev();
    let ends_with_consonant_i =
        tail.next() == Some('i') && tail.next().is_some_and(|p| !is_vowel(p));
    if ends_with_consonant_i {
        out.pop();
    }
    out.push('y');
    out.push(vowel);
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'i' | 'u' | 'e' | 'o')
}

fn to_hiragana(c: char) -> Option<char> {
    match c {
        '\u{3041}'..='\u{3096}' => Some(c),
        '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - 0x60),
        _ => None,
    }
}

fn kana_syllable(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' | 'ぁ' => "a",
        'い' | 'ぃ' | 'ゐ' => "i",
        'う' | 'ぅ' => "u",
        'え' | 'ぇ' | 'ゑ' => "e",
        'お' | 'ぉ' | 'を' => "o",
        'か' | 'ゕ' => "ka",
        'き' => "ki",
        'く' => "ku",
        'け' | 'ゖ' => "ke",
        'こ' => "ko",
        'が' => "ga",
        'ぎ' => "gi",
        'ぐ' => "gu",
        'げ' => "ge",
        'ご' => "go",
        'さ' => "sa",
        'し' => "shi",
        'す' => "su",
        'せ' => "se",
        'そ' => "so",
        'ざ' => "za",
        'じ' | 'ぢ' => "ji",
        'ず' | 'づ' => "zu",
        'ぜ' => "ze",
        'ぞ' => "zo",
        'た' => "ta",
        'ち' => "chi",
        'つ' => "tsu",
        'て' => "te",
        'と' => "to",
        'だ' => "da",
        'で' => "de",
        'ど' => "do",
        'な' => "na",
        'に' => "ni",
        'ぬ' => "nu",
        'ね' => "ne",
        'の' => "no",
        'は' => "ha",
        'ひ' => "hi",
        'ふ' => "fu",
        'へ' => "he",
        'ほ' => "ho",
        'ば' => "ba",
        'び' => "bi",
        'ぶ' => "bu",
        'べ' => "be",
        'ぼ' => "bo",
        'ぱ' => "pa",
        'ぴ' => "pi",
        'ぷ' => "pu",
        'ぺ' => "pe",
        'ぽ' => "po",
        'ま' => "ma",
        'み' => "mi",
        'む' => "mu",
        'め' => "me",
        'も' => "mo",
        'や' => "ya",
        'ゆ' => "yu",
        'よ' => "yo",
        'ら' => "ra",
        'り' => "ri",
        'る' => "ru",
        'れ' => "re",
        'ろ' => "ro",
        'わ' | 'ゎ' => "wa",
        'ん' => "n",
        'ゔ' => "vu",
        _ => return None,
    };
    Some(romaji)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hangul() {
        assert_eq!(romanize_hangul("한국어"), "hangukeo");
        assert_eq!(romanize_hangul("안녕"), "annyeong");
        assert_eq!(romanize_hangul("서울"), "seoul");
        assert_eq!(romanize_hangul("abc 서울"), "abc seoul");
    }

    #[test]
    fn test_hiragana() {
        assert_eq!(romanize_kana("こんにちは"), "konnichiha");
        assert_eq!(romanize_kana("ありがとう"), "arigatou");
        assert_eq!(romanize_kana("きょう"), "kyou");
        assert_eq!(romanize_kana("しゃしん"), "shashin");
    }

    #[test]
    fn test_katakana_and_marks() {
        assert_eq!(romanize_kana("カタカナ"), "katakana");
        assert_eq!(romanize_kana("コーヒー"), "koohii");
        assert_eq!(romanize_kana("きって"), "kitte");
        assert_eq!(romanize_kana("まっちゃ"), "matcha");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(romanize_kana("東京へ"), "東京he");
        assert_eq!(romanize_hangul("東京"), "東京");
        assert!(is_kana('ア'));
        assert!(!is_kana('東'));
        assert!(is_hangul_syllable('한'));
    }
}
