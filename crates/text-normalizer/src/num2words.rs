//! English number verbalization.

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 4] = [
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Spell out a cardinal number, e.g. `2345` -> "two thousand three hundred forty five".
pub fn cardinal(num: i64) -> String {
    if num == 0 {
        return ONES[0].to_string();
    }
    let mut words = Vec::new();
    if num < 0 {
        words.push("minus");
    }
    push_cardinal(num.unsigned_abs(), &mut words);
    words.join(" ")
}

/// Spell out an ordinal number, e.g. `21` -> "twenty first".
pub fn ordinal(num: u64) -> String {
    let mut words = Vec::new();
    if num == 0 {
        words.push(ONES[0]);
    } else {
        push_cardinal(num, &mut words);
    }
    let last = words.pop().unwrap_or(ONES[0]);
    let mut out = words.join(" ");
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(&ordinal_word(last));
    out
}

/// Read a digit string one digit at a time, e.g. "0042" -> "zero zero four two".
pub fn digits(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_cardinal(mut n: u64, out: &mut Vec<&'static str>) {
    for (scale, name) in SCALES {
        if n >= scale {
            push_cardinal(n / scale, out);
            out.push(name);
            n %= scale;
        }
    }
    push_below_thousand(n, out);
}

fn push_below_thousand(n: u64, out: &mut Vec<&'static str>) {
    let hundreds = (n / 100) as usize;
    if hundreds > 0 {
        out.push(ONES[hundreds]);
        out.push("hundred");
    }
    let rest = (n % 100) as usize;
    if rest >= 20 {
        out.push(TENS[rest / 10]);
        if rest % 10 > 0 {
            out.push(ONES[rest % 10]);
        }
    } else if rest > 0 {
        out.push(ONES[rest]);
    }
}

fn ordinal_word(word: &str) -> String {
    match word {
        "one" => "first".to_string(),
        "two" => "second".to_string(),
        "three" => "third".to_string(),
        "five" => "fifth".to_string(),
        "eight" => "eighth".to_string(),
        "nine" => "ninth".to_string(),
        "twelve" => "twelfth".to_string(),
        w if w.ends_with('y') => format!("{}ieth", &w[..w.len() - 1]),
        w => format!("{w}th"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_small() {
        assert_eq!(cardinal(0), "zero");
        assert_eq!(cardinal(7), "seven");
        assert_eq!(cardinal(13), "thirteen");
        assert_eq!(cardinal(40), "forty");
        assert_eq!(cardinal(42), "forty two");
        assert_eq!(cardinal(100), "one hundred");
        assert_eq!(cardinal(115), "one hundred fifteen");
    }

    #[test]
    fn test_cardinal_scales() {
        assert_eq!(cardinal(1000), "one thousand");
        assert_eq!(cardinal(2024), "two thousand twenty four");
        assert_eq!(cardinal(2_500_000), "two million five hundred thousand");
        assert_eq!(cardinal(1_000_000_001), "one billion one");
        assert_eq!(cardinal(-15), "minus fifteen");
    }

    #[test]
    fn test_cardinal_extremes() {
        let max = cardinal(i64::MAX);
        assert!(max.starts_with("nine million two hundred twenty three thousand"));
        assert!(max.ends_with("eight hundred seven"));
        assert!(cardinal(i64::MIN).starts_with("minus"));
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal(1), "first");
        assert_eq!(ordinal(2), "second");
        assert_eq!(ordinal(4), "fourth");
        assert_eq!(ordinal(12), "twelfth");
        assert_eq!(ordinal(20), "twentieth");
        assert_eq!(ordinal(21), "twenty first");
        assert_eq!(ordinal(100), "one hundredth");
        assert_eq!(ordinal(0), "zeroth");
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("0042"), "zero zero four two");
        assert_eq!(digits(""), "");
    }
}
