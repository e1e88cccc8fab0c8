use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn separator_regex() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid separator regex"))
}

fn transliterate(c: char) -> Option<&'static str> {
    match c {
        'ß' => Some("ss"),
        'æ' => Some("ae"),
        'ø' => Some("o"),
        'œ' => Some("oe"),
        'ł' => Some("l"),
        'đ' => Some("d"),
        'þ' => Some("th"),
        _ => None,
    }
}

/// Convert a display name into a URL key, e.g. `Größe & Farbe` -> `grosse-and-farbe`
pub fn to_url_key(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .replace('&', " and ")
        .replace('@', " at ");

    let mut ascii = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match transliterate(c) {
            Some(replacement) => ascii.push_str(replacement),
            // decompose and drop the combining marks
            None => ascii.extend(std::iter::once(c).nfkd().filter(char::is_ascii)),
        }
    }

    separator_regex()
        .replace_all(&ascii, "-")
        .trim_matches('-')
        .to_string()
}
