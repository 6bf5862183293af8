use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Trimmed, lowercased, accents dropped. Punctuation is kept.
pub fn fold_accents(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

// Vocabulary lookup key. Punctuation becomes a space, underscores survive.
pub fn normalize(raw: &str) -> String {
    let folded: String = fold_accents(raw)
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
