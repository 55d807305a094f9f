//! Text helpers shared by the dedup passes and the piece pool.
use rustc_hash::FxHashSet;

/// Exact-match key: lower-cased and trimmed. Inner whitespace is kept as is.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Set of contiguous two-word windows over the lower-cased, whitespace-split text.
///
/// Returns an empty set for texts with fewer than two words.
#[must_use]
pub fn word_bigrams(text: &str) -> FxHashSet<(String, String)> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    words
        .windows(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect()
}
