//! Word-bigram Jaccard similarity for short statements.

use rustc_hash::FxHashSet;

use crate::util::text::word_bigrams;

/// Word bigrams of one text, computed once and compared many times.
pub(crate) type Bigrams = FxHashSet<(String, String)>;

/// Jaccard index of the two texts' word-bigram sets, in `[0, 1]`.
///
/// Texts with fewer than two words have no bigrams and score `0.0` against
/// anything, including themselves. Exact matches of short texts are the
/// exact-dedup pass's concern.
#[must_use]
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_bigrams(a), &word_bigrams(b))
}

/// Jaccard index of two precomputed bigram sets. Empty on either side gives `0.0`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn jaccard(grams_a: &Bigrams, grams_b: &Bigrams) -> f64 {
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }

    let (small, large) = if grams_a.len() <= grams_b.len() {
        (grams_a, grams_b)
    } else {
        (grams_b, grams_a)
    };
    let intersection = small.iter().filter(|gram| large.contains(*gram)).count();
    let union = grams_a.len() + grams_b.len() - intersection;

    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn identical_texts_score_one() {
        let sim = bigram_similarity("Warm ceremonial calm", "Warm ceremonial calm");
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn comparison_ignores_case() {
        let sim = bigram_similarity("QUIET GRID", "quiet grid");
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extension_by_one_word_is_two_thirds() {
        let sim = bigram_similarity("Warm ceremonial calm", "Warm ceremonial calm tone");
        assert!((sim - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        let sim = bigram_similarity("Layered paper grid", "Sudden kinetic burst");
        assert!(sim.abs() < f64::EPSILON);
    }

    #[rstest]
    #[case("calm", "calm")]
    #[case("calm", "calm tone here")]
    #[case("", "")]
    #[case("   ", "soft light")]
    fn short_texts_score_zero(#[case] a: &str, #[case] b: &str) {
        assert!(bigram_similarity(a, b).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case("slow drift over water", "drift over water at night")]
    #[case("bold type stack", "type stack bold")]
    #[case("one two", "three four five")]
    fn similarity_is_symmetric(#[case] a: &str, #[case] b: &str) {
        let forward = bigram_similarity(a, b);
        let backward = bigram_similarity(b, a);
        assert!((forward - backward).abs() < f64::EPSILON);
        assert!((0.0..=1.0).contains(&forward));
    }
}
