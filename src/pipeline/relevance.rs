//! Keyword-overlap relevance between a fragment and a quadrant.

use rayon::prelude::*;

use crate::config::ScoringWeights;
use crate::model::{Fragment, Quadrant};

use super::keywords::KeywordTable;

/// Relevance of one fragment to one quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPair {
    /// Index of the fragment in the input slice.
    pub fragment_index: usize,
    pub quadrant: Quadrant,
    pub score: u32,
}

/// Scores fragments against the keyword table.
///
/// Pure and deterministic for a fixed table and weights.
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    table: KeywordTable,
    weights: ScoringWeights,
}

impl RelevanceScorer {
    #[must_use]
    pub fn new(table: KeywordTable, weights: ScoringWeights) -> Self {
        Self { table, weights }
    }

    /// Relevance of `fragment` to `quadrant`.
    #[must_use]
    pub fn score(&self, fragment: &Fragment, quadrant: Quadrant) -> u32 {
        self.score_text(fragment, &fragment.searchable_text(), quadrant)
    }

    /// Every `(fragment, quadrant)` pair with a positive score, fragment-major
    /// and quadrant-minor in canonical order.
    #[must_use]
    pub fn score_pairs(&self, fragments: &[Fragment]) -> Vec<ScoredPair> {
        fragments
            .par_iter()
            .enumerate()
            .map(|(fragment_index, fragment)| {
                let text = fragment.searchable_text();
                Quadrant::ALL
                    .into_iter()
                    .filter_map(|quadrant| {
                        let score = self.score_text(fragment, &text, quadrant);
                        (score > 0).then_some(ScoredPair {
                            fragment_index,
                            quadrant,
                            score,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn score_text(&self, fragment: &Fragment, lowered: &str, quadrant: Quadrant) -> u32 {
        let hits = self.table.hits(quadrant, lowered);
        let mut score = hits
            .primary
            .saturating_mul(self.weights.primary)
            .saturating_add(hits.secondary.saturating_mul(self.weights.secondary));

        // Images read as structure and tone, not as movement or purpose.
        if fragment.is_image() && matches!(quadrant, Quadrant::Form | Quadrant::Expression) {
            score = score.saturating_add(self.weights.image_bonus);
            if !fragment.palette.is_empty() {
                score = score.saturating_add(self.weights.palette_bonus);
            }
        }
        score
    }
}
