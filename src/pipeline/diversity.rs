//! Cross-quadrant duplicate removal for generated pieces.
//!
//! Passes, applied in order:
//!
//! 1. **Exact** - normalized text seen earlier in canonical quadrant order is dropped.
//! 2. **Near** - pieces from different quadrants whose bigram similarity exceeds
//!    the threshold; the less important one (higher priority value) is dropped.
//! 3. **Fragment quota** (optional) - caps how many surviving pieces may cite
//!    the same fragment.
//!
//! Removal never edits text; surviving pieces keep their relative order.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::config::DiversityConfig;
use crate::model::{Piece, Quadrant, QuadrantMap};
use crate::util::text::{normalize_text, word_bigrams};

use super::similarity::{Bigrams, jaccard};

/// Filtered pieces plus per-pass removal counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiversityOutcome {
    pub pieces: QuadrantMap<Vec<Piece>>,
    pub exact_removed: usize,
    pub near_removed: usize,
    pub quota_removed: usize,
}

impl DiversityOutcome {
    /// Pieces dropped as exact or near duplicates.
    #[must_use]
    pub fn duplicates_removed(&self) -> usize {
        self.exact_removed + self.near_removed
    }

    /// Every removal, quota drops included.
    #[must_use]
    pub fn total_removed(&self) -> usize {
        self.duplicates_removed() + self.quota_removed
    }
}

/// Applies the diversity passes to one reconciliation round.
///
/// Call once per round with every quadrant's complete candidate list; a
/// quadrant whose generator failed contributes an empty list.
#[derive(Debug, Clone, Default)]
pub struct DiversityFilter {
    config: DiversityConfig,
}

impl DiversityFilter {
    #[must_use]
    pub fn new(config: DiversityConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn filter(&self, mut pieces: QuadrantMap<Vec<Piece>>) -> DiversityOutcome {
        let exact_removed = remove_exact_duplicates(&mut pieces);
        let near_removed = remove_near_duplicates(&mut pieces, self.config.similarity_threshold);
        let quota_removed = self
            .config
            .fragment_quota
            .map_or(0, |quota| enforce_fragment_quota(&mut pieces, quota));

        DiversityOutcome {
            pieces,
            exact_removed,
            near_removed,
            quota_removed,
        }
    }
}

/// Drop every piece whose normalized text was already seen in an earlier
/// position of the canonical walk. Returns the number removed.
pub fn remove_exact_duplicates(pieces: &mut QuadrantMap<Vec<Piece>>) -> usize {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut removed = 0;
    for quadrant in Quadrant::ALL {
        let before = pieces[quadrant].len();
        pieces[quadrant].retain(|piece| seen.insert(normalize_text(&piece.text)));
        removed += before - pieces[quadrant].len();
    }
    removed
}

/// Compare every cross-quadrant pair and drop the less important piece of
/// each pair above `threshold`. Returns the number removed.
///
/// Pairs are enumerated over the canonical flattening (quadrant order, then
/// list order) with `i < j`; on equal priority the later piece `j` is
/// marked. Marked pieces keep participating in later comparisons, so the
/// outcome does not depend on which pair was seen first.
pub fn remove_near_duplicates(pieces: &mut QuadrantMap<Vec<Piece>>, threshold: f64) -> usize {
    let marked = {
        let flat: Vec<(Quadrant, u8, Bigrams)> = pieces
            .iter()
            .flat_map(|(quadrant, list)| {
                list.iter()
                    .map(move |piece| (quadrant, piece.priority, word_bigrams(&piece.text)))
            })
            .collect();

        let mut marked = vec![false; flat.len()];
        for (i, (quadrant_i, priority_i, grams_i)) in flat.iter().enumerate() {
            for (offset, (quadrant_j, priority_j, grams_j)) in flat[i + 1..].iter().enumerate() {
                if quadrant_i == quadrant_j {
                    continue;
                }
                if jaccard(grams_i, grams_j) > threshold {
                    let j = i + 1 + offset;
                    let loser = if priority_i > priority_j { i } else { j };
                    marked[loser] = true;
                }
            }
        }
        marked
    };

    sweep(pieces, &marked)
}

/// Keep at most `quota` pieces per cited fragment, preferring lower priority
/// values across all quadrants (canonical order on ties). Ungrounded pieces
/// are exempt. Returns the number removed.
pub fn enforce_fragment_quota(pieces: &mut QuadrantMap<Vec<Piece>>, quota: usize) -> usize {
    let marked = {
        let mut ranked: Vec<(usize, u8, Option<&str>)> = pieces
            .iter()
            .flat_map(|(_, list)| list.iter())
            .enumerate()
            .map(|(position, piece)| (position, piece.priority, piece.fragment_id()))
            .collect();
        ranked.sort_by_key(|(_, priority, _)| *priority);

        let mut marked = vec![false; ranked.len()];
        let mut usage: FxHashMap<&str, usize> = FxHashMap::default();
        for (position, _, fragment_id) in ranked {
            let Some(fragment_id) = fragment_id else {
                continue;
            };
            let count = usage.entry(fragment_id).or_insert(0);
            if *count >= quota {
                marked[position] = true;
            } else {
                *count += 1;
            }
        }
        marked
    };

    sweep(pieces, &marked)
}

/// Remove pieces whose canonical flat position is marked.
fn sweep(pieces: &mut QuadrantMap<Vec<Piece>>, marked: &[bool]) -> usize {
    let mut offset = 0;
    let mut removed = 0;
    for quadrant in Quadrant::ALL {
        let list = &mut pieces[quadrant];
        let len = list.len();
        let mut position = offset;
        list.retain(|_| {
            let keep = !marked[position];
            position += 1;
            keep
        });
        removed += len - list.len();
        offset += len;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(pieces: Vec<Piece>) -> QuadrantMap<Vec<Piece>> {
        let mut map: QuadrantMap<Vec<Piece>> = QuadrantMap::default();
        for piece in pieces {
            map[piece.quadrant].push(piece);
        }
        map
    }

    fn texts(map: &QuadrantMap<Vec<Piece>>, quadrant: Quadrant) -> Vec<&str> {
        map[quadrant].iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn exact_pass_keeps_first_in_canonical_order() {
        let mut pieces = grouped(vec![
            Piece::new("Soft Light", Quadrant::Function, 1),
            Piece::new("  soft light ", Quadrant::Motion, 5),
            Piece::new("Soft light", Quadrant::Form, 3),
        ]);

        let removed = remove_exact_duplicates(&mut pieces);

        assert_eq!(removed, 2);
        assert_eq!(texts(&pieces, Quadrant::Form), vec!["Soft light"]);
        assert!(pieces[Quadrant::Motion].is_empty());
        assert!(pieces[Quadrant::Function].is_empty());
    }

    #[test]
    fn exact_pass_also_catches_same_quadrant_repeats() {
        let mut pieces = grouped(vec![
            Piece::new("grid", Quadrant::Form, 1),
            Piece::new("GRID", Quadrant::Form, 2),
        ]);
        assert_eq!(remove_exact_duplicates(&mut pieces), 1);
        assert_eq!(texts(&pieces, Quadrant::Form), vec!["grid"]);
    }

    #[test]
    fn exact_pass_keeps_every_distinct_text() {
        let mut pieces = grouped(
            (0..5_000)
                .map(|i| {
                    let quadrant = Quadrant::ALL[i % Quadrant::ALL.len()];
                    Piece::new(format!("variant {i} of the grid"), quadrant, 1)
                })
                .chain([
                    Piece::new("quiet  grid", Quadrant::Form, 1),
                    Piece::new("quiet grid", Quadrant::Motion, 1),
                ])
                .collect(),
        );

        assert_eq!(remove_exact_duplicates(&mut pieces), 0);
        assert_eq!(pieces.total_len(), 5_002);
    }

    #[test]
    fn exact_pass_is_idempotent() {
        let mut pieces = grouped(vec![
            Piece::new("a b", Quadrant::Form, 1),
            Piece::new("A B", Quadrant::Expression, 1),
            Piece::new("c d", Quadrant::Function, 1),
        ]);
        remove_exact_duplicates(&mut pieces);
        let snapshot = pieces.clone();

        assert_eq!(remove_exact_duplicates(&mut pieces), 0);
        assert_eq!(pieces, snapshot);
    }

    #[test]
    fn near_pass_drops_lower_importance_piece() {
        let mut pieces = grouped(vec![
            Piece::new("Warm ceremonial calm", Quadrant::Form, 1),
            Piece::new("Warm ceremonial calm tone", Quadrant::Expression, 3),
        ]);

        let removed = remove_near_duplicates(&mut pieces, 0.5);

        assert_eq!(removed, 1);
        assert_eq!(texts(&pieces, Quadrant::Form), vec!["Warm ceremonial calm"]);
        assert!(pieces[Quadrant::Expression].is_empty());
    }

    #[test]
    fn near_pass_drops_earlier_piece_when_it_is_less_important() {
        let mut pieces = grouped(vec![
            Piece::new("slow drift over the harbor", Quadrant::Form, 5),
            Piece::new("slow drift over the harbor tonight", Quadrant::Motion, 2),
        ]);

        remove_near_duplicates(&mut pieces, 0.5);

        assert!(pieces[Quadrant::Form].is_empty());
        assert_eq!(pieces[Quadrant::Motion].len(), 1);
    }

    #[test]
    fn near_pass_breaks_priority_ties_toward_the_first_piece() {
        let mut pieces = grouped(vec![
            Piece::new("quiet grid of paper", Quadrant::Function, 2),
            Piece::new("quiet grid of paper", Quadrant::Form, 2),
        ]);

        remove_near_duplicates(&mut pieces, 0.5);

        // Form precedes Function in the canonical walk, so Function is "second".
        assert_eq!(pieces[Quadrant::Form].len(), 1);
        assert!(pieces[Quadrant::Function].is_empty());
    }

    #[test]
    fn near_pass_ignores_same_quadrant_pairs() {
        let mut pieces = grouped(vec![
            Piece::new("slow drift over water", Quadrant::Motion, 1),
            Piece::new("slow drift over water again", Quadrant::Motion, 4),
        ]);
        assert_eq!(remove_near_duplicates(&mut pieces, 0.5), 0);
        assert_eq!(pieces[Quadrant::Motion].len(), 2);
    }

    #[test]
    fn near_pass_threshold_is_strict() {
        // {a b, b c} vs {a b, b c, c d} share two of three bigrams.
        let mut pieces = grouped(vec![
            Piece::new("a b c", Quadrant::Form, 1),
            Piece::new("a b c d", Quadrant::Motion, 2),
        ]);
        let threshold = 2.0 / 3.0;
        assert_eq!(remove_near_duplicates(&mut pieces, threshold), 0);
    }

    #[test]
    fn quota_pass_prefers_important_pieces() {
        let mut pieces = grouped(vec![
            Piece::new("one", Quadrant::Form, 4).grounded_in("f1", ""),
            Piece::new("two", Quadrant::Motion, 1).grounded_in("f1", ""),
            Piece::new("three", Quadrant::Expression, 2).grounded_in("f1", ""),
            Piece::new("free", Quadrant::Function, 6),
        ]);

        let removed = enforce_fragment_quota(&mut pieces, 2);

        assert_eq!(removed, 1);
        assert!(pieces[Quadrant::Form].is_empty());
        assert_eq!(pieces[Quadrant::Motion].len(), 1);
        assert_eq!(pieces[Quadrant::Expression].len(), 1);
        assert_eq!(pieces[Quadrant::Function].len(), 1);
    }

    #[test]
    fn filter_reports_counts_and_skips_quota_by_default() {
        let pieces = grouped(vec![
            Piece::new("Warm ceremonial calm", Quadrant::Form, 1).grounded_in("f1", ""),
            Piece::new("warm ceremonial calm", Quadrant::Motion, 1).grounded_in("f1", ""),
            Piece::new("Warm ceremonial calm tone", Quadrant::Expression, 3).grounded_in("f1", ""),
            Piece::new("Checkout in two taps", Quadrant::Function, 2).grounded_in("f1", ""),
            Piece::new("Booking flow for families", Quadrant::Function, 3).grounded_in("f1", ""),
        ]);

        let outcome = DiversityFilter::default().filter(pieces);

        assert_eq!(outcome.exact_removed, 1);
        assert_eq!(outcome.near_removed, 1);
        assert_eq!(outcome.quota_removed, 0);
        assert_eq!(outcome.duplicates_removed(), 2);
        assert_eq!(outcome.pieces.total_len(), 3);
    }

    #[test]
    fn filter_applies_quota_when_configured() {
        let pieces = grouped(vec![
            Piece::new("Layered paper grid", Quadrant::Form, 1).grounded_in("f1", ""),
            Piece::new("Slow tidal sway", Quadrant::Motion, 2).grounded_in("f1", ""),
            Piece::new("Hushed evening warmth", Quadrant::Expression, 3).grounded_in("f1", ""),
        ]);
        let filter = DiversityFilter::new(DiversityConfig {
            similarity_threshold: 0.5,
            fragment_quota: Some(1),
        });

        let outcome = filter.filter(pieces);

        assert_eq!(outcome.quota_removed, 2);
        assert_eq!(texts(&outcome.pieces, Quadrant::Form), vec!["Layered paper grid"]);
        assert_eq!(outcome.total_removed(), 2);
    }

    #[test]
    fn filter_accepts_empty_input() {
        let outcome = DiversityFilter::default().filter(QuadrantMap::default());
        assert_eq!(outcome.total_removed(), 0);
        assert_eq!(outcome.pieces.total_len(), 0);
    }
}
