//! Per-quadrant generation and round reconciliation.
//!
//! The text generator itself lives outside this crate. A round asks it for
//! all four quadrants at once and folds the answers into one candidate set;
//! a quadrant whose call fails contributes nothing instead of failing the
//! round.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::model::{Fragment, Piece, Quadrant, QuadrantMap};

use super::assign::Assignment;

/// Produces candidate pieces for one quadrant, grounded in its fragments.
#[async_trait]
pub trait PieceGenerator: Send + Sync {
    /// Generate pieces for `quadrant` from the fragments assigned to it.
    async fn generate(
        &self,
        quadrant: Quadrant,
        fragments: &[Fragment],
    ) -> anyhow::Result<Vec<Piece>>;
}

/// Reconciled output of one generation round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRound {
    pub pieces: QuadrantMap<Vec<Piece>>,
    /// Quadrants whose generator call failed, canonical order.
    pub failed: Vec<Quadrant>,
}

impl GenerationRound {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    #[must_use]
    pub fn total_pieces(&self) -> usize {
        self.pieces.total_len()
    }
}

/// Run the four quadrant calls concurrently and reconcile the results.
///
/// Returned pieces are retagged with the quadrant they were requested for.
pub async fn generate_round(
    generator: &dyn PieceGenerator,
    assignment: &Assignment,
) -> GenerationRound {
    let calls = Quadrant::ALL.map(|quadrant| async move {
        let result = generator
            .generate(quadrant, assignment.fragments(quadrant))
            .await;
        (quadrant, result)
    });

    let mut round = GenerationRound::default();
    for (quadrant, result) in join_all(calls).await {
        match result {
            Ok(mut pieces) => {
                for piece in &mut pieces {
                    piece.quadrant = quadrant;
                }
                debug!(quadrant = %quadrant, generated = pieces.len(), "quadrant generated");
                round.pieces[quadrant] = pieces;
            }
            Err(error) => {
                warn!(
                    quadrant = %quadrant,
                    error = %error,
                    "quadrant generation failed; continuing with an empty contribution"
                );
                round.failed.push(quadrant);
            }
        }
    }
    round
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assign::FragmentAssigner;
    use anyhow::anyhow;

    /// Echoes one piece per assigned fragment and fails for configured quadrants.
    struct EchoGenerator {
        failing: Vec<Quadrant>,
        tag_as: Option<Quadrant>,
    }

    #[async_trait]
    impl PieceGenerator for EchoGenerator {
        async fn generate(
            &self,
            quadrant: Quadrant,
            fragments: &[Fragment],
        ) -> anyhow::Result<Vec<Piece>> {
            if self.failing.contains(&quadrant) {
                return Err(anyhow!("upstream timed out"));
            }
            Ok(fragments
                .iter()
                .map(|fragment| {
                    Piece::new(
                        format!("{quadrant} note on {}", fragment.id),
                        self.tag_as.unwrap_or(quadrant),
                        2,
                    )
                    .grounded_in(fragment.id.clone(), "echo")
                })
                .collect())
        }
    }

    fn assignment() -> Assignment {
        let fragments = vec![
            Fragment::new("f1").with_tags(["shape", "layout"]),
            Fragment::new("f2").with_tags(["mood", "warmth"]),
            Fragment::new("f3").with_tags(["audience", "mobile"]),
        ];
        FragmentAssigner::default().assign(&fragments)
    }

    #[tokio::test]
    async fn failed_quadrant_contributes_empty_list() {
        let generator = EchoGenerator {
            failing: vec![Quadrant::Motion],
            tag_as: None,
        };

        let round = generate_round(&generator, &assignment()).await;

        assert_eq!(round.failed, vec![Quadrant::Motion]);
        assert!(round.is_partial());
        assert!(round.pieces[Quadrant::Motion].is_empty());
        assert_eq!(round.pieces[Quadrant::Form].len(), 2);
        assert_eq!(round.pieces[Quadrant::Expression].len(), 1);
        assert_eq!(round.pieces[Quadrant::Function].len(), 1);
    }

    #[tokio::test]
    async fn all_quadrants_failing_yields_empty_round() {
        let generator = EchoGenerator {
            failing: Quadrant::ALL.to_vec(),
            tag_as: None,
        };

        let round = generate_round(&generator, &assignment()).await;

        assert_eq!(round.total_pieces(), 0);
        assert_eq!(round.failed, Quadrant::ALL.to_vec());
    }

    #[tokio::test]
    async fn pieces_are_retagged_with_requested_quadrant() {
        let generator = EchoGenerator {
            failing: Vec::new(),
            tag_as: Some(Quadrant::Form),
        };

        let round = generate_round(&generator, &assignment()).await;

        for (quadrant, pieces) in round.pieces.iter() {
            assert!(pieces.iter().all(|piece| piece.quadrant == quadrant));
        }
        assert!(!round.is_partial());
    }
}
