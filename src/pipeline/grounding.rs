//! Grounding accounting for a round of pieces.

use serde::Serialize;

use crate::model::{Piece, QuadrantMap};

use super::assign::Assignment;

/// How well a round's pieces cite the fragments assigned to their quadrant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroundingReport {
    pub total: usize,
    pub grounded: usize,
    pub ungrounded: usize,
    /// Grounded pieces citing a fragment not assigned to the piece's quadrant.
    pub unassigned_refs: usize,
}

impl GroundingReport {
    #[must_use]
    pub fn evaluate(pieces: &QuadrantMap<Vec<Piece>>, assignment: &Assignment) -> Self {
        let mut report = Self::default();
        for (quadrant, list) in pieces.iter() {
            for piece in list {
                report.total += 1;
                match piece.fragment_id() {
                    Some(fragment_id) => {
                        report.grounded += 1;
                        if !assignment.contains(quadrant, fragment_id) {
                            report.unassigned_refs += 1;
                        }
                    }
                    None => report.ungrounded += 1,
                }
            }
        }
        report
    }

    /// Ungrounded pieces are strictly fewer than half. Vacuously true when empty.
    #[must_use]
    pub fn ungrounded_is_minority(&self) -> bool {
        self.ungrounded * 2 < self.total || self.total == 0
    }
}
