//! Fragment distribution across quadrants.
//!
//! Two phases:
//!
//! 1. **Greedy**: every positive `(fragment, quadrant)` pair is sorted by score
//!    (stable, descending) and accepted while the fragment is under its
//!    quadrant cap and the quadrant is under its fragment cap.
//! 2. **Top-up**: quadrants still below the minimum are filled from
//!    fragments in input order, ignoring score.
//!
//! The result is deliberately not an optimal matching. Prompt grounding
//! downstream is tuned against this greedy-then-repair behavior.

use smallvec::SmallVec;

use crate::config::AssignmentLimits;
use crate::model::{Fragment, Quadrant, QuadrantMap};

use super::relevance::RelevanceScorer;

/// Quadrants a single fragment was placed in.
pub type QuadrantSet = SmallVec<[Quadrant; 2]>;

/// Per-quadrant fragment lists produced by [`FragmentAssigner::assign`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    members: QuadrantMap<Vec<Fragment>>,
    greedy_placements: usize,
    top_up_placements: usize,
}

impl Assignment {
    /// Fragments assigned to `quadrant`, in placement order.
    #[must_use]
    pub fn fragments(&self, quadrant: Quadrant) -> &[Fragment] {
        &self.members[quadrant]
    }

    /// Identifiers per quadrant, for logs and reports.
    #[must_use]
    pub fn fragment_ids(&self) -> QuadrantMap<Vec<String>> {
        self.members
            .map_ref(|_, fragments| fragments.iter().map(|f| f.id.clone()).collect())
    }

    /// Quadrants that contain the fragment with this identifier, canonical order.
    #[must_use]
    pub fn quadrants_for(&self, fragment_id: &str) -> QuadrantSet {
        self.members
            .iter()
            .filter(|(_, fragments)| fragments.iter().any(|f| f.id == fragment_id))
            .map(|(quadrant, _)| quadrant)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, quadrant: Quadrant, fragment_id: &str) -> bool {
        self.members[quadrant].iter().any(|f| f.id == fragment_id)
    }

    /// Placements made by the score-ordered pass.
    #[must_use]
    pub fn greedy_placements(&self) -> usize {
        self.greedy_placements
    }

    /// Placements made by the coverage pass.
    #[must_use]
    pub fn top_up_placements(&self) -> usize {
        self.top_up_placements
    }

    #[must_use]
    pub fn total_placements(&self) -> usize {
        self.greedy_placements + self.top_up_placements
    }
}

/// Running counters shared by both phases.
struct Ledger {
    per_fragment: Vec<QuadrantSet>,
    per_quadrant: QuadrantMap<Vec<usize>>,
    limits: AssignmentLimits,
}

impl Ledger {
    fn new(fragment_count: usize, limits: AssignmentLimits) -> Self {
        Self {
            per_fragment: vec![QuadrantSet::new(); fragment_count],
            per_quadrant: QuadrantMap::default(),
            limits,
        }
    }

    fn fragment_has_room(&self, index: usize) -> bool {
        self.per_fragment[index].len() < self.limits.max_quadrants_per_fragment
    }

    fn quadrant_has_room(&self, quadrant: Quadrant) -> bool {
        self.per_quadrant[quadrant].len() < self.limits.max_fragments_per_quadrant
    }

    fn is_member(&self, index: usize, quadrant: Quadrant) -> bool {
        self.per_fragment[index].contains(&quadrant)
    }

    fn place(&mut self, index: usize, quadrant: Quadrant) {
        self.per_fragment[index].push(quadrant);
        self.per_quadrant[quadrant].push(index);
    }
}

/// Distributes fragments over the four quadrants.
#[derive(Debug, Clone, Default)]
pub struct FragmentAssigner {
    scorer: RelevanceScorer,
    limits: AssignmentLimits,
}

impl FragmentAssigner {
    #[must_use]
    pub fn new(scorer: RelevanceScorer, limits: AssignmentLimits) -> Self {
        Self { scorer, limits }
    }

    /// Assign fragments to quadrants. Total over every input, including an
    /// empty slice (four empty lists).
    #[must_use]
    pub fn assign(&self, fragments: &[Fragment]) -> Assignment {
        let mut ledger = Ledger::new(fragments.len(), self.limits);

        let mut pairs = self.scorer.score_pairs(fragments);
        // `sort_by` is stable: equal scores keep fragment-major enumeration order.
        pairs.sort_by(|a, b| b.score.cmp(&a.score));

        let mut greedy_placements = 0;
        for pair in &pairs {
            let index = pair.fragment_index;
            if ledger.fragment_has_room(index)
                && ledger.quadrant_has_room(pair.quadrant)
                && !ledger.is_member(index, pair.quadrant)
            {
                ledger.place(index, pair.quadrant);
                greedy_placements += 1;
            }
        }

        let mut top_up_placements = 0;
        let minimum = self.limits.min_fragments_per_quadrant;
        for quadrant in Quadrant::ALL {
            for index in 0..fragments.len() {
                if ledger.per_quadrant[quadrant].len() >= minimum {
                    break;
                }
                if ledger.fragment_has_room(index)
                    && ledger.quadrant_has_room(quadrant)
                    && !ledger.is_member(index, quadrant)
                {
                    ledger.place(index, quadrant);
                    top_up_placements += 1;
                }
            }
        }

        let members = ledger.per_quadrant.map(|_, indices| {
            indices
                .into_iter()
                .map(|index| fragments[index].clone())
                .collect()
        });

        Assignment {
            members,
            greedy_placements,
            top_up_placements,
        }
    }
}
