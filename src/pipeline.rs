//! Curation pipeline: fragments in, diverse per-quadrant pieces out.
//!
//! Stages:
//!
//! 1. [`assign`] distributes fragments over the four quadrants.
//! 2. [`generate`] asks an external generator for every quadrant concurrently.
//! 3. [`diversity`] removes exact and near duplicates across quadrants.
//! 4. [`pool`] queues survivors for at-most-once delivery within a session.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::model::{Fragment, Piece, Quadrant, QuadrantMap};
use crate::observability::metrics::Metrics;

pub mod assign;
pub mod diversity;
pub mod generate;
pub mod grounding;
pub mod keywords;
pub mod pool;
pub mod relevance;
pub mod similarity;

use assign::{Assignment, FragmentAssigner};
use diversity::{DiversityFilter, DiversityOutcome};
use generate::{PieceGenerator, generate_round};
use grounding::GroundingReport;
use keywords::{KeywordTable, KeywordTableError};
use pool::{EnqueueOutcome, PiecePool};
use relevance::RelevanceScorer;

/// Everything one generation round produced.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub assignment: QuadrantMap<Vec<String>>,
    pub failed: Vec<Quadrant>,
    pub outcome: DiversityOutcome,
    pub grounding: GroundingReport,
}

#[derive(Debug, Clone)]
pub struct CurationPipeline {
    config: EngineConfig,
    assigner: FragmentAssigner,
    filter: DiversityFilter,
    metrics: Option<Arc<Metrics>>,
}

impl CurationPipeline {
    /// Build the pipeline, loading the keyword table from the configured
    /// path or falling back to the built-in table.
    ///
    /// # Errors
    /// Returns [`KeywordTableError`] when the override file cannot be read,
    /// parsed, or compiled.
    pub fn new(config: EngineConfig) -> Result<Self, KeywordTableError> {
        let table = match config.keywords_path() {
            Some(path) => KeywordTable::load_from_path(path)?,
            None => KeywordTable::builtin(),
        };
        Ok(Self::with_table(config, table))
    }

    #[must_use]
    pub fn with_table(config: EngineConfig, table: KeywordTable) -> Self {
        let scorer = RelevanceScorer::new(table, config.scoring());
        Self {
            assigner: FragmentAssigner::new(scorer, config.assignment()),
            filter: DiversityFilter::new(config.diversity()),
            config,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn assign(&self, fragments: &[Fragment]) -> Assignment {
        let started = Instant::now();
        let assignment = self.assigner.assign(fragments);

        tracing::info!(
            fragments = fragments.len(),
            greedy = assignment.greedy_placements(),
            top_up = assignment.top_up_placements(),
            "fragments assigned"
        );
        if let Some(metrics) = &self.metrics {
            metrics
                .fragments_assigned
                .inc_by(count_as_f64(assignment.total_placements()));
            metrics
                .top_up_assignments
                .inc_by(count_as_f64(assignment.top_up_placements()));
            metrics
                .assignment_duration
                .observe(started.elapsed().as_secs_f64());
        }
        assignment
    }

    /// Filter one round's complete candidate set.
    #[must_use]
    pub fn filter(&self, pieces: QuadrantMap<Vec<Piece>>) -> DiversityOutcome {
        let started = Instant::now();
        let candidates = pieces.total_len();
        let outcome = self.filter.filter(pieces);

        tracing::info!(
            candidates,
            kept = outcome.pieces.total_len(),
            exact_removed = outcome.exact_removed,
            near_removed = outcome.near_removed,
            quota_removed = outcome.quota_removed,
            "pieces filtered"
        );
        if let Some(metrics) = &self.metrics {
            metrics
                .exact_duplicates_removed
                .inc_by(count_as_f64(outcome.exact_removed));
            metrics
                .near_duplicates_removed
                .inc_by(count_as_f64(outcome.near_removed));
            metrics
                .quota_removed
                .inc_by(count_as_f64(outcome.quota_removed));
            metrics
                .filter_duration
                .observe(started.elapsed().as_secs_f64());
        }
        outcome
    }

    /// Assign, generate every quadrant concurrently, then filter.
    pub async fn run_round(
        &self,
        generator: &dyn PieceGenerator,
        fragments: &[Fragment],
    ) -> RoundReport {
        let assignment = self.assign(fragments);

        let started = Instant::now();
        let round = generate_round(generator, &assignment).await;
        if let Some(metrics) = &self.metrics {
            metrics
                .generation_duration
                .observe(started.elapsed().as_secs_f64());
            metrics
                .generator_failures
                .inc_by(count_as_f64(round.failed.len()));
        }

        let grounding = GroundingReport::evaluate(&round.pieces, &assignment);
        if !grounding.ungrounded_is_minority() {
            tracing::warn!(
                total = grounding.total,
                ungrounded = grounding.ungrounded,
                "most generated pieces cite no fragment"
            );
        }

        let outcome = self.filter(round.pieces);
        RoundReport {
            assignment: assignment.fragment_ids(),
            failed: round.failed,
            outcome,
            grounding,
        }
    }

    /// Queue a filtered round into a session pool.
    pub fn deliver(
        &self,
        pool: &mut PiecePool,
        pieces: QuadrantMap<Vec<Piece>>,
    ) -> QuadrantMap<EnqueueOutcome> {
        let outcomes = pieces.map(|quadrant, list| pool.enqueue(quadrant, list));
        if let Some(metrics) = &self.metrics {
            let (accepted, skipped) = outcomes
                .iter()
                .fold((0, 0), |(a, s), (_, o)| (a + o.accepted, s + o.skipped));
            metrics.pool_accepted.inc_by(count_as_f64(accepted));
            metrics.pool_skipped.inc_by(count_as_f64(skipped));
            metrics.pool_queued.set(count_as_f64(pool.stats().total_queued()));
        }
        outcomes
    }

    /// Take the next piece for `quadrant` from a session pool.
    pub fn next_piece(&self, pool: &mut PiecePool, quadrant: Quadrant) -> Option<Piece> {
        let piece = pool.next(quadrant);
        if let (Some(metrics), Some(_)) = (&self.metrics, &piece) {
            metrics.pool_delivered.inc();
            metrics.pool_queued.set(count_as_f64(pool.stats().total_queued()));
        }
        piece
    }

    /// A fresh session pool using this pipeline's pool settings.
    #[must_use]
    pub fn new_pool(&self) -> PiecePool {
        PiecePool::new(self.config.pool())
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Telemetry;
    use async_trait::async_trait;

    struct FixedGenerator;

    #[async_trait]
    impl PieceGenerator for FixedGenerator {
        async fn generate(
            &self,
            quadrant: Quadrant,
            fragments: &[Fragment],
        ) -> anyhow::Result<Vec<Piece>> {
            let first = fragments.first().map(|f| f.id.clone()).unwrap_or_default();
            let piece = match quadrant {
                Quadrant::Form => Piece::new("Warm ceremonial calm", quadrant, 1),
                Quadrant::Expression => Piece::new("Warm ceremonial calm tone", quadrant, 3),
                Quadrant::Motion => Piece::new("Slow drift between panels", quadrant, 2),
                Quadrant::Function => anyhow::bail!("generator unavailable"),
            };
            Ok(vec![piece.grounded_in(first, "first fragment")])
        }
    }

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new("f1").with_tags(["shape", "layout"]),
            Fragment::new("f2").with_tags(["mood", "warmth"]),
            Fragment::new("f3").with_tags(["audience", "mobile"]),
        ]
    }

    #[tokio::test]
    async fn run_round_filters_and_tolerates_failures() {
        let telemetry = Telemetry::without_tracing().expect("telemetry");
        let pipeline = CurationPipeline::new(EngineConfig::default())
            .expect("builtin table")
            .with_metrics(telemetry.metrics());

        let report = pipeline.run_round(&FixedGenerator, &fragments()).await;

        assert_eq!(report.failed, vec![Quadrant::Function]);
        assert_eq!(report.outcome.near_removed, 1);
        assert!(report.outcome.pieces[Quadrant::Expression].is_empty());
        assert_eq!(report.outcome.pieces[Quadrant::Form].len(), 1);
        assert_eq!(report.assignment[Quadrant::Motion], vec!["f1", "f3"]);
        assert_eq!(report.grounding.total, 3);

        let rendered = telemetry.render_prometheus();
        assert!(rendered.contains("quadrant_generator_failures_total 1"));
        assert!(rendered.contains("quadrant_near_duplicates_removed_total 1"));
    }

    #[test]
    fn deliver_and_next_piece_track_pool_metrics() {
        let telemetry = Telemetry::without_tracing().expect("telemetry");
        let pipeline = CurationPipeline::new(EngineConfig::default())
            .expect("builtin table")
            .with_metrics(telemetry.metrics());
        let mut pool = pipeline.new_pool();
        let mut pieces: QuadrantMap<Vec<Piece>> = QuadrantMap::default();
        pieces[Quadrant::Form] = vec![
            Piece::new("one two", Quadrant::Form, 1).grounded_in("f1", ""),
            Piece::new("three four", Quadrant::Form, 1).grounded_in("f1", ""),
            Piece::new("five six", Quadrant::Form, 1).grounded_in("f1", ""),
        ];

        let outcomes = pipeline.deliver(&mut pool, pieces);
        let delivered = pipeline.next_piece(&mut pool, Quadrant::Form);

        assert_eq!(outcomes[Quadrant::Form].accepted, 2);
        assert_eq!(outcomes[Quadrant::Form].skipped, 1);
        assert!(delivered.is_some());
        let rendered = telemetry.render_prometheus();
        assert!(rendered.contains("quadrant_pool_delivered_total 1"));
        assert!(rendered.contains("quadrant_pool_queued 1"));
    }

    #[test]
    fn missing_keyword_file_is_reported() {
        let config = EngineConfig::default().with_keywords_path("/nonexistent/keywords.yaml");
        let error = CurationPipeline::new(config).expect_err("missing file");
        assert!(matches!(error, KeywordTableError::Io { .. }));
    }
}
