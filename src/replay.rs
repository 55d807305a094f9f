use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{Fragment, Piece, QuadrantMap};
use crate::observability::Telemetry;
use crate::pipeline::CurationPipeline;
use crate::pipeline::diversity::DiversityOutcome;
use crate::pipeline::grounding::GroundingReport;
use crate::pipeline::pool::{EnqueueOutcome, PoolStats};

/// Configuration required by the offline replay helper.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub dataset: PathBuf,
    /// Drain the filtered pieces through a fresh session pool.
    pub pool: bool,
    /// Include the Prometheus text rendering in the report.
    pub metrics: bool,
}

/// A recorded round: the fragments that were assigned and the raw pieces
/// the generator returned for them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplayDataset {
    pub fragments: Vec<Fragment>,
    pub pieces: Vec<Piece>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub assignment: QuadrantMap<Vec<String>>,
    pub greedy_placements: usize,
    pub top_up_placements: usize,
    pub grounding: GroundingReport,
    pub filter: DiversityOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolReplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReplay {
    pub enqueued: QuadrantMap<EnqueueOutcome>,
    /// Delivery order per quadrant.
    pub delivered: QuadrantMap<Vec<String>>,
    pub stats: PoolStats,
}

/// Load a dataset file.
///
/// # Errors
/// Returns an error when the file cannot be read or is not valid JSON.
pub fn load_dataset(config: &ReplayConfig) -> Result<ReplayDataset> {
    let raw = fs::read_to_string(&config.dataset)
        .with_context(|| format!("failed to open dataset at {}", config.dataset.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse dataset {}", config.dataset.display()))
}

/// Replay assignment and filtering over a recorded round, recording into
/// `telemetry`.
///
/// # Errors
/// Returns an error when the dataset or keyword override cannot be loaded.
pub fn replay_dataset(
    config: &ReplayConfig,
    engine: EngineConfig,
    telemetry: &Telemetry,
) -> Result<ReplayReport> {
    let dataset = load_dataset(config)?;

    let pipeline = CurationPipeline::new(engine)
        .context("failed to load keyword table")?
        .with_metrics(telemetry.metrics());

    let assignment = pipeline.assign(&dataset.fragments);

    let mut candidates: QuadrantMap<Vec<Piece>> = QuadrantMap::default();
    for piece in dataset.pieces {
        candidates[piece.quadrant].push(piece);
    }
    let grounding = GroundingReport::evaluate(&candidates, &assignment);
    let filter = pipeline.filter(candidates);

    let pool = config.pool.then(|| {
        let mut pool = pipeline.new_pool();
        let enqueued = pipeline.deliver(&mut pool, filter.pieces.clone());
        let delivered = QuadrantMap::from_fn(|quadrant| {
            std::iter::from_fn(|| pipeline.next_piece(&mut pool, quadrant))
                .map(|piece| piece.text)
                .collect()
        });
        PoolReplay {
            enqueued,
            delivered,
            stats: pool.stats(),
        }
    });

    let metrics = config.metrics.then(|| telemetry.render_prometheus());

    Ok(ReplayReport {
        assignment: assignment.fragment_ids(),
        greedy_placements: assignment.greedy_placements(),
        top_up_placements: assignment.top_up_placements(),
        grounding,
        filter,
        pool,
        metrics,
    })
}
