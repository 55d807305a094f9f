/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub fragments_assigned: Counter,
    pub top_up_assignments: Counter,
    pub exact_duplicates_removed: Counter,
    pub near_duplicates_removed: Counter,
    pub quota_removed: Counter,
    pub generator_failures: Counter,
    pub pool_accepted: Counter,
    pub pool_skipped: Counter,
    pub pool_delivered: Counter,

    // ヒストグラム
    pub assignment_duration: Histogram,
    pub filter_duration: Histogram,
    pub generation_duration: Histogram,

    // ゲージ
    pub pool_queued: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            fragments_assigned: register_counter_with_registry!(
                "quadrant_fragments_assigned_total",
                "Total number of fragment placements across quadrants",
                registry
            )?,
            top_up_assignments: register_counter_with_registry!(
                "quadrant_top_up_assignments_total",
                "Placements made by the coverage pass to reach the per-quadrant minimum",
                registry
            )?,
            exact_duplicates_removed: register_counter_with_registry!(
                "quadrant_exact_duplicates_removed_total",
                "Pieces removed because their normalized text was already seen",
                registry
            )?,
            near_duplicates_removed: register_counter_with_registry!(
                "quadrant_near_duplicates_removed_total",
                "Pieces removed as cross-quadrant near duplicates",
                registry
            )?,
            quota_removed: register_counter_with_registry!(
                "quadrant_fragment_quota_removed_total",
                "Pieces removed because their fragment exceeded the filter quota",
                registry
            )?,
            generator_failures: register_counter_with_registry!(
                "quadrant_generator_failures_total",
                "Quadrant generation calls that failed and contributed nothing",
                registry
            )?,
            pool_accepted: register_counter_with_registry!(
                "quadrant_pool_accepted_total",
                "Pieces accepted into a session pool",
                registry
            )?,
            pool_skipped: register_counter_with_registry!(
                "quadrant_pool_skipped_total",
                "Pieces rejected by a session pool",
                registry
            )?,
            pool_delivered: register_counter_with_registry!(
                "quadrant_pool_delivered_total",
                "Pieces delivered out of a session pool",
                registry
            )?,
            assignment_duration: register_histogram_with_registry!(
                "quadrant_assignment_duration_seconds",
                "Duration of fragment assignment",
                registry
            )?,
            filter_duration: register_histogram_with_registry!(
                "quadrant_filter_duration_seconds",
                "Duration of diversity filtering",
                registry
            )?,
            generation_duration: register_histogram_with_registry!(
                "quadrant_generation_duration_seconds",
                "Duration of one concurrent generation round",
                registry
            )?,
            pool_queued: register_gauge_with_registry!(
                "quadrant_pool_queued",
                "Pieces waiting in the most recently updated pool",
                registry
            )?,
        })
    }
}
