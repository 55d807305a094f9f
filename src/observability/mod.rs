pub mod metrics;
pub mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// 新しいTelemetryインスタンスを作成し、トレーシングとメトリクスを初期化する。
    ///
    /// # Errors
    /// サブスクライバの初期化またはメトリクス登録に失敗した場合はエラーを返す。
    pub fn new() -> Result<Self> {
        tracing::init()?;
        Self::without_tracing()
    }

    /// トレーシングを初期化せずにメトリクスだけを用意する。テストやベンチ向け。
    ///
    /// # Errors
    /// メトリクス登録に失敗した場合はエラーを返す。
    pub fn without_tracing() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    /// メトリクスへのアクセスを提供する。
    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Prometheusメトリクスをテキスト形式でレンダリングする。
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_recorded_counters() {
        let telemetry = Telemetry::without_tracing().expect("telemetry");
        telemetry.metrics().near_duplicates_removed.inc_by(3.0);

        let rendered = telemetry.render_prometheus();

        assert!(rendered.contains("quadrant_near_duplicates_removed_total 3"));
    }

    #[test]
    fn new_initializes_tracing_once_per_process() {
        let first = Telemetry::new().expect("first init");
        let second = Telemetry::new().expect("repeat init is a no-op");
        first.metrics().fragments_assigned.inc();

        assert!(first
            .render_prometheus()
            .contains("quadrant_fragments_assigned_total 1"));
        assert!(second
            .render_prometheus()
            .contains("quadrant_fragments_assigned_total 0"));
    }

    #[test]
    fn instances_do_not_share_registries() {
        let first = Telemetry::without_tracing().expect("first");
        let second = Telemetry::without_tracing().expect("second");
        first.metrics().pool_delivered.inc();

        assert!(second
            .render_prometheus()
            .contains("quadrant_pool_delivered_total 0"));
    }
}
