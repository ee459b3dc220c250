use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analysis::packet::{AnalysisError, PacketRecord};
use crate::analysis::statistics::{TrafficAggregator, TrafficSummary};
use crate::config::AnalysisConfig;
use crate::traffic::analyzer::{PortScanDetector, PortScanReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: TrafficSummary,
    pub port_scan: PortScanReport,
}

/// Runs the aggregator and the port-scan detector side by side in one pass.
pub fn analyze<I>(records: I, config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError>
where
    I: IntoIterator<Item = PacketRecord>,
{
    analyze_fallible(records.into_iter().map(Ok::<_, AnalysisError>), config)
}

/// Like [`analyze`] but stops at the first error coming out of the source.
pub fn analyze_fallible<I, E>(records: I, config: &AnalysisConfig) -> Result<AnalysisReport, E>
where
    I: IntoIterator<Item = Result<PacketRecord, E>>,
    E: From<AnalysisError>,
{
    let mut aggregator = TrafficAggregator::new();
    let mut detector = PortScanDetector::new(config.port_scan_threshold)?;

    for record in records {
        let record = record?;
        aggregator.observe(&record);
        detector.observe(&record);
    }

    info!("Analyzed {} packets", aggregator.packets_seen());

    Ok(AnalysisReport {
        summary: aggregator.finish(),
        port_scan: detector.finish(),
    })
}

/// Runs both analyses on the blocking pool over a shared read-only buffer.
pub async fn analyze_concurrently(
    records: Arc<[PacketRecord]>,
    config: &AnalysisConfig,
) -> anyhow::Result<AnalysisReport> {
    let threshold = config.port_scan_threshold;
    // validate before spawning so a bad threshold never reaches a worker
    PortScanDetector::new(threshold)?;

    let aggregate_input = Arc::clone(&records);
    let aggregate = tokio::task::spawn_blocking(move || {
        TrafficAggregator::aggregate(aggregate_input.iter())
    });

    let detect_input = Arc::clone(&records);
    let detect = tokio::task::spawn_blocking(move || {
        PortScanDetector::detect(detect_input.iter(), threshold)
    });

    let (summary, port_scan) = tokio::join!(aggregate, detect);
    let summary = summary.context("traffic aggregation task failed")?;
    let port_scan = port_scan.context("port scan task failed")??;

    info!("Analyzed {} packets", summary.total_packets);

    Ok(AnalysisReport { summary, port_scan })
}
