use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use crate::analysis::packet::{AnalysisError, PacketRecord};

pub const DEFAULT_PORT_SCAN_THRESHOLD: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScanCandidate {
    pub source: IpAddr,
    pub unique_destination_ports: u64,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScanReport {
    pub threshold: u64,
    /// Every source that sent TCP with a destination port, first-seen order.
    pub candidates: Vec<PortScanCandidate>,
    /// Sources at or above the threshold, first-seen order.
    pub flagged: Vec<IpAddr>,
}

impl PortScanReport {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn is_flagged(&self, source: IpAddr) -> bool {
        self.flagged.contains(&source)
    }

    pub fn candidate(&self, source: IpAddr) -> Option<&PortScanCandidate> {
        self.candidates.iter().find(|c| c.source == source)
    }

    pub fn flagged_list(&self) -> String {
        self.flagged
            .iter()
            .map(|addr| addr.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Flags sources that reach many distinct TCP destination ports, counted
/// across all destination hosts.
pub struct PortScanDetector {
    threshold: u64,
    order: Vec<IpAddr>,
    ports_by_source: HashMap<IpAddr, HashSet<u16>>,
}

impl PortScanDetector {
    pub fn new(threshold: u64) -> Result<Self, AnalysisError> {
        if threshold == 0 {
            return Err(AnalysisError::InvalidThreshold(threshold));
        }

        Ok(Self {
            threshold,
            order: Vec::new(),
            ports_by_source: HashMap::new(),
        })
    }

    pub fn detect<'a, I>(records: I, threshold: u64) -> Result<PortScanReport, AnalysisError>
    where
        I: IntoIterator<Item = &'a PacketRecord>,
    {
        let mut detector = Self::new(threshold)?;
        for record in records {
            detector.observe(record);
        }
        Ok(detector.finish())
    }

    pub fn observe(&mut self, record: &PacketRecord) {
        let Some(port) = record.tcp_destination_port() else {
            return;
        };

        let ports = self.ports_by_source.entry(record.source).or_insert_with(|| {
            self.order.push(record.source);
            HashSet::new()
        });
        ports.insert(port);
    }

    /// Builds the report and logs a warning when any source is flagged.
    pub fn finish(self) -> PortScanReport {
        let mut candidates = Vec::with_capacity(self.order.len());
        let mut flagged = Vec::new();

        for source in self.order {
            let unique_destination_ports = self
                .ports_by_source
                .get(&source)
                .map(|ports| ports.len() as u64)
                .unwrap_or(0);
            let is_flagged = unique_destination_ports >= self.threshold;

            if is_flagged {
                flagged.push(source);
            }
            candidates.push(PortScanCandidate {
                source,
                unique_destination_ports,
                flagged: is_flagged,
            });
        }

        let report = PortScanReport {
            threshold: self.threshold,
            candidates,
            flagged,
        };

        debug!(
            "Port scan check: {} TCP sources, threshold {}",
            report.candidates.len(),
            report.threshold
        );
        if !report.is_clean() {
            warn!(
                "Potential port scanning detected from IP addresses: {}",
                report.flagged_list()
            );
        }

        report
    }
}
