use std::collections::HashSet;
use std::fmt::Write;
use std::net::IpAddr;

use crate::analysis::statistics::TrafficSummary;
use crate::pipeline::AnalysisReport;
use crate::traffic::analyzer::PortScanReport;
use crate::utils::formatting::{format_bytes, format_percentage, format_total_bandwidth};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Right,
}

/// Plain-text table with `+---+` borders and a `+===+` rule under the header.
pub struct GridTable {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl GridTable {
    pub fn new(columns: &[(&str, Align)]) -> Self {
        Self {
            headers: columns.iter().map(|(name, _)| name.to_string()).collect(),
            align: columns.iter().map(|(_, align)| *align).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn rule(widths: &[usize], fill: char) -> String {
        let mut line = String::from("+");
        for width in widths {
            line.extend(std::iter::repeat(fill).take(width + 2));
            line.push('+');
        }
        line
    }

    fn line(&self, widths: &[usize], cells: &[String], header: bool) -> String {
        let mut line = String::from("|");
        for ((cell, width), align) in cells.iter().zip(widths).zip(&self.align) {
            let padded = match (header, align) {
                (true, _) | (false, Align::Left) => format!(" {:<width$} ", cell, width = width),
                (false, Align::Right) => format!(" {:>width$} ", cell, width = width),
            };
            line.push_str(&padded);
            line.push('|');
        }
        line
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = Vec::with_capacity(self.rows.len() * 2 + 3);

        out.push(Self::rule(&widths, '-'));
        out.push(self.line(&widths, &self.headers, true));
        out.push(Self::rule(&widths, '='));
        for row in &self.rows {
            out.push(self.line(&widths, row, false));
            out.push(Self::rule(&widths, '-'));
        }
        if self.rows.is_empty() {
            // header-only table still needs a closing border
            out.pop();
            out.push(Self::rule(&widths, '-'));
        }

        out.join("\n")
    }
}

pub fn protocol_table(summary: &TrafficSummary) -> GridTable {
    let mut table = GridTable::new(&[
        ("Protocol", Align::Left),
        ("Count", Align::Right),
        ("Percentage", Align::Right),
    ]);
    for entry in &summary.protocol_distribution {
        table.add_row(vec![
            entry.protocol_name.clone(),
            entry.count.to_string(),
            format_percentage(entry.percentage),
        ]);
    }
    table
}

/// IP pair table, limited to the first `top` pairs when `top > 0`.
pub fn ip_pair_table(summary: &TrafficSummary, top: usize) -> GridTable {
    let mut table = GridTable::new(&[
        ("Source IP", Align::Left),
        ("Destination IP", Align::Left),
        ("Count", Align::Right),
        ("Percentage", Align::Right),
    ]);
    for entry in limit(&summary.ip_pairs, top) {
        table.add_row(vec![
            entry.source.to_string(),
            entry.destination.to_string(),
            entry.count.to_string(),
            format_percentage(entry.percentage),
        ]);
    }
    table
}

pub fn ip_pair_protocol_table(summary: &TrafficSummary, top: usize) -> GridTable {
    let shown: HashSet<(IpAddr, IpAddr)> = limit(&summary.ip_pairs, top)
        .iter()
        .map(|entry| (entry.source, entry.destination))
        .collect();

    let mut table = GridTable::new(&[
        ("Source IP", Align::Left),
        ("Destination IP", Align::Left),
        ("Protocol", Align::Left),
        ("Count", Align::Right),
        ("Percentage", Align::Right),
    ]);
    for entry in &summary.ip_pair_protocols {
        if !shown.contains(&(entry.source, entry.destination)) {
            continue;
        }
        table.add_row(vec![
            entry.source.to_string(),
            entry.destination.to_string(),
            entry.protocol_name.clone(),
            entry.count.to_string(),
            format_percentage(entry.percentage),
        ]);
    }
    table
}

pub fn port_scan_table(report: &PortScanReport) -> GridTable {
    let mut table = GridTable::new(&[
        ("Source IP", Align::Left),
        ("Unique Destination Ports", Align::Right),
    ]);
    for candidate in report.candidates.iter().filter(|c| c.flagged) {
        table.add_row(vec![
            candidate.source.to_string(),
            candidate.unique_destination_ports.to_string(),
        ]);
    }
    table
}

fn limit<T>(entries: &[T], top: usize) -> &[T] {
    if top == 0 || top >= entries.len() {
        entries
    } else {
        &entries[..top]
    }
}

/// Full text report: bandwidth, the three traffic tables and the port-scan result.
pub fn render_report(report: &AnalysisReport, top: usize) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(
        out,
        "Total bandwidth used: {} ({} in {} packets)",
        format_total_bandwidth(summary.total_bandwidth_bytes),
        format_bytes(summary.total_bandwidth_bytes),
        summary.total_packets
    );

    let _ = writeln!(out, "\nProtocol Distribution:\n");
    let _ = writeln!(out, "{}", protocol_table(summary).render());

    let _ = writeln!(out, "\nTop IP Address Communications:\n");
    let _ = writeln!(out, "{}", ip_pair_table(summary, top).render());
    if top > 0 && summary.ip_pairs.len() > top {
        let _ = writeln!(out, "({} of {} pairs shown)", top, summary.ip_pairs.len());
    }

    let _ = writeln!(out, "\nShare of each protocol between IPs:\n");
    let _ = writeln!(out, "{}", ip_pair_protocol_table(summary, top).render());

    let scan = &report.port_scan;
    let _ = writeln!(out, "\nPort Scan Check (threshold: {} unique ports):\n", scan.threshold);
    if scan.is_clean() {
        let _ = writeln!(out, "No port scanning activity detected.");
    } else {
        let _ = writeln!(
            out,
            "Potential port scanning detected from IP addresses: {}\n",
            scan.flagged_list()
        );
        let _ = writeln!(out, "{}", port_scan_table(scan).render());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::packet::PacketRecord;
    use crate::config::AnalysisConfig;
    use crate::pipeline::analyze;

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    fn sample_report(threshold: u64) -> AnalysisReport {
        let records = vec![
            PacketRecord::new(ip("10.0.0.1"), ip("10.0.0.2"), 6, 100).with_destination_port(80),
            PacketRecord::new(ip("10.0.0.1"), ip("10.0.0.2"), 6, 200).with_destination_port(81),
            PacketRecord::new(ip("10.0.0.1"), ip("10.0.0.3"), 17, 50),
        ];
        let config = AnalysisConfig {
            port_scan_threshold: threshold,
            ..AnalysisConfig::default()
        };
        analyze(records, &config).unwrap()
    }

    #[test]
    fn test_grid_layout() {
        let mut table = GridTable::new(&[("Name", Align::Left), ("N", Align::Right)]);
        table.add_row(vec!["TCP".to_string(), "12".to_string()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "+------+----+");
        assert_eq!(lines[1], "| Name | N  |");
        assert_eq!(lines[2], "+======+====+");
        assert_eq!(lines[3], "| TCP  | 12 |");
        assert_eq!(lines[4], "+------+----+");
    }

    #[test]
    fn test_empty_table_is_closed() {
        let table = GridTable::new(&[("Protocol", Align::Left)]);
        let rendered = table.render();
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.ends_with("+----------+"));
    }

    #[test]
    fn test_report_contains_sections() {
        let text = render_report(&sample_report(100), 0);
        assert!(text.starts_with("Total bandwidth used: 0.00 Mbps (350 B in 3 packets)"));
        assert!(text.contains("Protocol Distribution:"));
        assert!(text.contains("| TCP      |     2 |      66.67 |"));
        assert!(text.contains("Top IP Address Communications:"));
        assert!(text.contains("Share of each protocol between IPs:"));
        assert!(text.contains("No port scanning activity detected."));
    }

    #[test]
    fn test_report_lists_flagged_sources() {
        let text = render_report(&sample_report(2), 0);
        assert!(text.contains("Potential port scanning detected from IP addresses: 10.0.0.1"));
    }

    #[test]
    fn test_top_limits_pair_tables() {
        let report = sample_report(100);
        assert_eq!(ip_pair_table(&report.summary, 1).len(), 1);
        assert_eq!(ip_pair_protocol_table(&report.summary, 1).len(), 1);
        assert_eq!(ip_pair_table(&report.summary, 0).len(), 2);
        assert!(render_report(&report, 1).contains("(1 of 2 pairs shown)"));
    }
}
