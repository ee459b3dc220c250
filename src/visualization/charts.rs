use ratatui::{
    prelude::*,
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    symbols,
    style::{Color, Style},
};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::analysis::statistics::TrafficSummary;
use crate::utils::formatting::truncate_string;

const PALETTE: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

const MAX_BARS: usize = 12;

fn empty_block(title: &str, area: Rect, frame: &mut Frame) {
    let paragraph = Paragraph::new("No IP packets in capture")
        .alignment(Alignment::Center)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Bar chart of packet counts per protocol.
pub struct ProtocolChart {
    bars: Vec<(String, u64)>,
}

impl ProtocolChart {
    pub fn from_summary(summary: &TrafficSummary) -> Self {
        Self {
            bars: summary
                .protocol_distribution
                .iter()
                .take(MAX_BARS)
                .map(|entry| (truncate_string(&entry.protocol_name, 12), entry.count))
                .collect(),
        }
    }

    pub fn bars(&self) -> &[(String, u64)] {
        &self.bars
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        if self.bars.is_empty() {
            empty_block("Protocol Distribution", area, frame);
            return;
        }

        let data: Vec<(&str, u64)> = self
            .bars
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();

        let chart = BarChart::default()
            .block(
                Block::default()
                    .title("Protocol Distribution (packets)")
                    .borders(Borders::ALL),
            )
            .data(data.as_slice())
            .bar_width(12)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::Yellow))
            .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));

        frame.render_widget(chart, area);
    }
}

/// Scatter of each protocol's share of traffic, one column per source IP.
pub struct ProtocolShareChart {
    sources: Vec<IpAddr>,
    series: Vec<(String, Vec<(f64, f64)>)>,
}

impl ProtocolShareChart {
    pub fn from_summary(summary: &TrafficSummary) -> Self {
        let mut sources: Vec<IpAddr> = Vec::new();
        let mut source_index: HashMap<IpAddr, usize> = HashMap::new();
        let mut series: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
        let mut series_index: HashMap<&str, usize> = HashMap::new();

        for entry in &summary.ip_pair_protocols {
            let x = *source_index.entry(entry.source).or_insert_with(|| {
                sources.push(entry.source);
                sources.len() - 1
            });
            let slot = *series_index
                .entry(entry.protocol_name.as_str())
                .or_insert_with(|| {
                    series.push((entry.protocol_name.clone(), Vec::new()));
                    series.len() - 1
                });
            series[slot].1.push((x as f64, entry.percentage));
        }

        Self { sources, series }
    }

    pub fn series(&self) -> &[(String, Vec<(f64, f64)>)] {
        &self.series
    }

    fn x_labels(&self) -> Vec<Span<'static>> {
        let label = |index: usize| -> Span<'static> {
            self.sources
                .get(index)
                .map(|addr| truncate_string(&addr.to_string(), 16))
                .unwrap_or_default()
                .into()
        };

        match self.sources.len() {
            0 => Vec::new(),
            1 => vec![label(0)],
            2 => vec![label(0), label(1)],
            n => vec![label(0), label(n / 2), label(n - 1)],
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        if self.series.is_empty() {
            empty_block("Share of Protocols Between IPs", area, frame);
            return;
        }

        let datasets: Vec<Dataset> = self
            .series
            .iter()
            .enumerate()
            .map(|(i, (name, points))| {
                Dataset::default()
                    .name(name.clone())
                    .marker(symbols::Marker::Dot)
                    .graph_type(GraphType::Scatter)
                    .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                    .data(points)
            })
            .collect();

        let max_x = (self.sources.len().saturating_sub(1) as f64).max(1.0);

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title("Share of Protocols Between IPs")
                    .borders(Borders::ALL),
            )
            .x_axis(
                Axis::default()
                    .title("Source IP")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, max_x])
                    .labels(self.x_labels()),
            )
            .y_axis(
                Axis::default()
                    .title("Percentage")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, 100.0])
                    .labels(vec!["0".into(), "50".into(), "100".into()]),
            );

        frame.render_widget(chart, area);
    }
}
