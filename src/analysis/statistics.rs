use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;

use crate::analysis::packet::PacketRecord;
use crate::analysis::protocols::protocol_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDistributionEntry {
    pub protocol: u8,
    pub protocol_name: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpPairEntry {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpPairProtocolEntry {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: u8,
    pub protocol_name: String,
    pub count: u64,
    /// Share of this protocol within the (source, destination) pair.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub total_bandwidth_bytes: u64,
    pub total_packets: u64,
    pub protocol_distribution: Vec<ProtocolDistributionEntry>,
    pub ip_pairs: Vec<IpPairEntry>,
    pub ip_pair_protocols: Vec<IpPairProtocolEntry>,
}

impl TrafficSummary {
    pub fn is_empty(&self) -> bool {
        self.total_packets == 0
    }

    pub fn pair_protocols(&self, source: IpAddr, destination: IpAddr) -> Vec<&IpPairProtocolEntry> {
        self.ip_pair_protocols
            .iter()
            .filter(|entry| entry.source == source && entry.destination == destination)
            .collect()
    }

    pub fn protocol_count(&self, protocol: u8) -> u64 {
        self.protocol_distribution
            .iter()
            .find(|entry| entry.protocol == protocol)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

/// Counter that remembers the order in which keys were first seen.
#[derive(Debug, Clone)]
struct OrderedCounter<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K: Hash + Eq + Clone> OrderedCounter<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn increment(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Entries by count, highest first. Equal counts keep first-seen order.
    fn into_sorted(self) -> Vec<(K, u64)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    (count as f64 / total as f64) * 100.0
}

/// Single-pass accumulator for bandwidth, protocol mix and IP pair tables.
pub struct TrafficAggregator {
    total_bandwidth_bytes: u64,
    total_packets: u64,
    protocols: OrderedCounter<u8>,
    pairs: OrderedCounter<(IpAddr, IpAddr)>,
    pair_protocols: OrderedCounter<(IpAddr, IpAddr, u8)>,
}

impl TrafficAggregator {
    pub fn new() -> Self {
        Self {
            total_bandwidth_bytes: 0,
            total_packets: 0,
            protocols: OrderedCounter::new(),
            pairs: OrderedCounter::new(),
            pair_protocols: OrderedCounter::new(),
        }
    }

    pub fn aggregate<'a, I>(records: I) -> TrafficSummary
    where
        I: IntoIterator<Item = &'a PacketRecord>,
    {
        let mut aggregator = Self::new();
        for record in records {
            aggregator.observe(record);
        }
        aggregator.finish()
    }

    pub fn observe(&mut self, record: &PacketRecord) {
        self.total_bandwidth_bytes = self.total_bandwidth_bytes.saturating_add(record.frame_size);
        self.total_packets += 1;

        self.protocols.increment(record.protocol);
        self.pairs.increment(record.pair());
        self.pair_protocols
            .increment((record.source, record.destination, record.protocol));
    }

    pub fn packets_seen(&self) -> u64 {
        self.total_packets
    }

    pub fn finish(self) -> TrafficSummary {
        debug!(
            "Aggregated {} packets: {} protocols, {} IP pairs, {} pair/protocol combinations",
            self.total_packets,
            self.protocols.entries.len(),
            self.pairs.entries.len(),
            self.pair_protocols.entries.len()
        );

        let protocol_distribution = Self::build_protocol_distribution(self.protocols);
        let ip_pairs = Self::build_pair_table(self.pairs);
        let ip_pair_protocols = Self::build_pair_protocol_table(self.pair_protocols, &ip_pairs);

        TrafficSummary {
            total_bandwidth_bytes: self.total_bandwidth_bytes,
            total_packets: self.total_packets,
            protocol_distribution,
            ip_pairs,
            ip_pair_protocols,
        }
    }

    fn build_protocol_distribution(protocols: OrderedCounter<u8>) -> Vec<ProtocolDistributionEntry> {
        let total = protocols.total();
        if total == 0 {
            return Vec::new();
        }

        protocols
            .into_sorted()
            .into_iter()
            .map(|(protocol, count)| ProtocolDistributionEntry {
                protocol,
                protocol_name: protocol_name(protocol).into_owned(),
                count,
                percentage: percentage(count, total),
            })
            .collect()
    }

    fn build_pair_table(pairs: OrderedCounter<(IpAddr, IpAddr)>) -> Vec<IpPairEntry> {
        let total = pairs.total();
        if total == 0 {
            return Vec::new();
        }

        pairs
            .into_sorted()
            .into_iter()
            .map(|((source, destination), count)| IpPairEntry {
                source,
                destination,
                count,
                percentage: percentage(count, total),
            })
            .collect()
    }

    fn build_pair_protocol_table(
        triples: OrderedCounter<(IpAddr, IpAddr, u8)>,
        pair_order: &[IpPairEntry],
    ) -> Vec<IpPairProtocolEntry> {
        let mut groups: HashMap<(IpAddr, IpAddr), Vec<(u8, u64)>> = HashMap::new();
        for ((source, destination, protocol), count) in triples.entries {
            groups
                .entry((source, destination))
                .or_default()
                .push((protocol, count));
        }

        let mut table = Vec::with_capacity(groups.values().map(Vec::len).sum());
        for pair in pair_order {
            let Some(mut group) = groups.remove(&(pair.source, pair.destination)) else {
                continue;
            };

            let subtotal: u64 = group.iter().map(|(_, count)| count).sum();
            if subtotal == 0 {
                continue;
            }

            group.sort_by(|a, b| b.1.cmp(&a.1));
            table.extend(group.into_iter().map(|(protocol, count)| IpPairProtocolEntry {
                source: pair.source,
                destination: pair.destination,
                protocol,
                protocol_name: protocol_name(protocol).into_owned(),
                count,
                percentage: percentage(count, subtotal),
            }));
        }

        table
    }
}

impl Default for TrafficAggregator {
    fn default() -> Self {
        Self::new()
    }
}
