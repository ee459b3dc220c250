use serde::Deserialize;
use std::net::IpAddr;
use thiserror::Error;

use crate::analysis::protocols::IPPROTO_TCP;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid packet record: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Port scan threshold must be a positive integer, got {0}")]
    InvalidThreshold(u64),
}

/// One decoded IP packet: addresses, transport protocol number, frame size and
/// the TCP destination port when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: u8,
    pub frame_size: u64,
    pub destination_port: Option<u16>,
}

impl PacketRecord {
    pub fn new(source: IpAddr, destination: IpAddr, protocol: u8, frame_size: u64) -> Self {
        Self {
            source,
            destination,
            protocol,
            frame_size,
            destination_port: None,
        }
    }

    /// Attaches a destination port. Port 0 means "no port" and is dropped.
    pub fn with_destination_port(mut self, port: u16) -> Self {
        self.destination_port = if port == 0 { None } else { Some(port) };
        self
    }

    /// Destination port that counts towards port-scan detection.
    pub fn tcp_destination_port(&self) -> Option<u16> {
        if self.protocol == IPPROTO_TCP {
            self.destination_port
        } else {
            None
        }
    }

    pub fn pair(&self) -> (IpAddr, IpAddr) {
        (self.source, self.destination)
    }
}

/// Untyped record as it arrives from a text source, before range checks.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPacketRecord {
    pub src: String,
    pub dst: String,
    pub protocol: i64,
    pub size: i64,
    #[serde(default)]
    pub dst_port: Option<i64>,
}

impl TryFrom<RawPacketRecord> for PacketRecord {
    type Error = AnalysisError;

    fn try_from(raw: RawPacketRecord) -> Result<Self, Self::Error> {
        let source = parse_address("src", &raw.src)?;
        let destination = parse_address("dst", &raw.dst)?;

        let protocol = u8::try_from(raw.protocol).map_err(|_| AnalysisError::InvalidInput {
            field: "protocol",
            reason: format!("{} is outside 0..=255", raw.protocol),
        })?;

        let frame_size = u64::try_from(raw.size).map_err(|_| AnalysisError::InvalidInput {
            field: "size",
            reason: format!("{} is negative", raw.size),
        })?;

        let mut record = PacketRecord::new(source, destination, protocol, frame_size);
        if let Some(port) = raw.dst_port {
            let port = u16::try_from(port).map_err(|_| AnalysisError::InvalidInput {
                field: "dst_port",
                reason: format!("{} is outside 0..=65535", port),
            })?;
            record = record.with_destination_port(port);
        }

        Ok(record)
    }
}

fn parse_address(field: &'static str, text: &str) -> Result<IpAddr, AnalysisError> {
    text.trim().parse().map_err(|_| AnalysisError::InvalidInput {
        field,
        reason: format!("'{}' is not an IP address", text),
    })
}
