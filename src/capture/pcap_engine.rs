use log::{debug, info, warn};
use pcap::{Capture, Offline};
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::vlan::VlanPacket;
use pnet::packet::Packet;
use std::net::IpAddr;
use std::path::Path;

use thiserror::Error;

use crate::analysis::packet::PacketRecord;

const LINUX_SLL_HEADER_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("PCAP file not found: {0}")]
    FileNotFound(String),

    #[error("Error reading PCAP file '{path}': {message}")]
    Open { path: String, message: String },

    #[error("Unsupported link type {0} (supported: Ethernet, raw IP, Linux cooked)")]
    UnsupportedLinkType(i32),

    #[error("Error reading packet {index}: {message}")]
    Read { index: u64, message: String },
}

/// Framing of the captured frames, from the pcap DLT value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    RawIp,
    LinuxSll,
}

impl LinkType {
    pub fn from_dlt(dlt: i32) -> Result<Self, CaptureError> {
        match dlt {
            1 => Ok(LinkType::Ethernet),
            12 | 14 | 101 | 228 | 229 => Ok(LinkType::RawIp),
            113 => Ok(LinkType::LinuxSll),
            other => Err(CaptureError::UnsupportedLinkType(other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_read: u64,
    pub packets_emitted: u64,
    pub frames_skipped: u64,
}

/// Reads a pcap/pcapng file and yields one [`PacketRecord`] per IP frame.
pub struct PcapEngine {
    capture: Capture<Offline>,
    link_type: LinkType,
    path: String,
    progress_interval: u64,
    stats: CaptureStats,
    finished: bool,
}

impl PcapEngine {
    pub fn open<P: AsRef<Path>>(path: P, progress_interval: u64) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Err(CaptureError::FileNotFound(display));
        }

        let capture = Capture::from_file(path).map_err(|e| CaptureError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let link_type = LinkType::from_dlt(capture.get_datalink().0)?;

        info!("Reading capture file {} ({:?} frames)", display, link_type);

        Ok(PcapEngine {
            capture,
            link_type,
            path: display,
            progress_interval: progress_interval.max(1),
            stats: CaptureStats::default(),
            finished: false,
        })
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    fn log_progress(&self) {
        if self.stats.frames_read % self.progress_interval == 0 {
            info!("Processing packets: {}", self.stats.frames_read);
        }
    }
}

impl Iterator for PcapEngine {
    type Item = Result<PacketRecord, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let packet = match self.capture.next_packet() {
                Ok(packet) => packet,
                Err(pcap::Error::NoMorePackets) => {
                    self.finished = true;
                    info!(
                        "Finished {}: {} frames, {} IP packets, {} skipped",
                        self.path,
                        self.stats.frames_read,
                        self.stats.packets_emitted,
                        self.stats.frames_skipped
                    );
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(CaptureError::Read {
                        index: self.stats.frames_read + 1,
                        message: e.to_string(),
                    }));
                }
            };

            let frame_size = u64::from(packet.header.len);
            let record = decode_frame(self.link_type, packet.data, frame_size);

            self.stats.frames_read += 1;
            self.log_progress();

            match record {
                Some(record) => {
                    self.stats.packets_emitted += 1;
                    return Some(Ok(record));
                }
                None => {
                    self.stats.frames_skipped += 1;
                    debug!("Skipping non-IP frame {}", self.stats.frames_read);
                }
            }
        }
    }
}

/// Decodes one captured frame. Returns `None` for frames without an IP layer.
pub fn decode_frame(link_type: LinkType, data: &[u8], frame_size: u64) -> Option<PacketRecord> {
    match link_type {
        LinkType::Ethernet => {
            let ethernet = EthernetPacket::new(data)?;
            decode_ethertype(ethernet.get_ethertype(), ethernet.payload(), frame_size)
        }
        LinkType::RawIp => decode_ip(data, frame_size),
        LinkType::LinuxSll => {
            if data.len() < LINUX_SLL_HEADER_LEN {
                return None;
            }
            let ethertype = EtherType::new(u16::from_be_bytes([data[14], data[15]]));
            decode_ethertype(ethertype, &data[LINUX_SLL_HEADER_LEN..], frame_size)
        }
    }
}

fn decode_ethertype(ethertype: EtherType, payload: &[u8], frame_size: u64) -> Option<PacketRecord> {
    match ethertype {
        EtherTypes::Ipv4 => decode_ipv4(payload, frame_size),
        EtherTypes::Ipv6 => decode_ipv6(payload, frame_size),
        EtherTypes::Vlan => {
            let vlan = VlanPacket::new(payload)?;
            decode_ethertype(vlan.get_ethertype(), vlan.payload(), frame_size)
        }
        _ => None,
    }
}

fn decode_ip(data: &[u8], frame_size: u64) -> Option<PacketRecord> {
    let version = *data.first()? >> 4;
    match version {
        4 => decode_ipv4(data, frame_size),
        6 => decode_ipv6(data, frame_size),
        version => {
            warn!("Raw frame with unknown IP version {}", version);
            None
        }
    }
}

fn decode_ipv4(data: &[u8], frame_size: u64) -> Option<PacketRecord> {
    let ipv4 = Ipv4Packet::new(data)?;
    let protocol = ipv4.get_next_level_protocol();
    let record = PacketRecord::new(
        IpAddr::V4(ipv4.get_source()),
        IpAddr::V4(ipv4.get_destination()),
        protocol.0,
        frame_size,
    );

    // only the first fragment carries the transport header
    if protocol == IpNextHeaderProtocols::Tcp && ipv4.get_fragment_offset() == 0 {
        Some(with_tcp_port(record, ipv4.payload()))
    } else {
        Some(record)
    }
}

fn decode_ipv6(data: &[u8], frame_size: u64) -> Option<PacketRecord> {
    let ipv6 = Ipv6Packet::new(data)?;
    let protocol = ipv6.get_next_header();
    let record = PacketRecord::new(
        IpAddr::V6(ipv6.get_source()),
        IpAddr::V6(ipv6.get_destination()),
        protocol.0,
        frame_size,
    );

    if protocol == IpNextHeaderProtocols::Tcp {
        Some(with_tcp_port(record, ipv6.payload()))
    } else {
        Some(record)
    }
}

fn with_tcp_port(record: PacketRecord, segment: &[u8]) -> PacketRecord {
    match TcpPacket::new(segment) {
        Some(tcp) => record.with_destination_port(tcp.get_destination()),
        None => record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_header(protocol: u8, payload_len: usize) -> Vec<u8> {
        let total = (20 + payload_len) as u16;
        let mut header = vec![
            0x45, 0x00, 0x00, 0x00, // version/ihl, tos, total length
            0x00, 0x01, 0x00, 0x00, // id, flags/fragment
            0x40, protocol, 0x00, 0x00, // ttl, protocol, checksum
            192, 168, 1, 10, // source
            192, 168, 1, 20, // destination
        ];
        header[2..4].copy_from_slice(&total.to_be_bytes());
        header
    }

    fn tcp_header(dst_port: u16) -> Vec<u8> {
        let mut header = vec![0u8; 20];
        header[0..2].copy_from_slice(&40000u16.to_be_bytes());
        header[2..4].copy_from_slice(&dst_port.to_be_bytes());
        header[12] = 0x50; // data offset
        header[13] = 0x02; // SYN
        header
    }

    fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn ipv4_tcp(dst_port: u16) -> Vec<u8> {
        let mut packet = ipv4_header(6, 20);
        packet.extend(tcp_header(dst_port));
        packet
    }

    #[test]
    fn test_link_type_mapping() {
        assert_eq!(LinkType::from_dlt(1).unwrap(), LinkType::Ethernet);
        assert_eq!(LinkType::from_dlt(14).unwrap(), LinkType::RawIp);
        assert_eq!(LinkType::from_dlt(101).unwrap(), LinkType::RawIp);
        assert_eq!(LinkType::from_dlt(113).unwrap(), LinkType::LinuxSll);
        assert!(matches!(
            LinkType::from_dlt(105),
            Err(CaptureError::UnsupportedLinkType(105))
        ));
    }

    #[test]
    fn test_decode_ethernet_tcp() {
        let frame = ethernet(0x0800, &ipv4_tcp(443));
        let record = decode_frame(LinkType::Ethernet, &frame, frame.len() as u64).unwrap();

        assert_eq!(record.source, "192.168.1.10".parse::<IpAddr>().unwrap());
        assert_eq!(record.destination, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert_eq!(record.protocol, 6);
        assert_eq!(record.frame_size, 54);
        assert_eq!(record.destination_port, Some(443));
    }

    #[test]
    fn test_decode_ethernet_udp_has_no_port() {
        let mut packet = ipv4_header(17, 8);
        packet.extend_from_slice(&[0x13, 0x88, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00]);
        let frame = ethernet(0x0800, &packet);

        let record = decode_frame(LinkType::Ethernet, &frame, 42).unwrap();
        assert_eq!(record.protocol, 17);
        assert_eq!(record.destination_port, None);
    }

    #[test]
    fn test_decode_vlan_tagged() {
        let mut tagged = vec![0x00, 0x64, 0x08, 0x00]; // vlan 100, inner ipv4
        tagged.extend(ipv4_tcp(22));
        let frame = ethernet(0x8100, &tagged);

        let record = decode_frame(LinkType::Ethernet, &frame, 58).unwrap();
        assert_eq!(record.destination_port, Some(22));
    }

    #[test]
    fn test_decode_raw_ip() {
        let packet = ipv4_tcp(8080);
        let record = decode_frame(LinkType::RawIp, &packet, 40).unwrap();
        assert_eq!(record.destination_port, Some(8080));
    }

    #[test]
    fn test_decode_linux_sll() {
        let mut frame = vec![0u8; 14];
        frame.extend_from_slice(&0x0800u16.to_be_bytes());
        frame.extend(ipv4_tcp(25));
        let record = decode_frame(LinkType::LinuxSll, &frame, 56).unwrap();
        assert_eq!(record.destination_port, Some(25));
    }

    #[test]
    fn test_decode_ipv6_tcp() {
        let mut packet = vec![0x60, 0, 0, 0, 0x00, 20, 6, 64];
        let mut src = [0u8; 16];
        src[15] = 1;
        let mut dst = [0u8; 16];
        dst[15] = 2;
        packet.extend_from_slice(&src);
        packet.extend_from_slice(&dst);
        packet.extend(tcp_header(8443));

        let record = decode_frame(LinkType::RawIp, &packet, 60).unwrap();
        assert_eq!(record.source, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(record.protocol, 6);
        assert_eq!(record.destination_port, Some(8443));
    }

    #[test]
    fn test_non_ip_frames_skipped() {
        let arp = ethernet(0x0806, &[0u8; 28]);
        assert!(decode_frame(LinkType::Ethernet, &arp, 42).is_none());
        assert!(decode_frame(LinkType::Ethernet, &[0u8; 4], 4).is_none());
        assert!(decode_frame(LinkType::LinuxSll, &[0u8; 8], 8).is_none());
        assert!(decode_frame(LinkType::RawIp, &[], 0).is_none());
    }

    fn pcap_record(data: &[u8], orig_len: u32) -> Vec<u8> {
        let mut record = Vec::new();
        record.extend_from_slice(&0u32.to_le_bytes()); // ts_sec
        record.extend_from_slice(&0u32.to_le_bytes()); // ts_usec
        record.extend_from_slice(&(data.len() as u32).to_le_bytes());
        record.extend_from_slice(&orig_len.to_le_bytes());
        record.extend_from_slice(data);
        record
    }

    #[test]
    fn test_reads_capture_file() {
        let mut file = Vec::new();
        file.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
        file.extend_from_slice(&2u16.to_le_bytes());
        file.extend_from_slice(&4u16.to_le_bytes());
        file.extend_from_slice(&0i32.to_le_bytes());
        file.extend_from_slice(&0u32.to_le_bytes());
        file.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
        file.extend_from_slice(&1u32.to_le_bytes()); // ethernet
        // truncated by a snap length: 54 bytes captured of a 1514 byte frame
        file.extend(pcap_record(&ethernet(0x0800, &ipv4_tcp(443)), 1514));
        file.extend(pcap_record(&ethernet(0x0806, &[0u8; 28]), 42));

        let path = std::env::temp_dir().join(format!(
            "pcap-traffic-report-{}-read.pcap",
            std::process::id()
        ));
        std::fs::write(&path, &file).unwrap();

        let mut engine = PcapEngine::open(&path, 1).unwrap();
        let record = engine.next().unwrap().unwrap();
        assert_eq!(record.frame_size, 1514);
        assert_eq!(record.destination_port, Some(443));
        assert!(engine.next().is_none());
        assert!(engine.next().is_none());

        assert_eq!(
            engine.stats(),
            &CaptureStats {
                frames_read: 2,
                packets_emitted: 1,
                frames_skipped: 1,
            }
        );

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("pcap-traffic-report-missing.pcap");
        assert!(matches!(
            PcapEngine::open(&path, 100),
            Err(CaptureError::FileNotFound(_))
        ));
    }
}
