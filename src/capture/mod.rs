pub mod pcap_engine;
pub mod records;

pub use pcap_engine::{decode_frame, CaptureError, CaptureStats, LinkType, PcapEngine};
pub use records::{RecordError, RecordReader};
