pub mod analyzer;

pub use analyzer::{PortScanCandidate, PortScanDetector, PortScanReport, DEFAULT_PORT_SCAN_THRESHOLD};
