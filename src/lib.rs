// Library exports for pcap-traffic-report
pub mod analysis;
pub mod capture;
pub mod config;
pub mod pipeline;
pub mod traffic;
pub mod ui;
pub mod utils;
pub mod visualization;

pub use analysis::{packet, protocols, statistics};
pub use capture::{pcap_engine, records};
pub use config::settings;
pub use pipeline::{analyze, analyze_concurrently, analyze_fallible, AnalysisReport};
pub use traffic::analyzer;
pub use ui::app;
pub use utils::formatting;
pub use visualization::{charts, tables};

// Error types
pub use anyhow::{Error, Result};
