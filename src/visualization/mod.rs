pub mod charts;
pub mod tables;

pub use charts::{ProtocolChart, ProtocolShareChart};
pub use tables::{render_report, Align, GridTable};
