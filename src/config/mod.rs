pub mod settings;

pub use settings::{AnalysisConfig, CaptureConfig, Config, ConfigError, Overrides, ReportConfig, ReportFormat};
