use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::traffic::analyzer::DEFAULT_PORT_SCAN_THRESHOLD;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot write configuration file '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid configuration file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub capture: CaptureConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub port_scan_threshold: u64,
    /// Run the aggregator and the port-scan check on separate worker threads.
    /// The input is buffered in memory first, so this is off by default.
    pub concurrent: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Log a progress line every this many frames.
    pub progress_interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Row limit for the IP pair tables, 0 shows everything.
    pub top_pairs: usize,
    pub charts: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            port_scan_threshold: DEFAULT_PORT_SCAN_THRESHOLD,
            concurrent: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            progress_interval: 10_000,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Table,
            top_pairs: 0,
            charts: false,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port_scan_threshold: Option<u64>,
    pub format: Option<ReportFormat>,
    pub top_pairs: Option<usize>,
    pub charts: bool,
    pub concurrent: bool,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.port_scan_threshold == 0 {
            return Err(ConfigError::Invalid(
                "analysis.port_scan_threshold: must be at least 1".to_string(),
            ));
        }
        if self.capture.progress_interval == 0 {
            return Err(ConfigError::Invalid(
                "capture.progress_interval: must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(threshold) = overrides.port_scan_threshold {
            self.analysis.port_scan_threshold = threshold;
        }
        if let Some(format) = overrides.format {
            self.report.format = format;
        }
        if let Some(top) = overrides.top_pairs {
            self.report.top_pairs = top;
        }
        if overrides.charts {
            self.report.charts = true;
        }
        if overrides.concurrent {
            self.analysis.concurrent = true;
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pcap-traffic-report-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.port_scan_threshold, 100);
        assert!(!config.analysis.concurrent);
        assert_eq!(config.report.format, ReportFormat::Table);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[analysis]\nport_scan_threshold = 25\n").unwrap();
        assert_eq!(config.analysis.port_scan_threshold, 25);
        assert!(!config.analysis.concurrent);
        assert_eq!(config.capture.progress_interval, 10_000);
    }

    #[test]
    fn test_report_format_parsing() {
        let config: Config = toml::from_str("[report]\nformat = \"json\"\ntop_pairs = 5\n").unwrap();
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.top_pairs, 5);
    }

    #[test]
    fn test_zero_threshold_invalid() {
        let mut config = Config::default();
        config.analysis.port_scan_threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let overrides = Overrides {
            port_scan_threshold: Some(42),
            format: Some(ReportFormat::Json),
            top_pairs: None,
            charts: true,
            concurrent: true,
        };
        config.apply_overrides(&overrides).unwrap();
        assert_eq!(config.analysis.port_scan_threshold, 42);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.top_pairs, 0);
        assert!(config.report.charts);
        assert!(config.analysis.concurrent);

        let bad = Overrides {
            port_scan_threshold: Some(0),
            ..Overrides::default()
        };
        assert!(config.apply_overrides(&bad).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("config.toml");
        let mut config = Config::default();
        config.analysis.port_scan_threshold = 7;
        config.report.charts = true;

        config.save_to_file(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from_file(temp_path("does-not-exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
