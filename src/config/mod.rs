use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file read when none is named on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// File locations used by an analysis run.
///
/// Flow logs and reports are date stamped:
/// `<log_file_prefix>_<YYYY-MM-DD>.log` and `<output_file_prefix>_<YYYY-MM-DD>.txt`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub lookup_table_file: PathBuf,
    pub log_file_prefix: String,
    pub output_file_prefix: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lookup_table_file: PathBuf::from("port_protocol_lookup.csv"),
            log_file_prefix: "network_logs".to_string(),
            output_file_prefix: "output_results".to_string(),
        }
    }
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub lookup_table_file: Option<PathBuf>,
    pub log_file_prefix: Option<String>,
    pub output_file_prefix: Option<String>,
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load the named config file, or the default one if it exists.
    ///
    /// A config file named explicitly must exist; a missing default file
    /// falls back to built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(path) = overrides.lookup_table_file {
            self.lookup_table_file = path;
        }
        if let Some(prefix) = overrides.log_file_prefix {
            self.log_file_prefix = prefix;
        }
        if let Some(prefix) = overrides.output_file_prefix {
            self.output_file_prefix = prefix;
        }
        self
    }

    /// Flow log path for the given day
    pub fn log_file_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.log_file_prefix, date, "log")
    }

    /// Report path for the given day
    pub fn output_file_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.output_file_prefix, date, "txt")
    }
}

fn dated_path(prefix: &str, date: NaiveDate, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.{}", prefix, date.format("%Y-%m-%d"), extension))
}
