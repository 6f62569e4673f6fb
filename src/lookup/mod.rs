use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{FlowTagError, Result};

/// Exact-match key joining flow records to lookup rows.
#[derive(Hash, Eq, PartialEq, Debug, Clone)]
pub struct PortProtocol {
    pub port: String,
    pub protocol: String,
}

impl PortProtocol {
    pub fn new(port: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            protocol: protocol.into(),
        }
    }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Mapping of (destination port, protocol) to tag, loaded from CSV.
///
/// The first row of the source is a header and is skipped without checking
/// its column names. Protocols are stored lowercased; ports and tags are kept
/// as written. Later rows overwrite earlier rows with the same key.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<PortProtocol, String>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lookup table from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FlowTagError::from_io(path, e))?;

        let table = Self::from_named_reader(BufReader::new(file), &path.display().to_string())?;
        info!(
            "Lookup table successfully loaded from {}: {} mappings",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Load a lookup table from any CSV reader
    #[cfg(test)]
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_named_reader(reader, "lookup table")
    }

    fn from_named_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::new();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            if record.len() < 3 {
                return Err(FlowTagError::MalformedInput {
                    source_name: source_name.to_string(),
                    line,
                    reason: format!("expected 3 fields, found {}", record.len()),
                });
            }

            if let Some(previous) = table.insert(&record[0], &record[1], &record[2]) {
                debug!(
                    "Line {}: {}/{} remapped from {} to {}",
                    line, &record[0], &record[1], previous, &record[2]
                );
            }
        }

        Ok(table)
    }

    /// Add a mapping, returning the tag it replaced
    pub fn insert(&mut self, port: &str, protocol: &str, tag: &str) -> Option<String> {
        self.entries
            .insert(PortProtocol::new(port, protocol.to_lowercase()), tag.to_string())
    }

    /// Tag for a key, if one is mapped
    pub fn tag_for(&self, key: &PortProtocol) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Convenience lookup by port and protocol name
    #[cfg(test)]
    pub fn get(&self, port: &str, protocol: &str) -> Option<&str> {
        self.tag_for(&PortProtocol::new(port, protocol.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
