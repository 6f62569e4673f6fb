use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{error, info};

use crate::error::{FlowTagError, Result};
use crate::lookup::{LookupTable, PortProtocol};
use crate::protocols::ProtocolResolver;

/// The only flow log version accepted
pub const SUPPORTED_VERSION: &str = "2";

/// Whitespace separated tokens in a version 2 record
pub const FIELD_COUNT: usize = 14;

/// Tag counted when no lookup entry matches
pub const UNTAGGED: &str = "Untagged";

/// A single version 2 flow log record, borrowed from its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord<'a> {
    pub version: &'a str,
    pub account_id: &'a str,
    pub interface_id: &'a str,
    pub source_ip: &'a str,
    pub dest_ip: &'a str,
    pub dest_port: &'a str,
    pub src_port: &'a str,
    pub protocol_code: &'a str,
    pub packet_count: &'a str,
    pub byte_count: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub action: &'a str,
    pub status: &'a str,
}

impl<'a> FlowRecord<'a> {
    /// Decode one line. The version is checked before the field count.
    pub fn parse(line: &'a str, line_number: u64) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.first().copied() {
            Some(SUPPORTED_VERSION) => {}
            Some(version) => {
                return Err(FlowTagError::UnsupportedVersion {
                    line: line_number,
                    version: version.to_string(),
                })
            }
            None => {
                return Err(FlowTagError::MalformedInput {
                    source_name: "flow log".to_string(),
                    line: line_number,
                    reason: "empty record".to_string(),
                })
            }
        }

        let fields: [&str; FIELD_COUNT] =
            fields.as_slice().try_into().map_err(|_| FlowTagError::MalformedInput {
                source_name: "flow log".to_string(),
                line: line_number,
                reason: format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            })?;
        let [
            version,
            account_id,
            interface_id,
            source_ip,
            dest_ip,
            dest_port,
            src_port,
            protocol_code,
            packet_count,
            byte_count,
            start_time,
            end_time,
            action,
            status,
        ] = fields;

        Ok(Self {
            version,
            account_id,
            interface_id,
            source_ip,
            dest_ip,
            dest_port,
            src_port,
            protocol_code,
            packet_count,
            byte_count,
            start_time,
            end_time,
            action,
            status,
        })
    }
}

/// Counts built during one parse pass.
///
/// Both maps keep first-seen insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowAggregates {
    pub tag_counts: IndexMap<String, u64>,
    pub port_protocol_counts: IndexMap<PortProtocol, u64>,
    pub records: u64,
}

impl FlowAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record under its tag and its port/protocol pair
    pub fn record(&mut self, tag: &str, key: PortProtocol) {
        match self.tag_counts.get_mut(tag) {
            Some(count) => *count += 1,
            None => {
                self.tag_counts.insert(tag.to_string(), 1);
            }
        }
        *self.port_protocol_counts.entry(key).or_insert(0) += 1;
        self.records += 1;
    }

    pub fn tag_count(&self, tag: &str) -> u64 {
        self.tag_counts.get(tag).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn port_protocol_count(&self, port: &str, protocol: &str) -> u64 {
        self.port_protocol_counts
            .get(&PortProtocol::new(port, protocol))
            .copied()
            .unwrap_or(0)
    }
}

/// Parses version 2 flow logs against a lookup table.
///
/// Any unsupported version or malformed line aborts the whole pass; no
/// partial aggregates are ever returned.
pub struct FlowLogParser<'a> {
    resolver: &'a ProtocolResolver,
    lookup: &'a LookupTable,
}

impl<'a> FlowLogParser<'a> {
    pub fn new(resolver: &'a ProtocolResolver, lookup: &'a LookupTable) -> Self {
        Self { resolver, lookup }
    }

    /// Parse a flow log file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<FlowAggregates> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FlowTagError::from_io(path, e))?;

        info!("Processing flow logs from {}", path.display());
        let aggregates = self
            .parse_reader(BufReader::new(file))
            .map_err(|e| match e {
                FlowTagError::Io { source, .. } => FlowTagError::from_io(path, source),
                other => other,
            })?;
        info!(
            "Flow logs processed successfully: {} records, {} tags, {} port/protocol combinations",
            aggregates.records,
            aggregates.tag_counts.len(),
            aggregates.port_protocol_counts.len()
        );
        Ok(aggregates)
    }

    /// Parse flow log records from any buffered reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<FlowAggregates> {
        let mut aggregates = FlowAggregates::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index as u64 + 1;
            let line = line.map_err(|source| FlowTagError::Io {
                path: "<flow log>".into(),
                source,
            })?;

            let record = FlowRecord::parse(&line, line_number).inspect_err(|e| {
                if let FlowTagError::UnsupportedVersion { version, .. } = e {
                    error!(
                        "Unsupported version {} in log entry at line {}. Expected version {}.",
                        version, line_number, SUPPORTED_VERSION
                    );
                }
            })?;

            let key = PortProtocol::new(record.dest_port, self.resolver.resolve(record.protocol_code));
            let tag = self.lookup.tag_for(&key).unwrap_or(UNTAGGED);
            aggregates.record(tag, key);
        }

        Ok(aggregates)
    }
}
