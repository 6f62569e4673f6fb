use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::flowlog::{FlowAggregates, FlowLogParser};
use crate::lookup::LookupTable;
use crate::protocols::ProtocolResolver;
use crate::report::ReportWriter;

/// Files touched by a single analysis run
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub lookup_table: PathBuf,
    pub log_file: PathBuf,
    pub output_file: PathBuf,
}

/// Statistics for a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lookup_entries: usize,
    pub records: u64,
    pub tags: usize,
    pub port_protocols: usize,
}

/// Load the lookup table, parse the flow log, write the report.
///
/// A lookup table that fails to load stops the run before any flow log is
/// read. A missing flow log is counted as empty and still gets a report.
/// Any other parse failure stops the run before the report is created, so
/// no partial output is ever written.
pub fn run(paths: &RunPaths, resolver: &ProtocolResolver) -> Result<RunSummary> {
    let lookup = match LookupTable::load(&paths.lookup_table) {
        Ok(table) => table,
        Err(e) => {
            if e.is_not_found() {
                error!("Lookup table missing, skipping flow log processing: {}", e);
            } else {
                error!("Failed to load lookup table: {}", e);
            }
            return Err(anyhow!(e).context("Lookup table unavailable, flow logs not processed"));
        }
    };

    if lookup.is_empty() {
        warn!(
            "Lookup table {} has no mappings, every flow will be Untagged",
            paths.lookup_table.display()
        );
    }

    debug!("Resolving against {} known protocol codes", resolver.len());
    let parser = FlowLogParser::new(resolver, &lookup);
    let aggregates = match parser.parse_file(&paths.log_file) {
        Ok(aggregates) => aggregates,
        Err(e) if e.is_not_found() => {
            error!("{}, reporting empty counts", e);
            FlowAggregates::new()
        }
        Err(e) => {
            error!("Processing halted due to error: {}", e);
            return Err(anyhow!(e).context(format!(
                "Failed to process flow log {}",
                paths.log_file.display()
            )));
        }
    };

    ReportWriter::new(&aggregates)
        .write_to_path(&paths.output_file)
        .inspect_err(|e| error!("{:#}", e))
        .context("Report not written")?;

    let summary = RunSummary {
        lookup_entries: lookup.len(),
        records: aggregates.records,
        tags: aggregates.tag_counts.len(),
        port_protocols: aggregates.port_protocol_counts.len(),
    };
    info!(
        "Tagged {} records into {} tags across {} port/protocol combinations",
        summary.records, summary.tags, summary.port_protocols
    );

    Ok(summary)
}
