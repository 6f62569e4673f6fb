use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::flowlog::{FlowAggregates, UNTAGGED};

pub const TAG_CAPTION: &str = "Tag Counts";
pub const PORT_PROTOCOL_CAPTION: &str = "Port/Protocol Combination Counts";

/// Renders flow aggregates as a two block CSV report.
///
/// The tag block is sorted by count descending, equal counts by tag name.
/// `Untagged` always comes last and is left out when nothing was untagged.
/// The port/protocol block keeps the order pairs were first seen in.
pub struct ReportWriter<'a> {
    aggregates: &'a FlowAggregates,
}

impl<'a> ReportWriter<'a> {
    pub fn new(aggregates: &'a FlowAggregates) -> Self {
        Self { aggregates }
    }

    /// Tag rows in report order
    pub fn tag_rows(&self) -> Vec<(&'a str, u64)> {
        let aggregates = self.aggregates;
        let mut rows: Vec<(&'a str, u64)> = aggregates
            .tag_counts
            .iter()
            .filter(|(tag, _)| tag.as_str() != UNTAGGED)
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect();
        rows.sort_by_key(|&(tag, count)| (Reverse(count), tag));

        let untagged = aggregates.tag_count(UNTAGGED);
        if untagged > 0 {
            rows.push((UNTAGGED, untagged));
        }
        rows
    }

    /// Write the report to a file, replacing any existing one.
    ///
    /// Rows go to a temporary file next to `path` that is renamed into place
    /// only once the whole report has been written.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staging = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        self.write_to(BufWriter::new(staging.as_file_mut()))
            .with_context(|| format!("Failed to save results to {}", path.display()))?;
        staging
            .persist(path)
            .with_context(|| format!("Failed to save results to {}", path.display()))?;

        info!("Results successfully saved to {}", path.display());
        Ok(())
    }

    /// Write the report to any sink
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        let mut wtr = csv_writer(&mut sink);
        wtr.write_record([TAG_CAPTION])?;
        wtr.write_record(["Tag", "Count"])?;
        for (tag, count) in self.tag_rows() {
            wtr.write_record([tag, count.to_string().as_str()])?;
        }
        wtr.flush()?;
        drop(wtr);

        // blank separator line between the blocks
        sink.write_all(b"\n")?;

        let mut wtr = csv_writer(&mut sink);
        wtr.write_record([PORT_PROTOCOL_CAPTION])?;
        wtr.write_record(["Port", "Protocol", "Count"])?;
        for (key, count) in &self.aggregates.port_protocol_counts {
            wtr.write_record([
                key.port.as_str(),
                key.protocol.as_str(),
                count.to_string().as_str(),
            ])?;
        }
        wtr.flush()?;
        drop(wtr);

        sink.flush().context("Failed to flush report")?;
        Ok(())
    }
}

fn csv_writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::PortProtocol;
    use tempfile::tempdir;

    fn aggregates(tags: &[(&str, u64)], pairs: &[(&str, &str, u64)]) -> FlowAggregates {
        let mut aggregates = FlowAggregates::new();
        for (tag, count) in tags {
            aggregates.tag_counts.insert(tag.to_string(), *count);
            aggregates.records += count;
        }
        for (port, protocol, count) in pairs {
            aggregates
                .port_protocol_counts
                .insert(PortProtocol::new(*port, *protocol), *count);
        }
        aggregates
    }

    fn render(aggregates: &FlowAggregates) -> String {
        let mut out = Vec::new();
        ReportWriter::new(aggregates).write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_tags_sorted_descending_untagged_last() {
        let agg = aggregates(&[("Untagged", 2), ("ssh", 3), ("web", 5)], &[]);
        let rows = ReportWriter::new(&agg).tag_rows();
        assert_eq!(rows, vec![("web", 5), ("ssh", 3), ("Untagged", 2)]);
    }

    #[test]
    fn test_untagged_last_even_when_largest() {
        let agg = aggregates(&[("Untagged", 40), ("email", 3), ("sv_P1", 7)], &[]);
        let rows = ReportWriter::new(&agg).tag_rows();
        assert_eq!(rows, vec![("sv_P1", 7), ("email", 3), ("Untagged", 40)]);
    }

    #[test]
    fn test_equal_counts_ordered_by_tag() {
        let agg = aggregates(&[("sv_P2", 4), ("email", 4), ("Email", 4), ("sv_P1", 9)], &[]);
        let rows = ReportWriter::new(&agg).tag_rows();
        assert_eq!(
            rows,
            vec![("sv_P1", 9), ("Email", 4), ("email", 4), ("sv_P2", 4)]
        );
    }

    #[test]
    fn test_zero_untagged_is_omitted() {
        let agg = aggregates(&[("web", 1), ("Untagged", 0)], &[]);
        let rows = ReportWriter::new(&agg).tag_rows();
        assert_eq!(rows, vec![("web", 1)]);
    }

    #[test]
    fn test_report_layout() {
        let agg = aggregates(
            &[("Untagged", 2), ("email", 1)],
            &[("25", "tcp", 1), ("25", "unknown", 1), ("8080", "tcp", 1)],
        );

        let expected = "\
Tag Counts
Tag,Count
email,1
Untagged,2

Port/Protocol Combination Counts
Port,Protocol,Count
25,tcp,1
25,unknown,1
8080,tcp,1
";
        assert_eq!(render(&agg), expected);
    }

    #[test]
    fn test_empty_report_has_both_blocks() {
        let agg = FlowAggregates::new();
        let expected = "\
Tag Counts
Tag,Count

Port/Protocol Combination Counts
Port,Protocol,Count
";
        assert_eq!(render(&agg), expected);
    }

    #[test]
    fn test_tags_needing_quotes() {
        let agg = aggregates(&[("web, internal", 1)], &[]);
        assert!(render(&agg).contains("\"web, internal\",1\n"));
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output_results.txt");
        let agg = aggregates(&[("web", 1)], &[("80", "tcp", 1)]);

        ReportWriter::new(&agg).write_to_path(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Tag Counts\nTag,Count\nweb,1\n\n"));
        assert!(written.ends_with("80,tcp,1\n"));
    }

    #[test]
    fn test_write_replaces_existing_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output_results.txt");
        std::fs::write(&path, "stale report\n").unwrap();
        let agg = aggregates(&[("email", 2)], &[("25", "tcp", 2)]);

        ReportWriter::new(&agg).write_to_path(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Tag Counts\nTag,Count\nemail,2\n"));
        // Only the report itself is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_no_file() {
        let dir = tempdir().unwrap();
        // A directory at the output path makes the final rename fail
        let path = dir.path().join("report.txt");
        std::fs::create_dir(&path).unwrap();
        let agg = aggregates(&[("web", 1)], &[("80", "tcp", 1)]);

        assert!(ReportWriter::new(&agg).write_to_path(&path).is_err());

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("report.txt")]);
        assert!(path.is_dir());
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.txt");
        let agg = FlowAggregates::new();
        assert!(ReportWriter::new(&agg).write_to_path(&path).is_err());
    }
}
