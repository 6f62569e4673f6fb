use anyhow::{Context, Result};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const ACCOUNT_ID: &str = "123456789012";
const START_TIME: u64 = 1620140761;
const DEST_PORTS: &[u16] = &[22, 23, 25, 80, 110, 143, 443, 993, 3389, 49153];
const PROTOCOL_CODES: &[&str] = &["6", "17"];
const ACTIONS: &[&str] = &["ACCEPT", "REJECT"];
const BYTES_PER_MB: u64 = 1024 * 1024;
const HEX_LETTERS: &[u8] = b"abcdef";

/// Port/protocol pairs used for lookup rows
const LOOKUP_PAIRS: &[(u16, &str)] = &[
    (22, "tcp"),
    (23, "tcp"),
    (25, "tcp"),
    (53, "udp"),
    (80, "tcp"),
    (110, "tcp"),
    (143, "tcp"),
    (443, "tcp"),
    (993, "tcp"),
    (3389, "tcp"),
    (49153, "udp"),
];

const TAGS: &[&str] = &[
    "sv_P1", "sv_P2", "sv_P3", "sv_P4", "sv_P5", "SV_P1", "SV_P2", "email", "Email",
];

/// Byte budget for a log of `max_size_mb` megabytes
fn size_limit(max_size_mb: u64) -> u64 {
    max_size_mb.saturating_mul(BYTES_PER_MB)
}

/// Result of writing a synthetic flow log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratedLog {
    pub records: u64,
    pub bytes: u64,
}

/// Produces synthetic version 2 flow logs and matching lookup tables.
pub struct DataGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> DataGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.random_range(0..items.len())]
    }

    fn interface_id(&mut self) -> String {
        format!(
            "eni-{}{}{}{}",
            self.pick(HEX_LETTERS) as char,
            self.rng.random_range(1..=9),
            self.pick(HEX_LETTERS) as char,
            self.rng.random_range(1..=9)
        )
    }

    /// One flow log line, without the trailing newline
    pub fn flow_record(&mut self) -> String {
        let interface_id = self.interface_id();
        let source_ip = format!(
            "10.0.{}.{}",
            self.rng.random_range(0..=255),
            self.rng.random_range(0..=255)
        );
        let dest_ip = format!("198.51.100.{}", self.rng.random_range(1..=255));
        let dest_port = self.pick(DEST_PORTS);
        let src_port: u16 = self.rng.random_range(1..=65535);
        let protocol = self.pick(PROTOCOL_CODES);
        let packets: u32 = self.rng.random_range(1..=100);
        let bytes: u32 = self.rng.random_range(100..=100_000);
        let end_time = START_TIME + self.rng.random_range(1..=1000);
        let action = self.pick(ACTIONS);

        format!(
            "2 {} {} {} {} {} {} {} {} {} {} {} {} OK",
            ACCOUNT_ID,
            interface_id,
            source_ip,
            dest_ip,
            dest_port,
            src_port,
            protocol,
            packets,
            bytes,
            START_TIME,
            end_time,
            action
        )
    }

    /// Write flow records until at least `max_bytes` have been written
    pub fn write_log<W: Write>(&mut self, mut sink: W, max_bytes: u64) -> Result<GeneratedLog> {
        let mut generated = GeneratedLog::default();
        while generated.bytes < max_bytes {
            let line = self.flow_record();
            writeln!(sink, "{}", line)?;
            generated.bytes += line.len() as u64 + 1;
            generated.records += 1;
        }
        sink.flush()?;
        Ok(generated)
    }

    /// Write a lookup table with a header and `entries` rows
    pub fn write_lookup<W: Write>(&mut self, sink: W, entries: usize) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(sink);
        wtr.write_record(["destination_port", "protocol", "tag"])?;
        for _ in 0..entries {
            let (port, protocol) = self.pick(LOOKUP_PAIRS);
            let tag = self.pick(TAGS);
            wtr.write_record([port.to_string().as_str(), protocol, tag])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_log_file<P: AsRef<Path>>(&mut self, path: P, max_size_mb: u64) -> Result<GeneratedLog> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        let generated = self
            .write_log(BufWriter::new(file), size_limit(max_size_mb))
            .with_context(|| format!("Failed to write log file {}", path.display()))?;
        info!(
            "Generated {} flow records ({} bytes) in {}",
            generated.records,
            generated.bytes,
            path.display()
        );
        Ok(generated)
    }

    pub fn write_lookup_file<P: AsRef<Path>>(&mut self, path: P, entries: usize) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create lookup file {}", path.display()))?;
        self.write_lookup(BufWriter::new(file), entries)
            .with_context(|| format!("Failed to write lookup file {}", path.display()))?;
        info!("Generated {} lookup mappings in {}", entries, path.display());
        Ok(())
    }
}
