use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "flowtag")]
#[command(about = "Tag network flow logs by destination port and protocol", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tag a day's flow log and write the count report
    Analyze(AnalyzeArgs),

    /// Write a synthetic flow log and lookup table
    Generate(GenerateArgs),
}

/// File locations shared by every command
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    /// JSON config file (default: config.json if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Lookup table CSV (destination_port,protocol,tag)
    #[arg(short, long, env = "FLOWTAG_LOOKUP_TABLE")]
    pub lookup_table: Option<PathBuf>,

    /// Prefix of the date stamped flow log file
    #[arg(long, env = "FLOWTAG_LOG_PREFIX")]
    pub log_prefix: Option<String>,

    /// Prefix of the date stamped report file
    #[arg(long, env = "FLOWTAG_OUTPUT_PREFIX")]
    pub output_prefix: Option<String>,

    /// Date used in file names, YYYY-MM-DD (default: today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

impl PathArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            lookup_table_file: self.lookup_table.clone(),
            log_file_prefix: self.log_prefix.clone(),
            output_file_prefix: self.output_prefix.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Flow log to read, bypassing the date stamped name
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Report to write, bypassing the date stamped name
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Maximum flow log size in MB
    #[arg(long, default_value = "10")]
    pub max_log_size_mb: u64,

    /// Number of rows in the lookup table
    #[arg(long, default_value = "10000")]
    pub max_lookup_entries: usize,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}
