mod cli;
mod config;
mod error;
mod flowlog;
mod generator;
mod lookup;
mod pipeline;
mod protocols;
mod report;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{error, info};

use cli::{Cli, Commands};
use config::AnalyzerConfig;
use generator::DataGenerator;
use pipeline::RunPaths;
use protocols::ProtocolResolver;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Execute command
    if let Err(e) = run_command(cli.command) {
        error!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze(args) => cmd_analyze(args),
        Commands::Generate(args) => cmd_generate(args),
    }
}

fn load_config(paths: &cli::PathArgs) -> Result<(AnalyzerConfig, NaiveDate)> {
    let config = AnalyzerConfig::resolve(paths.config.as_deref())?.with_overrides(paths.overrides());
    let date = paths.date.unwrap_or_else(|| Local::now().date_naive());
    Ok((config, date))
}

fn cmd_analyze(args: cli::AnalyzeArgs) -> Result<()> {
    let (config, date) = load_config(&args.paths)?;

    let paths = RunPaths {
        lookup_table: config.lookup_table_file.clone(),
        log_file: args.log_file.unwrap_or_else(|| config.log_file_for(date)),
        output_file: args.output_file.unwrap_or_else(|| config.output_file_for(date)),
    };
    info!(
        "Analyzing {} with lookup table {}",
        paths.log_file.display(),
        paths.lookup_table.display()
    );

    let resolver = ProtocolResolver::iana();
    let summary = pipeline::run(&paths, &resolver)?;

    println!("\nFlow Log Summary:");
    println!("  Lookup mappings: {}", summary.lookup_entries);
    println!("  Records tagged: {}", summary.records);
    println!("  Distinct tags: {}", summary.tags);
    println!("  Port/protocol combinations: {}", summary.port_protocols);
    println!("  Report: {}", paths.output_file.display());

    Ok(())
}

fn cmd_generate(args: cli::GenerateArgs) -> Result<()> {
    let (config, date) = load_config(&args.paths)?;

    let rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let mut generator = DataGenerator::new(rng);

    let log_file = config.log_file_for(date);
    let generated = generator.write_log_file(&log_file, args.max_log_size_mb)?;
    generator.write_lookup_file(&config.lookup_table_file, args.max_lookup_entries)?;

    println!("\nGenerated Data:");
    println!("  Flow log: {} ({} records)", log_file.display(), generated.records);
    println!(
        "  Lookup table: {} ({} rows)",
        config.lookup_table_file.display(),
        args.max_lookup_entries
    );

    Ok(())
}
