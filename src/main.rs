//! Measureset CLI
//!
//! Command-line interface over a directory of measurements:
//! - Show the indexed fields
//! - Query records
//! - Group records
//! - Aggregate groups and export the curves

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use measureset::{
    export_ekpy, generate_default_config, init_logging, AggregateResult, Config, Dataset, Error,
    Grouped, IndexError, Selection, Statistic,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "measureset")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query, group and aggregate lab measurements")]
#[command(long_about = "Measureset indexes a directory of ekpy measurements by their metadata.\nFilter records, group them by any fields, and average their curves.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/measureset/config.toml or ./measureset.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Measurement directory, overriding the config
    #[arg(short, long, global = true)]
    pub data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show indexed fields and their kinds
    Fields,

    /// List records matching an expression
    Query {
        /// Filter expression, e.g. "voltage >= 0.5 and sample == 'D0'"
        expression: String,
    },

    /// Group records by metadata fields
    Groups {
        /// Grouping fields (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        by: Vec<String>,
        /// Filter applied before grouping
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,
    },

    /// Aggregate the payloads of each group
    Aggregate {
        /// Grouping fields (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        by: Vec<String>,
        /// Filter applied before grouping
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,
        /// Group indices to aggregate (default: all)
        #[arg(short, long, value_delimiter = ',')]
        groups: Vec<usize>,
        /// Statistic (mean, median, min, max, sum, std; default from config)
        #[arg(short, long)]
        statistic: Option<Statistic>,
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
        /// Write one ekpy file per group into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Base name of exported files
        #[arg(long, default_value = "aggregate")]
        base: String,
    },

    /// Print the effective config, or a commented default one
    Config {
        /// Print the default config file instead
        #[arg(long)]
        default: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging)?;

    match cli.command {
        Commands::Config { default } => {
            if default {
                print!("{}", generate_default_config());
            } else {
                print!("{}", config.to_toml()?);
            }
        }

        Commands::Fields => {
            let dataset = open(&config)?;
            let index = dataset.index();
            let stats = index.stats();

            println!("Location: {}", stats.location.display());
            println!("Source:   {}", stats.source);
            println!("Records:  {}", stats.records);
            for (format, count) in &stats.payload_formats {
                println!("  {}: {}", format, count);
            }
            println!();
            println!("{:<20} {:<10} {}", "Field", "Kind", "Distinct");
            println!("{}", "-".repeat(40));
            for (name, kind) in index.schema() {
                let distinct = index.distinct_values(name, 0..index.size()).len();
                println!("{:<20} {:<10} {}", name, kind.to_string(), distinct);
            }
        }

        Commands::Query { expression } => {
            let dataset = open(&config)?;
            let selection = dataset.query(&expression)?;
            print_records(&selection);
        }

        Commands::Groups { by, filter } => {
            let dataset = open(&config)?;
            let grouped = group(&dataset, filter.as_deref(), &by)?;
            print_groups(&grouped);
        }

        Commands::Aggregate {
            by,
            filter,
            groups,
            statistic,
            format,
            output,
            base,
        } => {
            let dataset = open(&config)?;
            let grouped = group(&dataset, filter.as_deref(), &by)?;
            let statistic = statistic.unwrap_or(config.aggregate.statistic);

            let result = if groups.is_empty() {
                grouped.aggregate(statistic)?
            } else {
                grouped.select(&groups)?.aggregate(statistic)?
            };

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&result)?),
                "table" => print_aggregate(&result),
                other => bail!("unknown output format '{}' (expected table or json)", other),
            }

            if let Some(dir) = output {
                let written = export_ekpy(&result, &dir, &base)
                    .with_context(|| format!("exporting to {}", dir.display()))?;
                println!();
                println!("Exported {} file(s) to {}", written.len(), dir.display());
            }
        }
    }

    Ok(())
}

/// Index the configured directory, reporting skipped records
fn open(config: &Config) -> anyhow::Result<Dataset> {
    let (dataset, report) = match Dataset::open_with_config(config) {
        Ok(opened) => opened,
        Err(Error::Index(IndexError::EmptyIndex { malformed, .. })) if !malformed.is_empty() => {
            for error in malformed.iter().take(10) {
                eprintln!("  {}", error);
            }
            bail!(
                "no usable records in {} ({} malformed)",
                config.storage.data_dir,
                malformed.len()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("indexing {}", config.storage.data_dir));
        }
    };

    if !report.is_clean() {
        eprintln!(
            "Skipped {} malformed record(s) ({} indexed):",
            report.malformed.len(),
            report.indexed
        );
        for error in report.malformed.iter().take(10) {
            eprintln!("  {}", error);
        }
    }
    Ok(dataset)
}

fn group(dataset: &Dataset, filter: Option<&str>, by: &[String]) -> anyhow::Result<Grouped> {
    let selection = match filter {
        Some(expression) => dataset.query(expression)?,
        None => dataset.all(),
    };
    Ok(selection.group(by)?)
}

fn print_records(selection: &Selection) {
    if selection.is_empty() {
        println!("No matching records.");
        return;
    }

    let fields: Vec<&str> = selection.dataset().index().fields().into_iter().collect();

    print!("{:<6} {:<24}", "Row", "Payload");
    for field in &fields {
        print!(" {:<12}", field);
    }
    println!();
    println!("{}", "-".repeat(31 + 13 * fields.len()));

    for (&row, record) in selection.rows().iter().zip(selection.records()) {
        print!("{:<6} {:<24}", row, record.payload.to_string());
        for field in &fields {
            print!(" {:<12}", record.get(field).to_string());
        }
        println!();
    }
    println!();
    println!("{} record(s)", selection.len());
}

fn print_groups(grouped: &Grouped) {
    if grouped.is_empty() {
        println!("No groups.");
        return;
    }

    println!("{:<6} {:<8} {}", "Group", "Members", "Key");
    println!("{}", "-".repeat(50));
    for group in grouped.groups() {
        println!("{:<6} {:<8} {}", group.index, group.len(), group.key);
    }
}

fn print_aggregate(result: &AggregateResult) {
    println!("Statistic: {}", result.statistic);
    println!();
    println!(
        "{:<6} {:<8} {:<8} {:<12} {}",
        "Group", "Members", "Points", "Alignment", "Key"
    );
    println!("{}", "-".repeat(60));
    for aggregate in result.iter() {
        println!(
            "{:<6} {:<8} {:<8} {:<12} {}",
            aggregate.group,
            aggregate.members,
            aggregate.len(),
            aggregate.alignment.to_string(),
            aggregate.key
        );
        let channels: Vec<&str> = aggregate.channels.keys().map(String::as_str).collect();
        println!("       channels: {}", channels.join(", "));
    }
}
