//! Command-line parsing for the `rpf` model builder.
//!
//! Argument parsing and command dispatch are kept separate from the model
//! code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rpf", version, about = "Pass/fail ratio (R_P/F) background model builder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build one or more models, print a summary per model and optionally export.
    Build(BuildArgs),
    /// Write a synthetic Poisson-fluctuated fail histogram for a configuration.
    Sample(SampleArgs),
    /// Print the X categories and channel labels of a configuration.
    Partition(PartitionArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct BuildArgs {
    /// Model configuration JSON. Repeat to build several models in parallel.
    #[arg(long = "config", value_name = "JSON", required = true, num_args = 1..)]
    pub configs: Vec<PathBuf>,

    /// Parameter-name suffix, overriding SUFFIX in every configuration.
    #[arg(long)]
    pub suffix: Option<String>,

    /// Seed parameter values and errors from a previously exported model JSON.
    #[arg(long = "seed-from", value_name = "JSON")]
    pub seed_from: Option<PathBuf>,

    /// Export the built model (parameters + per-bin values) to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,

    /// Export per-bin values to CSV.
    #[arg(long = "export-bins", value_name = "CSV")]
    pub export_bins: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    #[arg(long, value_name = "JSON")]
    pub config: PathBuf,

    /// Output histogram JSON.
    #[arg(long, value_name = "JSON")]
    pub out: PathBuf,

    /// Random seed (combined with the configuration for reproducibility).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Expected yield of the lowest (x, y) bin.
    #[arg(long, default_value_t = 1000.0)]
    pub scale: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct PartitionArgs {
    #[arg(long, value_name = "JSON")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_accepts_repeated_configs() {
        let cli = Cli::parse_from([
            "rpf", "build", "--config", "a.json", "--config", "b.json", "--suffix", "2017",
        ]);
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.configs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(args.suffix.as_deref(), Some("2017"));
        assert!(args.seed_from.is_none());
    }

    #[test]
    fn sample_defaults() {
        let cli = Cli::parse_from(["rpf", "sample", "--config", "c.json", "--out", "h.json"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.seed, 42);
        assert_eq!(args.scale, 1000.0);
    }
}
