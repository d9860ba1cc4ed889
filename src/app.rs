//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads configurations and histograms
//! - builds models (in parallel across configurations)
//! - prints reports
//! - writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::binning::BinPartition;
use crate::cli::{BuildArgs, Command, PartitionArgs, SampleArgs};
use crate::data::{SampleSpec, generate_fail};
use crate::error::AppError;
use crate::io::{read_config_json, read_model_json, write_bins_csv, write_hist_json, write_model_json};
use crate::params::ConflictPolicy;

pub mod pipeline;

/// Entry point for the `rpf` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Build(args) => handle_build(args),
        Command::Sample(args) => handle_sample(args),
        Command::Partition(args) => handle_partition(args),
    }
}

fn handle_build(args: BuildArgs) -> Result<(), AppError> {
    let requests = args
        .configs
        .iter()
        .map(|p| pipeline::BuildRequest::load(p, args.suffix.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;
    let mut models = pipeline::build_all(&requests)?;

    if let Some(path) = &args.seed_from {
        let seed = read_model_json(path)?.to_store()?;
        for model in &mut models {
            model.seed_from(&seed, ConflictPolicy::OverwriteValueAndError)?;
        }
    }

    let multi = models.len() > 1;
    for model in &models {
        let summary = crate::report::summarize(model)?;
        println!("{}", crate::report::format_model_summary(&summary, model));

        if args.export_model.is_none() && args.export_bins.is_none() {
            continue;
        }
        let export = model.export()?;
        if let Some(path) = &args.export_model {
            write_model_json(&per_model_path(path, &model.name, multi), &export)?;
        }
        if let Some(path) = &args.export_bins {
            write_bins_csv(&per_model_path(path, &model.name, multi), &export)?;
        }
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = read_config_json(&args.config)?;
    let hist = generate_fail(
        &config,
        SampleSpec {
            seed: args.seed,
            scale: args.scale,
        },
    )?;
    write_hist_json(&args.out, &hist)?;
    println!(
        "Wrote {} ({} x {} bins, total={:.0})",
        args.out.display(),
        config.binning.x.nbins,
        config.binning.y.nbins,
        hist.total()
    );
    Ok(())
}

fn handle_partition(args: PartitionArgs) -> Result<(), AppError> {
    let config = read_config_json(&args.config)?;
    let partition = BinPartition::from_config(&config.binning.x)?;
    println!("{}", crate::report::format_partition(&partition));
    Ok(())
}

/// `out.json` -> `out_<model>.json` when several models share one export flag.
fn per_model_path(path: &Path, model: &str, multi: bool) -> PathBuf {
    if !multi {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("export");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{model}.{ext}"),
        None => format!("{stem}_{model}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_model_paths() {
        let p = Path::new("/tmp/out.json");
        assert_eq!(per_model_path(p, "SR", false), PathBuf::from("/tmp/out.json"));
        assert_eq!(per_model_path(p, "SR", true), PathBuf::from("/tmp/out_SR.json"));
        assert_eq!(per_model_path(Path::new("bins"), "CR", true), PathBuf::from("bins_CR"));
    }
}
