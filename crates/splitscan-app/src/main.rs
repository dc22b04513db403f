// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Splitscan — recover individual, deskewed photographs from scanned sheets.
//
// Entry point. Parses arguments, initialises logging, loads the
// configuration and runs the directory runner inside a sized worker pool.

mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use splitscan_core::error::{Result, SplitError};
use splitscan_core::{AnglePolicy, RunManifest, SplitConfig};
use splitscan_imaging::with_worker_pool;
use tracing::{error, info};

use runner::RunOptions;

#[derive(Parser)]
#[command(name = "splitscan", version)]
#[command(about = "Split scanned sheets of photos into individual, deskewed images")]
struct Cli {
    /// Directory holding the scanned sheets
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory the photos and manifest are written to (created if missing)
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// JSON configuration file; missing keys keep their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Angle policy: `loss` or `corner` (overrides the configuration)
    #[arg(long, value_name = "POLICY")]
    policy: Option<AnglePolicy>,

    /// Also write a `<stem>_<n>_thumb.png` for every photo
    #[arg(long)]
    thumbnails: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Worker threads (0 = one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Splitscan starting");

    match run(&cli) {
        Ok(manifest) => {
            info!(
                sheets = manifest.sheets.len(),
                extracted = manifest.extracted_count(),
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Splitscan failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunManifest> {
    let mut config = match &cli.config {
        Some(path) => SplitConfig::load(path)?,
        None => SplitConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config.angle_policy = policy;
    }
    if let Some(jobs) = cli.jobs {
        config.worker_threads = jobs;
    }
    config.validate()?;

    if !cli.input_dir.is_dir() {
        return Err(SplitError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory {} not found", cli.input_dir.display()),
        )));
    }

    let options = RunOptions {
        policy: config.angle_policy,
        thumbnails: cli.thumbnails,
    };
    info!(
        policy = options.policy.as_str(),
        workers = config.worker_threads,
        "Configuration loaded"
    );
    with_worker_pool(config.worker_threads, || {
        runner::run(&cli.input_dir, &cli.output_dir, &config, options)
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_policy_and_jobs() {
        let cli = Cli::try_parse_from([
            "splitscan", "in", "out", "--policy", "corner", "--jobs", "4", "--thumbnails",
        ])
        .unwrap();
        assert_eq!(cli.policy, Some(AnglePolicy::CornerProbe));
        assert_eq!(cli.jobs, Some(4));
        assert!(cli.thumbnails);
        assert!(!cli.verbose);

        assert!(Cli::try_parse_from(["splitscan", "in", "out", "--policy", "hough"]).is_err());
    }

    #[test]
    fn missing_input_directory_fails_setup() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "splitscan".into(),
            dir.path().join("absent").into_os_string(),
            dir.path().join("out").into_os_string(),
        ])
        .unwrap();
        assert!(matches!(run(&cli), Err(SplitError::Io(_))));
    }
}
