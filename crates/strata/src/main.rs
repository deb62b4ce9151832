// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strata - tiered knowledge cache and memory lifecycle engine.
//!
//! This is the binary entry point for operational commands.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use strata::commands::{check, migrate, prune};
use strata::{Backend, Session, logging};
use strata_config::StrataConfig;
use strata_core::{BackendKind, Clock, StrataError, SystemClock};
use strata_prune::{PrunePolicy, PruneScope};

/// Strata - tiered knowledge cache and memory lifecycle engine.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
struct Cli {
    /// Read this config file instead of the standard hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Prune memory entries by their file-type rules.
    Prune {
        /// `all`, `project:<name>` or `skill:<name>`.
        #[arg(long, default_value = "all")]
        scope: PruneScope,
        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy memory and knowledge from the configured backend into another.
    Migrate {
        /// Target backend: files, sqlite or vector.
        #[arg(long)]
        to: BackendKind,
    },
    /// Validate a knowledge domain and show the freshness of its files.
    Check {
        domain: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => strata_config::load_and_validate_path(path),
        None => strata_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            strata_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init_tracing(&config.logging) {
        eprintln!("strata: {e}");
    }

    match run(cli.command, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("strata: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded.
async fn run(command: Commands, config: &StrataConfig) -> Result<bool, StrataError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    match command {
        Commands::Prune { scope, dry_run } => {
            let session = Session::open(config, clock, None).await?;
            let policy = PrunePolicy { scope, dry_run };
            let report = prune::run_prune(&session, &policy).await?;
            print!("{}", prune::render_prune(&report));
            session.end().await?;
            Ok(true)
        }
        Commands::Migrate { to } => {
            let source = Backend::from_config(config, Arc::clone(&clock), None).await?;
            let target = Backend::open(to, config, clock, None).await?;
            let summary =
                migrate::migrate_backends(&source, &target, Path::new(&config.files.context_dir))
                    .await?;
            print!("{}", migrate::render_migration(&summary));
            source.close().await?;
            target.close().await?;
            Ok(summary.is_faithful())
        }
        Commands::Check { domain } => {
            let session = Session::open(config, clock, None).await?;
            let report =
                check::run_check(&session, Path::new(&config.files.context_dir), &domain).await?;
            print!("{}", check::render_check(&report));
            session.end().await?;
            Ok(report.passed())
        }
    }
}
