// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::Context;
use ch_reconciler::ReconcilerConfig;
use ch_reconciler::manifest::{Manifest, plan_manifest};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ClickHouse reconciliation tool
#[derive(Parser, Debug)]
#[command(name = "ch-reconciler")]
#[command(about = "Converge ClickHouse databases, tables, roles and users to a declared state")]
struct Args {
    /// Path to the reconciler configuration file
    #[arg(short, long, env = "CH_RECONCILER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the statements that create every object in a manifest
    ///
    /// Validates the whole manifest without connecting to a server. Nothing
    /// is printed if any object is invalid. Passwords are redacted.
    ///
    /// Example:
    ///   ch-reconciler plan manifest.toml
    ///   ch-reconciler --config reconciler.toml plan manifest.toml
    Plan {
        /// Path to the manifest file
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => ReconcilerConfig::load(path)?,
        None => ReconcilerConfig::default(),
    };

    match args.command {
        Command::Plan { manifest } => {
            let loaded = Manifest::load(&manifest)?;
            let statements = plan_manifest(&loaded, &config)
                .with_context(|| format!("planning {}", manifest.display()))?;
            info!(statements = statements.len(), "planned manifest");
            for statement in &statements {
                println!("{statement};");
            }
        }
    }
    Ok(())
}
