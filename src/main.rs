// src/main.rs

mod cli;

use anyhow::{Context, Result};
use artipack::inventory;
use artipack::{BuildStatus, IntegrationResult, Modification, PackageConfig, PackagePublisher};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Package {
            config,
            project,
            label,
            artifact_dir,
            working_dir,
            modified,
            force,
        } => cmd_package(
            &config,
            project,
            label,
            artifact_dir,
            working_dir,
            modified,
            force,
        ),
        Commands::Inventory { path } => cmd_inventory(&path),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "artipack", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn cmd_package(
    config: &Path,
    project: String,
    label: String,
    artifact_dir: PathBuf,
    working_dir: Option<PathBuf>,
    modified: Vec<String>,
    force: bool,
) -> Result<()> {
    let spec = PackageConfig::from_file(config)
        .with_context(|| format!("Failed to load package config {}", config.display()))?
        .into_specification()
        .with_context(|| format!("Invalid package config {}", config.display()))?;

    let working_dir = match working_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };
    let modifications = modified
        .into_iter()
        .map(|file| Modification::new(file, "Modified"))
        .collect();
    let build = IntegrationResult::new(project, label, artifact_dir, working_dir)
        .with_status(BuildStatus::Success)
        .with_start_time(chrono::Utc::now())
        .with_modifications(modifications);

    let publisher = PackagePublisher::new(spec);
    if !force && !publisher.should_package(&build) {
        info!("No modifications and always_package is off; nothing to package");
        println!("Skipped: no modifications (use --force to package anyway)");
        return Ok(());
    }

    match publisher.run(&build) {
        Ok(outcome) => {
            println!("{}", outcome.archive_path.display());
            Ok(())
        }
        Err(e) => {
            if let Some(archive) = e.archive_path() {
                eprintln!("Archive was written to {} but not recorded", archive.display());
            }
            Err(e).context("Packaging failed")
        }
    }
}

fn cmd_inventory(path: &Path) -> Result<()> {
    let records = inventory::load(path)
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;

    if records.is_empty() {
        println!("No packages recorded in {}", path.display());
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {:>10} bytes  {:>4} file(s)  {}",
            record.created.format("%Y-%m-%d %H:%M:%S"),
            record.name,
            record.size,
            record.files,
            record.label.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
