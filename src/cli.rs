// src/cli.rs
//! CLI definitions for the artipack packager
//!
//! Command implementations live in `main.rs`.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "artipack")]
#[command(author, version)]
#[command(about = "Package CI build artifacts into versioned zip archives", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package the artifacts of a finished build
    Package {
        /// Package configuration file (TOML)
        #[arg(short, long, default_value = "artipack.toml")]
        config: PathBuf,

        /// Project name, used for inventory file names
        #[arg(short, long)]
        project: String,

        /// Build label; names the per-build artifact folder
        #[arg(short, long)]
        label: String,

        /// Root directory for published artifacts
        #[arg(short, long)]
        artifact_dir: PathBuf,

        /// Build working directory (default: current directory)
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// A file modified by this build (repeatable)
        #[arg(short, long = "modified", value_name = "FILE")]
        modified: Vec<String>,

        /// Package even when the build has no modifications
        #[arg(long)]
        force: bool,
    },

    /// List the packages recorded in an inventory file
    Inventory {
        /// Path to a `<project>-packages.xml` file
        path: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}
