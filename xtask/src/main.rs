// Licensed under the Apache-2.0 license

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cargo;
mod deps;
mod header;

/// Workspace root: the parent of this crate's manifest directory.
pub(crate) static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .to_path_buf()
});

#[derive(Parser)]
#[command(version, about = "Developer tasks for the firmware table workspace", long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clippy on all targets
    Clippy,
    /// Check that all files are formatted
    Format,
    /// Check files for Apache license header
    HeaderCheck,
    /// Add Apache license header to files where it is missing
    HeaderFix,
    /// Check that every dependency comes from the workspace table
    Deps,
    /// Run workspace tests
    Test,
    /// Run pre-check-in checks
    Precheckin,
}

fn precheckin() -> Result<()> {
    cargo::format()?;
    cargo::clippy()?;
    header::check()?;
    deps::check()?;
    cargo::test()
}

fn main() {
    let cli = Xtask::parse();
    let result = match cli.xtask {
        Commands::Clippy => cargo::clippy(),
        Commands::Format => cargo::format(),
        Commands::HeaderCheck => header::check(),
        Commands::HeaderFix => header::fix(),
        Commands::Deps => deps::check(),
        Commands::Test => cargo::test(),
        Commands::Precheckin => precheckin(),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
