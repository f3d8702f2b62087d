// Licensed under the Apache-2.0 license

use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::PROJECT_ROOT;

/// Runs `cargo <args>` from the workspace root and fails on a non-zero exit.
fn cargo(args: &[&str]) -> Result<()> {
    println!("Running: cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .current_dir(&*PROJECT_ROOT)
        .args(args)
        .status()
        .with_context(|| format!("could not start cargo {}", args[0]))?;

    if !status.success() {
        bail!("cargo {} failed", args[0]);
    }
    Ok(())
}

pub(crate) fn format() -> Result<()> {
    cargo(&["fmt", "--check", "--all"])
}

pub(crate) fn clippy() -> Result<()> {
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
        "--no-deps",
    ])
}

pub(crate) fn test() -> Result<()> {
    cargo(&["test", "--workspace"])
}
