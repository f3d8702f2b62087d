// Licensed under the Apache-2.0 license

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use toml::{Table, Value};
use walkdir::WalkDir;

use crate::PROJECT_ROOT;

const DEPENDENCY_TABLES: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];
const IGNORED_DIRS: &[&str] = &["examples", "target"];

/// Every member dependency must be declared as `name.workspace = true`.
pub(crate) fn check() -> Result<()> {
    let mut okay = true;
    for manifest in member_manifests(&PROJECT_ROOT)? {
        let data = std::fs::read_to_string(&manifest)
            .with_context(|| format!("reading {}", manifest.display()))?;
        let value: Table = data
            .parse()
            .with_context(|| format!("parsing {}", manifest.display()))?;
        println!("Checking dependencies in {}", manifest.display());
        for problem in problems(&value) {
            println!("  {problem}");
            okay = false;
        }
    }
    if !okay {
        bail!("dependency check failed");
    }
    Ok(())
}

fn problems(manifest: &Table) -> Vec<String> {
    let mut found = vec![];
    for table_name in DEPENDENCY_TABLES {
        let Some(deps) = manifest.get(*table_name).and_then(Value::as_table) else {
            continue;
        };
        for (name, value) in deps {
            let from_workspace = value
                .as_table()
                .and_then(|t| t.get("workspace"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !from_workspace {
                found.push(format!(
                    "[{table_name}] {name} should be {name}.workspace = true but was {name} = {value}"
                ));
            }
        }
    }
    found
}

/// Cargo.toml files of the workspace members.
fn member_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut result = vec![];
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.file_name()
            .to_str()
            .map_or(true, |name| !IGNORED_DIRS.contains(&name))
    });
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_name() == "Cargo.toml" && entry.depth() > 1 {
            result.push(entry.into_path());
        }
    }
    result.sort();
    Ok(result)
}
