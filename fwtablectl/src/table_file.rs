// Licensed under the Apache-2.0 license

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{bail, Context, Result};
use fw_table::FwTable;
use log::{debug, info};

pub fn read_table(path: &Path) -> Result<FwTable> {
    let file = File::open(path)
        .with_context(|| format!("could not open '{}' for reading", path.display()))?;
    let table = FwTable::decode(file)
        .with_context(|| format!("error reading firmware table from '{}'", path.display()))?;
    debug!(
        "read table from '{}': {} parts, {} firmwares",
        path.display(),
        table.parts.len(),
        table.firmwares.len()
    );
    Ok(table)
}

/// Encodes `table` and writes it over the start of `path`.
///
/// Nothing is written if the encoded table does not validate. The target is
/// neither created nor truncated, so it may be a block device.
pub fn write_table(path: &Path, table: &mut FwTable) -> Result<()> {
    let encoded = table.encode().context("error updating table")?;

    let errors = table.validate();
    if !errors.is_empty() {
        let list: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
        bail!("error validating new table:\n{}", list.join("\n"));
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("could not open '{}' for writing", path.display()))?;
    encoded
        .export(file)
        .with_context(|| format!("error writing table to '{}'", path.display()))?;
    info!(
        "wrote {} bytes to '{}' (checksum 0x{:08x})",
        encoded.total_size(),
        path.display(),
        table.checksum
    );
    Ok(())
}
