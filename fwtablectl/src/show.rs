// Licensed under the Apache-2.0 license

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};
use fw_table::{FwTable, ValidationError};
use serde::Serialize;

use crate::table_file::read_table;

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    table: &'a FwTable,
    extra: i64,
    validation_errors: Vec<String>,
}

pub fn show(path: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let table = read_table(path)?;
    let errors = table.validate();
    if json {
        let report = Report {
            table: &table,
            extra: table.extra(),
            validation_errors: errors.iter().map(ToString::to_string).collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    print_errors(&errors, out)?;
    print_table(&table, out)
}

pub fn verify(path: &Path, out: &mut dyn Write) -> Result<()> {
    let table = read_table(path)?;
    let errors = table.validate();
    if errors.is_empty() {
        writeln!(out, "Table is valid")?;
        return Ok(());
    }
    print_errors(&errors, out)?;
    bail!(
        "'{}' failed validation with {} error(s)",
        path.display(),
        errors.len()
    );
}

fn print_errors(errors: &[ValidationError], out: &mut dyn Write) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(out, "Validation Errors:")?;
    for e in errors {
        writeln!(out, " - {e}")?;
    }
    Ok(())
}

pub fn print_table(table: &FwTable, out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "Signature: {} Checksum 0x{:08x} Size {} Version {} Extra data: {}",
        table.signature_str(),
        table.checksum,
        table.total_size,
        table.version,
        table.extra()
    )?;
    for (i, part) in table.parts.iter().enumerate() {
        writeln!(
            out,
            "Part {}: {} ({}) RO: {} Size: {} - Mount Point: '{}' ({}) Format: {}",
            i + 1,
            part.part_type,
            part.fw_count,
            part.read_only,
            part.length,
            part.mount_point,
            part.emmc_part_id,
            part.fs_type
        )?;
    }
    for (i, fw) in table.firmwares.iter().enumerate() {
        writeln!(
            out,
            "Firmware {}: {} RO:{} Compressed:{} Version: {} Size: {} ({} with padding) \
             Disk Offset: {} (sector {}) Load Address: 0x{:08x} Checksum: 0x{:08x}",
            i + 1,
            fw.fw_type,
            fw.read_only,
            fw.compressed,
            fw.version,
            fw.length,
            fw.paddings,
            fw.disk_offset,
            fw.disk_sector(),
            fw.target_address,
            fw.checksum
        )?;
    }
    Ok(())
}
