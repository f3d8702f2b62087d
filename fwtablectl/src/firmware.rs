// Licensed under the Apache-2.0 license

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use fw_table::{FirmwareType, ManageError, FIRMWARE_TYPE_NAMES};

use crate::table_file::{read_table, write_table};

fn open_image(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("error opening file '{}'", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn new(
    table_path: &Path,
    fw_type: FirmwareType,
    image: &Path,
    sector: u32,
    load_address: u32,
) -> Result<()> {
    let mut table = read_table(table_path)?;
    if table.find_firmware(fw_type).is_some() {
        return Err(ManageError::FirmwareExists(fw_type.to_string()).into());
    }
    let payload = open_image(image)?;
    table
        .add_firmware(fw_type, payload, sector, load_address)
        .with_context(|| format!("error reading '{}'", image.display()))?;
    write_table(table_path, &mut table)
}

pub fn update(table_path: &Path, fw_type: FirmwareType, image: &Path) -> Result<()> {
    let mut table = read_table(table_path)?;
    if table.find_firmware(fw_type).is_none() {
        bail!("could not find an entry for type {fw_type}; use 'firmware new' to create it");
    }
    let payload = open_image(image)?;
    table
        .update_firmware(fw_type, payload)
        .with_context(|| format!("error reading '{}'", image.display()))?;
    write_table(table_path, &mut table)
}

pub fn remove(table_path: &Path, fw_type: FirmwareType) -> Result<()> {
    let mut table = read_table(table_path)?;
    table.remove_firmware(fw_type)?;
    write_table(table_path, &mut table)
}

pub fn types(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Firmware Types:")?;
    for name in FIRMWARE_TYPE_NAMES {
        writeln!(out, "  {name}")?;
    }
    Ok(())
}
