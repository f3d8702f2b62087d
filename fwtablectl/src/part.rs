// Licensed under the Apache-2.0 license

use std::path::Path;

use anyhow::Result;

use crate::table_file::{read_table, write_table};

pub fn remove(table_path: &Path, index: usize) -> Result<()> {
    let mut table = read_table(table_path)?;
    table.remove_partition(index)?;
    write_table(table_path, &mut table)
}
