// Licensed under the Apache-2.0 license

//! Adding, updating and removing entries of a decoded table.
//!
//! None of these persist anything: callers encode, validate and export the
//! table afterwards.

use std::io::Read;

use log::info;

use crate::checksum::SECTOR_SIZE;
use crate::error::ManageError;
use crate::firmware::FwEntry;
use crate::partition::PartEntry;
use crate::table::FwTable;
use crate::types::FirmwareType;

impl FwTable {
    pub fn find_firmware(&self, fw_type: FirmwareType) -> Option<&FwEntry> {
        self.firmwares.iter().find(|f| f.fw_type == fw_type)
    }

    pub fn find_firmware_mut(&mut self, fw_type: FirmwareType) -> Option<&mut FwEntry> {
        self.firmwares.iter_mut().find(|f| f.fw_type == fw_type)
    }

    fn firmware_index(&self, fw_type: FirmwareType) -> Option<usize> {
        self.firmwares.iter().position(|f| f.fw_type == fw_type)
    }

    /// Appends a read-only, uncompressed version 0 entry for `payload`.
    ///
    /// Firmware types are unique within a table, so an existing entry of the
    /// same type is an error. `sector` is the payload's location on disk in
    /// 512-byte sectors.
    pub fn add_firmware<R: Read>(
        &mut self,
        fw_type: FirmwareType,
        payload: R,
        sector: u32,
        target_address: u32,
    ) -> Result<&FwEntry, ManageError> {
        if self.find_firmware(fw_type).is_some() {
            return Err(ManageError::FirmwareExists(fw_type.to_string()));
        }
        let disk_offset = sector
            .checked_mul(SECTOR_SIZE)
            .ok_or(ManageError::OffsetOverflow(sector))?;

        let mut fw = FwEntry::new(fw_type, disk_offset, target_address);
        fw.compute_from_payload(payload)?;
        info!(
            "adding {} at sector {} ({} bytes, load address 0x{:08x})",
            fw_type, sector, fw.length, target_address
        );
        self.firmwares.push(fw);
        Ok(&self.firmwares[self.firmwares.len() - 1])
    }

    /// Replaces the payload-derived fields of the entry of type `fw_type`.
    ///
    /// Type, version, disk offset and target address are kept.
    pub fn update_firmware<R: Read>(
        &mut self,
        fw_type: FirmwareType,
        payload: R,
    ) -> Result<&FwEntry, ManageError> {
        let fw = self
            .find_firmware_mut(fw_type)
            .ok_or_else(|| ManageError::FirmwareNotFound(fw_type.to_string()))?;
        fw.compute_from_payload(payload)?;
        info!("updated {} ({} bytes)", fw_type, fw.length);
        Ok(&*fw)
    }

    /// Removes the entry of type `fw_type`, keeping the order of the rest.
    pub fn remove_firmware(&mut self, fw_type: FirmwareType) -> Result<FwEntry, ManageError> {
        let index = self
            .firmware_index(fw_type)
            .ok_or_else(|| ManageError::FirmwareNotFound(fw_type.to_string()))?;
        info!("removing firmware {} ({})", index + 1, fw_type);
        Ok(self.firmwares.remove(index))
    }

    /// Removes the partition at the one-based `index`, keeping the order of the rest.
    pub fn remove_partition(&mut self, index: usize) -> Result<PartEntry, ManageError> {
        if index < 1 || index > self.parts.len() {
            return Err(ManageError::PartIndexOutOfRange {
                index,
                count: self.parts.len(),
            });
        }
        info!("removing part {}", index);
        Ok(self.parts.remove(index - 1))
    }
}
