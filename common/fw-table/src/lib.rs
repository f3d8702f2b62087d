// Licensed under the Apache-2.0 license

//! Codec for the `VERONA__` firmware table read by the bootloader.
//!
//! The table is a 32-byte header, an array of 48-byte partition entries and
//! an array of 32-byte firmware entries, zero-padded to a multiple of 512
//! bytes. All integers are little-endian. A 32-bit byte-sum covers everything
//! after the header's checksum field.

pub mod checksum;
pub mod error;
pub mod firmware;
mod manage;
pub mod partition;
pub mod table;
pub mod types;

pub use checksum::SECTOR_SIZE;
pub use error::{
    DecodeError, EncodeError, EntryList, ExportError, ManageError, PayloadError, Segment,
    UnknownName, ValidationError,
};
pub use firmware::{FwEntry, PayloadInfo, FW_ENTRY_SIZE};
pub use partition::{MountPoint, PartEntry, MOUNT_POINT_MAX_LEN, PART_ENTRY_SIZE};
pub use table::{EncodedTable, FwTable, HEADER_SIZE, TABLE_SIGNATURE};
pub use types::{
    FilesystemType, FirmwareType, PartitionType, FILESYSTEM_TYPE_NAMES, FIRMWARE_TYPE_NAMES,
    PARTITION_TYPE_NAMES,
};
