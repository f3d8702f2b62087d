// Licensed under the Apache-2.0 license

use std::fmt;

use serde::{Serialize, Serializer};
use zerocopy::byteorder::{LittleEndian, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::EncodeError;
use crate::types::{FilesystemType, PartitionType};

pub const PART_ENTRY_SIZE: usize = 48;

/// Longest mount point that still leaves room for a terminating NUL.
pub const MOUNT_POINT_MAX_LEN: usize = 31;

const READ_ONLY_BIT: u8 = 1 << 7;

/// On-disk partition entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RawPartEntry {
    pub part_type: u8,
    pub options: u8,
    pub length: U64<LittleEndian>,
    pub fw_count: u8,
    pub fs_type: u8,
    pub emmc_part_id: u8,
    pub reserved: [u8; 3],
    pub mount_point: [u8; 32],
}

const _: () = assert!(core::mem::size_of::<RawPartEntry>() == PART_ENTRY_SIZE);

/// Mount point bytes up to, not including, the terminating NUL.
///
/// The bytes are kept as stored, so a mount point that is not UTF-8 still
/// lays out unchanged. Displayed and serialized lossily.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPoint(Vec<u8>);

impl MountPoint {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for MountPoint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MountPoint {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for MountPoint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for MountPoint {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for MountPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartEntry {
    pub part_type: PartitionType,
    pub read_only: bool,
    pub length: u64,
    /// Number of firmware entries stored in this partition, kept by the caller.
    pub fw_count: u8,
    pub fs_type: FilesystemType,
    pub emmc_part_id: u8,
    pub mount_point: MountPoint,
    /// Fields below hold bytes with no meaning as read from disk, so that a
    /// decoded entry lays out exactly as it was read. [`PartEntry::encode`]
    /// always writes them as zero.
    #[serde(skip)]
    pub reserved: [u8; 3],
    /// Option bits other than read-only.
    #[serde(skip)]
    pub reserved_options: u8,
    /// Mount point field bytes after the terminating NUL, at their field offset.
    #[serde(skip)]
    pub mount_point_tail: [u8; 32],
}

impl PartEntry {
    pub fn new(part_type: PartitionType, fs_type: FilesystemType, length: u64) -> Self {
        Self {
            part_type,
            read_only: false,
            length,
            fw_count: 0,
            fs_type,
            emmc_part_id: 0,
            mount_point: MountPoint::default(),
            reserved: [0; 3],
            reserved_options: 0,
            mount_point_tail: [0; 32],
        }
    }

    pub fn from_raw(raw: &RawPartEntry) -> Self {
        let mount_len = raw
            .mount_point
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(raw.mount_point.len());
        let mut mount_point_tail = [0u8; 32];
        if mount_len < raw.mount_point.len() {
            mount_point_tail[mount_len + 1..].copy_from_slice(&raw.mount_point[mount_len + 1..]);
        }
        Self {
            part_type: PartitionType::from(raw.part_type),
            read_only: raw.options & READ_ONLY_BIT != 0,
            length: raw.length.get(),
            fw_count: raw.fw_count,
            fs_type: FilesystemType::from(raw.fs_type),
            emmc_part_id: raw.emmc_part_id,
            mount_point: MountPoint::new(&raw.mount_point[..mount_len]),
            reserved: raw.reserved,
            reserved_options: raw.options & !READ_ONLY_BIT,
            mount_point_tail,
        }
    }

    pub fn decode(bytes: &[u8; PART_ENTRY_SIZE]) -> Self {
        let raw: RawPartEntry = zerocopy::transmute!(*bytes);
        Self::from_raw(&raw)
    }

    /// Lays the entry out as stored, without checking any field.
    ///
    /// A mount point longer than the field is cut at 32 bytes.
    pub fn to_raw(&self) -> RawPartEntry {
        let mut mount_point = [0u8; 32];
        let text = self.mount_point.as_bytes();
        let len = text.len().min(mount_point.len());
        mount_point[..len].copy_from_slice(&text[..len]);
        for (i, &b) in self.mount_point_tail.iter().enumerate().skip(len + 1) {
            mount_point[i] = b;
        }
        let mut options = self.reserved_options;
        if self.read_only {
            options |= READ_ONLY_BIT;
        }
        RawPartEntry {
            part_type: self.part_type.code(),
            options,
            length: U64::new(self.length),
            fw_count: self.fw_count,
            fs_type: self.fs_type.code(),
            emmc_part_id: self.emmc_part_id,
            reserved: self.reserved,
            mount_point,
        }
    }

    pub fn encode(&self) -> Result<[u8; PART_ENTRY_SIZE], EncodeError> {
        if !self.part_type.is_known() {
            return Err(EncodeError::InvalidPartitionType(
                self.part_type.to_string(),
            ));
        }
        if !self.fs_type.is_known() {
            return Err(EncodeError::InvalidFilesystemType(self.fs_type.to_string()));
        }
        let len = self.mount_point.len();
        if len > MOUNT_POINT_MAX_LEN {
            return Err(EncodeError::MountPointTooLong {
                mount_point: self.mount_point.to_string(),
                len,
                max: MOUNT_POINT_MAX_LEN,
            });
        }
        if let Some(offset) = self.mount_point.as_bytes().iter().position(|&b| b == 0) {
            return Err(EncodeError::MountPointHasNul {
                mount_point: self.mount_point.to_string(),
                offset,
            });
        }
        let mut clean = self.clone();
        clean.clear_reserved();
        Ok(zerocopy::transmute!(clean.to_raw()))
    }

    /// Zeroes every byte [`PartEntry::encode`] writes as zero.
    pub fn clear_reserved(&mut self) {
        self.reserved = [0; 3];
        self.reserved_options = 0;
        self.mount_point_tail = [0; 32];
    }
}
