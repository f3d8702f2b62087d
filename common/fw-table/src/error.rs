// Licensed under the Apache-2.0 license

use std::fmt;
use std::io;

use thiserror::Error;

/// A fixed-size piece of the on-disk table, used to locate I/O failures.
///
/// Entry indices are zero-based, as they appear in the table's arrays, and
/// displayed one-based to match how the command line addresses entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Part(usize),
    Firmware(usize),
    Padding,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Header => write!(f, "header"),
            Segment::Part(i) => write!(f, "part {}", i + 1),
            Segment::Firmware(i) => write!(f, "firmware {}", i + 1),
            Segment::Padding => write!(f, "padding"),
        }
    }
}

/// Which entry array of the table a length belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryList {
    Parts,
    Firmwares,
}

impl fmt::Display for EntryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryList::Parts => write!(f, "partition"),
            EntryList::Firmwares => write!(f, "firmware"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("short read in {segment}: stream ended before {expected} bytes were read")]
    ShortRead { segment: Segment, expected: usize },
    #[error("read {segment}: {source}")]
    Io {
        segment: Segment,
        #[source]
        source: io::Error,
    },
    #[error("{list} entries size is not aligned: {length} is not a multiple of {entry_size}")]
    MisalignedLength {
        list: EntryList,
        length: u32,
        entry_size: usize,
    },
}

/// One independent problem found by [`crate::FwTable::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Signature does not match, found '{found}' expected '{expected}'")]
    SignatureMismatch { found: String, expected: String },
    #[error("non-zero data on table header reserved field")]
    ReservedNotZero { reserved: [u8; 7] },
    #[error("Checksum does not match, found 0x{stored:08x} expected 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid firmware type '{0}'")]
    InvalidFirmwareType(String),
    #[error("invalid partition type '{0}'")]
    InvalidPartitionType(String),
    #[error("invalid filesystem type '{0}'")]
    InvalidFilesystemType(String),
    #[error("mount point '{mount_point}' too long ({len}, max is {max})")]
    MountPointTooLong {
        mount_point: String,
        len: usize,
        max: usize,
    },
    #[error("mount point '{mount_point}' has a NUL byte at offset {offset}")]
    MountPointHasNul { mount_point: String, offset: usize },
    #[error("table of {size} bytes does not fit the header's 32-bit size fields")]
    TableTooLarge { size: u64 },
    #[error("part {} - {source}", .index + 1)]
    Part {
        index: usize,
        #[source]
        source: Box<EncodeError>,
    },
    #[error("firmware {} - {source}", .index + 1)]
    Firmware {
        index: usize,
        #[source]
        source: Box<EncodeError>,
    },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("partial write in {segment} (wrote {written} out of {expected} bytes)")]
    ShortWrite {
        segment: Segment,
        written: usize,
        expected: usize,
    },
    #[error("error writing {segment}: {source}")]
    Io {
        segment: Segment,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("error reading at {offset} mark: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("payload of {len} bytes does not fit in a firmware entry")]
    TooLarge { len: u64 },
}

#[derive(Error, Debug)]
pub enum ManageError {
    #[error("there is already one firmware of type {0}; either update or remove it before adding")]
    FirmwareExists(String),
    #[error("could not find a firmware entry with type '{0}'")]
    FirmwareNotFound(String),
    #[error("invalid part index {index} (table has {count} parts)")]
    PartIndexOutOfRange { index: usize, count: usize },
    #[error("sector {0} is beyond the addressable disk offset range")]
    OffsetOverflow(u32),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Returned by `FromStr` on the enumeration types for names outside their table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}
