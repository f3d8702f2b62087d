// Licensed under the Apache-2.0 license

use core::mem::offset_of;
use std::borrow::Cow;
use std::io::{ErrorKind, Read, Write};

use log::{debug, trace, warn};
use serde::{Serialize, Serializer};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::checksum::{round_up_sector, sum, SECTOR_SIZE};
use crate::error::{DecodeError, EncodeError, EntryList, ExportError, Segment, ValidationError};
use crate::firmware::{FwEntry, FW_ENTRY_SIZE};
use crate::partition::{PartEntry, PART_ENTRY_SIZE};

pub const TABLE_SIGNATURE: &[u8; 8] = b"VERONA__";
pub const HEADER_SIZE: usize = 32;

/// On-disk table header.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RawHeader {
    pub signature: [u8; 8],
    pub checksum: U32<LittleEndian>,
    pub version: u8,
    pub reserved: [u8; 7],
    pub total_size: U32<LittleEndian>,
    pub part_list_len: U32<LittleEndian>,
    pub fw_list_len: U32<LittleEndian>,
}

const _: () = assert!(core::mem::size_of::<RawHeader>() == HEADER_SIZE);

/// First header byte covered by the table checksum.
const CHECKSUM_START: usize = offset_of!(RawHeader, version);

/// Firmware table: a header followed by the partition and firmware arrays,
/// zero-padded to a sector multiple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FwTable {
    #[serde(serialize_with = "serialize_signature")]
    pub signature: [u8; 8],
    /// Stored checksum; recomputed by [`FwTable::encode`].
    pub checksum: u32,
    pub version: u8,
    #[serde(skip)]
    pub reserved: [u8; 7],
    /// Size of the whole on-disk table; recomputed by [`FwTable::encode`].
    pub total_size: u32,
    /// Partitions are addressed by position, so their order is kept as is.
    pub parts: Vec<PartEntry>,
    pub firmwares: Vec<FwEntry>,
}

fn serialize_signature<S>(signature: &[u8; 8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(signature))
}

impl FwTable {
    /// An empty table carrying the expected signature.
    pub fn new(version: u8) -> Self {
        Self {
            signature: *TABLE_SIGNATURE,
            checksum: 0,
            version,
            reserved: [0; 7],
            total_size: SECTOR_SIZE,
            parts: Vec::new(),
            firmwares: Vec::new(),
        }
    }

    pub fn decode<R: Read>(mut reader: R) -> Result<Self, DecodeError> {
        let mut header = [0u8; HEADER_SIZE];
        read_block(&mut reader, &mut header, Segment::Header)?;
        let header: RawHeader = zerocopy::transmute!(header);

        let part_count = entry_count(
            header.part_list_len.get(),
            PART_ENTRY_SIZE,
            EntryList::Parts,
        )?;
        let fw_count = entry_count(
            header.fw_list_len.get(),
            FW_ENTRY_SIZE,
            EntryList::Firmwares,
        )?;
        debug!(
            "decoding table: size {}, {} parts, {} firmwares",
            header.total_size.get(),
            part_count,
            fw_count
        );

        let mut parts = Vec::new();
        for index in 0..part_count {
            let mut block = [0u8; PART_ENTRY_SIZE];
            read_block(&mut reader, &mut block, Segment::Part(index))?;
            let part = PartEntry::decode(&block);
            trace!("part {}: {:?}", index + 1, part);
            parts.push(part);
        }

        let mut firmwares = Vec::new();
        for index in 0..fw_count {
            let mut block = [0u8; FW_ENTRY_SIZE];
            read_block(&mut reader, &mut block, Segment::Firmware(index))?;
            let fw = FwEntry::decode(&block);
            trace!("firmware {}: {:?}", index + 1, fw);
            firmwares.push(fw);
        }

        let table = Self {
            signature: header.signature,
            checksum: header.checksum.get(),
            version: header.version,
            reserved: header.reserved,
            total_size: header.total_size.get(),
            parts,
            firmwares,
        };
        if table.extra() < 0 {
            warn!(
                "table size {} is smaller than its {} bytes of entries",
                table.total_size,
                table.content_size()
            );
        }
        Ok(table)
    }

    pub fn signature_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.signature)
    }

    pub fn part_list_len(&self) -> u64 {
        self.parts.len() as u64 * PART_ENTRY_SIZE as u64
    }

    pub fn fw_list_len(&self) -> u64 {
        self.firmwares.len() as u64 * FW_ENTRY_SIZE as u64
    }

    /// Header plus both entry arrays, without the trailing padding.
    pub fn content_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.part_list_len() + self.fw_list_len()
    }

    /// Trailing zero padding implied by `total_size`.
    ///
    /// Only negative for a corrupted header.
    pub fn extra(&self) -> i64 {
        self.total_size as i64 - self.content_size() as i64
    }

    fn raw_header(&self) -> RawHeader {
        RawHeader {
            signature: self.signature,
            checksum: U32::new(self.checksum),
            version: self.version,
            reserved: self.reserved,
            total_size: U32::new(self.total_size),
            part_list_len: U32::new(saturate(self.part_list_len())),
            fw_list_len: U32::new(saturate(self.fw_list_len())),
        }
    }

    /// Checksum of the table as currently held in memory.
    pub fn compute_checksum(&self) -> u32 {
        let header = self.raw_header();
        let mut cs = sum(&header.as_bytes()[CHECKSUM_START..], 0);
        for part in &self.parts {
            cs = sum(part.to_raw().as_bytes(), cs);
        }
        for fw in &self.firmwares {
            cs = sum(fw.to_raw().as_bytes(), cs);
        }
        cs
    }

    /// Returns every problem found; an empty list means the table is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if &self.signature != TABLE_SIGNATURE {
            errors.push(ValidationError::SignatureMismatch {
                found: self.signature_str().into_owned(),
                expected: String::from_utf8_lossy(TABLE_SIGNATURE).into_owned(),
            });
        }
        if self.reserved.iter().any(|&b| b != 0) {
            errors.push(ValidationError::ReservedNotZero {
                reserved: self.reserved,
            });
        }
        let computed = self.compute_checksum();
        if computed != self.checksum {
            errors.push(ValidationError::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        errors
    }

    /// Recomputes sizes and checksum and serializes the table.
    ///
    /// Reserved bytes and unused option bits in the header and in every entry
    /// are cleared. Nothing
    /// in `self` changes if an entry fails to encode.
    pub fn encode(&mut self) -> Result<EncodedTable, EncodeError> {
        let total_size = sector_total_size(self.content_size())?;
        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(index, part)| {
                part.encode().map_err(|e| EncodeError::Part {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let firmwares = self
            .firmwares
            .iter()
            .enumerate()
            .map(|(index, fw)| {
                fw.encode().map_err(|e| EncodeError::Firmware {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.reserved = [0; 7];
        self.parts.iter_mut().for_each(PartEntry::clear_reserved);
        self.firmwares.iter_mut().for_each(FwEntry::clear_reserved);
        self.total_size = total_size;
        self.checksum = 0;

        // The checksum covers the header's own final form, so the header is
        // laid out once with a zero checksum and again with the result.
        let mut cs = sum(&self.raw_header().as_bytes()[CHECKSUM_START..], 0);
        for block in &parts {
            cs = sum(block, cs);
        }
        for block in &firmwares {
            cs = sum(block, cs);
        }
        self.checksum = cs;
        debug!(
            "encoded table: size {}, extra {}, checksum 0x{:08x}",
            self.total_size,
            self.extra(),
            self.checksum
        );

        Ok(EncodedTable {
            header: zerocopy::transmute!(self.raw_header()),
            parts,
            firmwares,
            total_size: self.total_size,
        })
    }
}

fn entry_count(length: u32, entry_size: usize, list: EntryList) -> Result<usize, DecodeError> {
    let length_bytes = length as usize;
    if length_bytes % entry_size != 0 {
        return Err(DecodeError::MisalignedLength {
            list,
            length,
            entry_size,
        });
    }
    Ok(length_bytes / entry_size)
}

fn read_block<R: Read>(
    reader: &mut R,
    block: &mut [u8],
    segment: Segment,
) -> Result<(), DecodeError> {
    reader.read_exact(block).map_err(|source| {
        if source.kind() == ErrorKind::UnexpectedEof {
            DecodeError::ShortRead {
                segment,
                expected: block.len(),
            }
        } else {
            DecodeError::Io { segment, source }
        }
    })
}

/// Serialized form of a [`FwTable`], produced by [`FwTable::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTable {
    header: [u8; HEADER_SIZE],
    parts: Vec<[u8; PART_ENTRY_SIZE]>,
    firmwares: Vec<[u8; FW_ENTRY_SIZE]>,
    total_size: u32,
}

impl EncodedTable {
    pub fn header(&self) -> &[u8; HEADER_SIZE] {
        &self.header
    }

    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    fn padding_len(&self) -> usize {
        self.total_size as usize
            - HEADER_SIZE
            - self.parts.len() * PART_ENTRY_SIZE
            - self.firmwares.len() * FW_ENTRY_SIZE
    }

    /// The complete on-disk image, padding included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_size as usize);
        out.extend_from_slice(&self.header);
        self.parts.iter().for_each(|p| out.extend_from_slice(p));
        self.firmwares.iter().for_each(|f| out.extend_from_slice(f));
        out.resize(self.total_size as usize, 0);
        out
    }

    /// Writes header, partitions, firmwares and padding, one write per segment.
    ///
    /// A write that accepts fewer bytes than offered is an error, not retried.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        write_segment(&mut writer, &self.header, Segment::Header)?;
        for (index, part) in self.parts.iter().enumerate() {
            write_segment(&mut writer, part, Segment::Part(index))?;
        }
        for (index, fw) in self.firmwares.iter().enumerate() {
            write_segment(&mut writer, fw, Segment::Firmware(index))?;
        }
        let padding = vec![0u8; self.padding_len()];
        write_segment(&mut writer, &padding, Segment::Padding)?;
        writer.flush().map_err(|source| ExportError::Io {
            segment: Segment::Padding,
            source,
        })
    }
}

fn write_segment<W: Write>(
    writer: &mut W,
    data: &[u8],
    segment: Segment,
) -> Result<(), ExportError> {
    let written = writer
        .write(data)
        .map_err(|source| ExportError::Io { segment, source })?;
    if written != data.len() {
        return Err(ExportError::ShortWrite {
            segment,
            written,
            expected: data.len(),
        });
    }
    Ok(())
}

/// `total_size` for `content_size` bytes of header and entries.
///
/// The entry list lengths never exceed it, so it also bounds them.
fn sector_total_size(content_size: u64) -> Result<u32, EncodeError> {
    u32::try_from(round_up_sector(content_size))
        .map_err(|_| EncodeError::TableTooLarge { size: content_size })
}

fn saturate(len: u64) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
