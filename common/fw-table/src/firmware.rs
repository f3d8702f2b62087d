// Licensed under the Apache-2.0 license

use std::io::{ErrorKind, Read};

use log::trace;
use serde::Serialize;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::checksum::{round_up_sector, Checksum, SECTOR_SIZE};
use crate::error::{EncodeError, PayloadError};
use crate::types::FirmwareType;

pub const FW_ENTRY_SIZE: usize = 32;

const LZMA_BIT: u8 = 1 << 6;
const READ_ONLY_BIT: u8 = 1 << 7;

/// On-disk firmware entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RawFwEntry {
    pub fw_type: u8,
    pub options: u8,
    pub version: U32<LittleEndian>,
    pub target_address: U32<LittleEndian>,
    pub disk_offset: U32<LittleEndian>,
    pub length: U32<LittleEndian>,
    pub paddings: U32<LittleEndian>,
    pub checksum: U32<LittleEndian>,
    pub reserved: [u8; 6],
}

const _: () = assert!(core::mem::size_of::<RawFwEntry>() == FW_ENTRY_SIZE);

/// Values derived from scanning a firmware payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadInfo {
    pub length: u32,
    pub paddings: u32,
    pub checksum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FwEntry {
    pub fw_type: FirmwareType,
    /// Payload is LZMA compressed. Recorded only; nothing here decompresses it.
    pub compressed: bool,
    pub read_only: bool,
    pub version: u32,
    pub target_address: u32,
    pub disk_offset: u32,
    pub length: u32,
    pub paddings: u32,
    pub checksum: u32,
    /// As read from disk; [`FwEntry::encode`] writes both as zero.
    #[serde(skip)]
    pub reserved: [u8; 6],
    /// Option bits other than compressed and read-only.
    #[serde(skip)]
    pub reserved_options: u8,
}

impl FwEntry {
    /// A read-only, uncompressed version 0 entry with no payload yet.
    pub fn new(fw_type: FirmwareType, disk_offset: u32, target_address: u32) -> Self {
        Self {
            fw_type,
            compressed: false,
            read_only: true,
            version: 0,
            target_address,
            disk_offset,
            length: 0,
            paddings: 0,
            checksum: 0,
            reserved: [0; 6],
            reserved_options: 0,
        }
    }

    pub fn disk_sector(&self) -> u32 {
        self.disk_offset / SECTOR_SIZE
    }

    pub fn from_raw(raw: &RawFwEntry) -> Self {
        Self {
            fw_type: FirmwareType::from(raw.fw_type),
            compressed: raw.options & LZMA_BIT != 0,
            read_only: raw.options & READ_ONLY_BIT != 0,
            version: raw.version.get(),
            target_address: raw.target_address.get(),
            disk_offset: raw.disk_offset.get(),
            length: raw.length.get(),
            paddings: raw.paddings.get(),
            checksum: raw.checksum.get(),
            reserved: raw.reserved,
            reserved_options: raw.options & !(LZMA_BIT | READ_ONLY_BIT),
        }
    }

    pub fn decode(bytes: &[u8; FW_ENTRY_SIZE]) -> Self {
        let raw: RawFwEntry = zerocopy::transmute!(*bytes);
        Self::from_raw(&raw)
    }

    pub fn to_raw(&self) -> RawFwEntry {
        let mut options = self.reserved_options;
        if self.compressed {
            options |= LZMA_BIT;
        }
        if self.read_only {
            options |= READ_ONLY_BIT;
        }
        RawFwEntry {
            fw_type: self.fw_type.code(),
            options,
            version: U32::new(self.version),
            target_address: U32::new(self.target_address),
            disk_offset: U32::new(self.disk_offset),
            length: U32::new(self.length),
            paddings: U32::new(self.paddings),
            checksum: U32::new(self.checksum),
            reserved: self.reserved,
        }
    }

    pub fn encode(&self) -> Result<[u8; FW_ENTRY_SIZE], EncodeError> {
        if !self.fw_type.is_known() {
            return Err(EncodeError::InvalidFirmwareType(self.fw_type.to_string()));
        }
        let mut clean = self.clone();
        clean.clear_reserved();
        Ok(zerocopy::transmute!(clean.to_raw()))
    }

    /// Zeroes every byte [`FwEntry::encode`] writes as zero.
    pub fn clear_reserved(&mut self) {
        self.reserved = [0; 6];
        self.reserved_options = 0;
    }

    /// Rescans the payload and replaces `length`, `paddings` and `checksum`.
    ///
    /// The entry is left untouched if reading fails.
    pub fn compute_from_payload<R: Read>(&mut self, payload: R) -> Result<(), PayloadError> {
        let info = scan_payload(payload)?;
        trace!(
            "{}: payload {} bytes ({} padded), checksum 0x{:08x}",
            self.fw_type,
            info.length,
            info.paddings,
            info.checksum
        );
        self.length = info.length;
        self.paddings = info.paddings;
        self.checksum = info.checksum;
        Ok(())
    }
}

/// Reads `payload` to its end, summing its bytes.
pub fn scan_payload<R: Read>(mut payload: R) -> Result<PayloadInfo, PayloadError> {
    let mut checksum = Checksum::new();
    let mut buffer = [0u8; 8192];
    loop {
        match payload.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => checksum.update(&buffer[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(PayloadError::Read {
                    offset: checksum.len(),
                    source,
                })
            }
        }
    }

    let len = checksum.len();
    let padded = round_up_sector(len);
    match (u32::try_from(len), u32::try_from(padded)) {
        (Ok(length), Ok(paddings)) => Ok(PayloadInfo {
            length,
            paddings,
            checksum: checksum.value(),
        }),
        _ => Err(PayloadError::TooLarge { len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Yields `good` bytes of 0x01, then fails with `kind`.
    struct FailingReader {
        good: usize,
        kind: ErrorKind,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::new(self.kind, "device went away"));
            }
            let n = buf.len().min(self.good);
            buf[..n].fill(1);
            self.good -= n;
            Ok(n)
        }
    }

    fn kernel() -> FwEntry {
        FwEntry {
            fw_type: FirmwareType::Kernel,
            compressed: true,
            read_only: true,
            version: 7,
            target_address: 0x0200_0000,
            disk_offset: 67584 * 512,
            length: 1000,
            paddings: 1024,
            checksum: 0xdead_beef,
            reserved: [0; 6],
            reserved_options: 0,
        }
    }

    #[test]
    fn test_encode_layout() {
        let bytes = kernel().encode().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 0xc0);
        assert_eq!(&bytes[2..6], &7u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &0x0200_0000u32.to_le_bytes());
        assert_eq!(&bytes[10..14], &(67584u32 * 512).to_le_bytes());
        assert_eq!(&bytes[14..18], &1000u32.to_le_bytes());
        assert_eq!(&bytes[18..22], &1024u32.to_le_bytes());
        assert_eq!(&bytes[22..26], &0xdead_beefu32.to_le_bytes());
        assert_eq!(&bytes[26..32], &[0; 6]);
    }

    #[test]
    fn test_option_bits() {
        let mut fw = kernel();
        fw.compressed = true;
        fw.read_only = false;
        assert_eq!(fw.encode().unwrap()[1], 0x40);
        fw.compressed = false;
        fw.read_only = true;
        assert_eq!(fw.encode().unwrap()[1], 0x80);
        fw.read_only = false;
        assert_eq!(fw.encode().unwrap()[1], 0);
    }

    #[test]
    fn test_decode_layout() {
        let bytes = kernel().encode().unwrap();
        let fw = FwEntry::decode(&bytes);
        assert_eq!(fw, kernel());
        assert_eq!(fw.disk_sector(), 67584);
    }

    #[test]
    fn test_unused_option_bits_kept_on_decode() {
        let mut bytes = kernel().encode().unwrap();
        bytes[1] |= 0x21;
        bytes[30] = 0x77;
        let fw = FwEntry::decode(&bytes);
        assert!(fw.compressed);
        assert!(fw.read_only);
        assert_eq!(fw.reserved_options, 0x21);
        assert_eq!(fw.reserved[4], 0x77);
        assert_eq!(fw.to_raw().as_bytes(), bytes.as_slice());
        assert_eq!(fw.encode().unwrap(), kernel().encode().unwrap());
    }

    #[test]
    fn test_unknown_type() {
        let mut bytes = kernel().encode().unwrap();
        bytes[0] = 99;
        let fw = FwEntry::decode(&bytes);
        assert_eq!(fw.fw_type.to_string(), "Invalid (99)");
        assert_eq!(fw.to_raw().as_bytes(), bytes.as_slice());
        assert_eq!(
            fw.encode(),
            Err(EncodeError::InvalidFirmwareType("Invalid (99)".to_string()))
        );
    }

    #[test]
    fn test_scan_payload() {
        let info = scan_payload(&[1u8, 2, 3, 250][..]).unwrap();
        assert_eq!(
            info,
            PayloadInfo {
                length: 4,
                paddings: 512,
                checksum: 256,
            }
        );
    }

    #[test]
    fn test_scan_payload_exact_sector_rounds_up() {
        let info = scan_payload(&[0xffu8; 512][..]).unwrap();
        assert_eq!(info.length, 512);
        assert_eq!(info.paddings, 1024);
        assert_eq!(info.checksum, 512 * 0xff);

        let info = scan_payload(io::empty()).unwrap();
        assert_eq!(info.length, 0);
        assert_eq!(info.paddings, 512);
        assert_eq!(info.checksum, 0);
    }

    #[test]
    fn test_scan_payload_reports_failure_offset() {
        let reader = FailingReader {
            good: 10000,
            kind: ErrorKind::Other,
        };
        match scan_payload(reader) {
            Err(PayloadError::Read { offset, source }) => {
                assert_eq!(offset, 10000);
                assert_eq!(source.kind(), ErrorKind::Other);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_compute_from_payload_keeps_entry_on_error() {
        let mut fw = kernel();
        let reader = FailingReader {
            good: 3,
            kind: ErrorKind::BrokenPipe,
        };
        assert!(fw.compute_from_payload(reader).is_err());
        assert_eq!(fw, kernel());

        fw.compute_from_payload(&b"hello"[..]).unwrap();
        assert_eq!(fw.length, 5);
        assert_eq!(fw.paddings, 512);
        assert_eq!(fw.checksum, b"hello".iter().map(|&b| b as u32).sum::<u32>());
        assert_eq!(fw.version, 7);
        assert_eq!(fw.disk_offset, 67584 * 512);
    }
}
