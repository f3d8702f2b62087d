// Licensed under the Apache-2.0 license

use fw_table::{
    DecodeError, EntryList, FilesystemType, FirmwareType, FwTable, PartEntry,
    PartitionType, Segment, ValidationError, HEADER_SIZE, TABLE_SIGNATURE,
};

fn header(part_list_len: u32, fw_list_len: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE);
    bytes.extend_from_slice(TABLE_SIGNATURE);
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.push(1);
    bytes.extend_from_slice(&[0; 7]);
    bytes.extend_from_slice(&512u32.to_le_bytes());
    bytes.extend_from_slice(&part_list_len.to_le_bytes());
    bytes.extend_from_slice(&fw_list_len.to_le_bytes());
    bytes
}

fn sample_table() -> FwTable {
    let mut table = FwTable::new(4);
    let mut root = PartEntry::new(PartitionType::Filesystem, FilesystemType::Ext4, 0x2000_0000);
    root.mount_point = "/".into();
    root.read_only = true;
    root.emmc_part_id = 1;
    let mut data = PartEntry::new(PartitionType::Filesystem, FilesystemType::Ubifs, 0x1000_0000);
    data.mount_point = "/usr/local/etc".into();
    data.emmc_part_id = 2;
    let mut fw_part = PartEntry::new(PartitionType::Firmware, FilesystemType::None, 0x0400_0000);
    fw_part.fw_count = 2;
    table.parts = vec![root, data, fw_part];

    table
        .add_firmware(FirmwareType::Kernel, &[0x11u8; 4000][..], 2048, 0x0300_0000)
        .unwrap();
    table
        .add_firmware(FirmwareType::KernelDeviceTree, &[0x22u8; 100][..], 3072, 0x0160_0000)
        .unwrap();
    table.firmwares[1].compressed = true;
    table.firmwares[1].version = 9;
    table
}

#[test]
fn test_decode_encoded_table() {
    let mut table = sample_table();
    let bytes = table.encode().unwrap().to_bytes();
    assert_eq!(bytes.len(), 512);

    let decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded, table);
    assert_eq!(decoded.signature_str(), "VERONA__");
    assert_eq!(decoded.version, 4);
    assert_eq!(decoded.parts[1].mount_point, "/usr/local/etc");
    assert_eq!(decoded.parts[2].fw_count, 2);
    assert_eq!(decoded.firmwares[0].length, 4000);
    assert_eq!(decoded.firmwares[0].paddings, 4096);
    assert_eq!(decoded.firmwares[0].disk_sector(), 2048);
    assert!(decoded.firmwares[1].compressed);
    assert_eq!(decoded.extra(), 512 - 32 - 3 * 48 - 2 * 32);
    assert!(decoded.validate().is_empty());
}

#[test]
fn test_decode_stops_after_entries() {
    let mut table = sample_table();
    let mut bytes = table.encode().unwrap().to_bytes();
    // Anything after the entries is ignored by the decoder.
    bytes.truncate(HEADER_SIZE + 3 * 48 + 2 * 32);
    let decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded, table);
}

#[test]
fn test_decode_misaligned_part_list() {
    let bytes = header(47, 0);
    match FwTable::decode(bytes.as_slice()) {
        Err(DecodeError::MisalignedLength {
            list,
            length,
            entry_size,
        }) => {
            assert_eq!(list, EntryList::Parts);
            assert_eq!(length, 47);
            assert_eq!(entry_size, 48);
        }
        other => panic!("expected a misaligned length error, got {:?}", other),
    }
}

#[test]
fn test_decode_misaligned_fw_list() {
    let bytes = header(48, 33);
    let err = FwTable::decode(bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::MisalignedLength {
            list: EntryList::Firmwares,
            length: 33,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "firmware entries size is not aligned: 33 is not a multiple of 32"
    );
}

#[test]
fn test_decode_short_header() {
    let bytes = header(0, 0);
    let err = FwTable::decode(&bytes[..20]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::ShortRead {
            segment: Segment::Header,
            expected: 32
        }
    ));
}

#[test]
fn test_decode_short_entry() {
    let mut table = sample_table();
    let bytes = table.encode().unwrap().to_bytes();

    let err = FwTable::decode(&bytes[..HEADER_SIZE + 48 + 10]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::ShortRead {
            segment: Segment::Part(1),
            ..
        }
    ));

    let err = FwTable::decode(&bytes[..HEADER_SIZE + 3 * 48 + 32 + 31]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::ShortRead {
            segment: Segment::Firmware(1),
            ..
        }
    ));
    assert!(err.to_string().contains("firmware 2"));
}

#[test]
fn test_decode_unknown_codes_and_revalidate() {
    let mut table = sample_table();
    let mut bytes = table.encode().unwrap().to_bytes();
    let fw0 = HEADER_SIZE + 3 * 48;
    let part0 = HEADER_SIZE;
    // Rewrite type codes and keep the checksum consistent by hand.
    let old = bytes[fw0] as u32 + bytes[part0] as u32;
    bytes[fw0] = 120;
    bytes[part0] = 7;
    let new = 120 + 7;
    let checksum = table.checksum.wrapping_sub(old).wrapping_add(new);
    bytes[8..12].copy_from_slice(&checksum.to_le_bytes());

    let mut decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.firmwares[0].fw_type, FirmwareType::Invalid(120));
    assert_eq!(decoded.firmwares[0].fw_type.to_string(), "Invalid (120)");
    assert_eq!(decoded.parts[0].part_type, PartitionType::Invalid(7));
    assert!(decoded.validate().is_empty());
    assert!(decoded.encode().is_err());
}

#[test]
fn test_single_byte_corruption_is_detected() {
    let mut table = sample_table();
    let bytes = table.encode().unwrap().to_bytes();
    let content = HEADER_SIZE + 3 * 48 + 2 * 32;

    // The list lengths at 24..32 change how the rest is read, see below.
    for offset in (0..8).chain(12..24).chain(32..content) {
        for mask in [0x01u8, 0x80] {
            let mut corrupted = bytes.clone();
            corrupted[offset] ^= mask;
            let decoded = FwTable::decode(corrupted.as_slice()).unwrap();
            let errors = decoded.validate();
            if offset < 8 {
                assert!(
                    matches!(errors[..], [ValidationError::SignatureMismatch { .. }]),
                    "offset {}: {:?}",
                    offset,
                    errors
                );
            } else {
                assert!(
                    errors
                        .iter()
                        .any(|e| matches!(e, ValidationError::ChecksumMismatch { .. })),
                    "offset {} mask {:#x}: {:?}",
                    offset,
                    mask,
                    errors
                );
            }
        }
    }
}

#[test]
fn test_list_length_corruption_is_detected() {
    let mut table = sample_table();
    let bytes = table.encode().unwrap().to_bytes();

    for offset in 24..32 {
        let mut corrupted = bytes.clone();
        corrupted[offset] ^= 0x01;
        match FwTable::decode(corrupted.as_slice()) {
            Ok(decoded) => assert!(!decoded.validate().is_empty(), "offset {}", offset),
            Err(e) => assert!(
                matches!(
                    e,
                    DecodeError::MisalignedLength { .. } | DecodeError::ShortRead { .. }
                ),
                "offset {}: {}",
                offset,
                e
            ),
        }
    }
}

#[test]
fn test_reserved_header_bytes_are_reported() {
    let mut table = sample_table();
    let mut bytes = table.encode().unwrap().to_bytes();
    bytes[15] = 0xaa;
    let decoded = FwTable::decode(bytes.as_slice()).unwrap();
    let errors = decoded.validate();
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        errors[0],
        ValidationError::ReservedNotZero { reserved } if reserved[2] == 0xaa
    ));
    assert!(matches!(errors[1], ValidationError::ChecksumMismatch { .. }));
}

#[test]
fn test_entry_reserved_bytes_are_checksummed_as_read() {
    let mut table = sample_table();
    let mut bytes = table.encode().unwrap().to_bytes();
    let fw1_reserved = HEADER_SIZE + 3 * 48 + 32 + 26;
    bytes[fw1_reserved] = 3;
    let checksum = table.checksum.wrapping_add(3);
    bytes[8..12].copy_from_slice(&checksum.to_le_bytes());

    let mut decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.firmwares[1].reserved, [3, 0, 0, 0, 0, 0]);
    assert!(decoded.validate().is_empty());

    let encoded = decoded.encode().unwrap().to_bytes();
    assert_eq!(encoded[fw1_reserved], 0);
    assert_eq!(decoded.checksum, table.checksum);
    assert_eq!(decoded.firmwares[1], table.firmwares[1]);
}

/// Replaces the mount point of the first partition, fixing up the checksum.
fn with_first_mount_point(mut bytes: Vec<u8>, mount_point: &[u8]) -> Vec<u8> {
    let field = HEADER_SIZE + 16;
    let old: u32 = bytes[field..field + 32].iter().map(|&b| b as u32).sum();
    bytes[field..field + 32].fill(0);
    bytes[field..field + mount_point.len()].copy_from_slice(mount_point);
    let new: u32 = mount_point.iter().map(|&b| b as u32).sum();
    let stored = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let checksum = stored.wrapping_sub(old).wrapping_add(new);
    bytes[8..12].copy_from_slice(&checksum.to_le_bytes());
    bytes
}

#[test]
fn test_non_utf8_mount_point_round_trips() {
    let mut table = sample_table();
    let bytes = with_first_mount_point(table.encode().unwrap().to_bytes(), &[0xff]);

    let mut decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.parts[0].mount_point.as_bytes(), &[0xff]);
    assert_eq!(decoded.parts[0].mount_point.to_string(), "\u{fffd}");
    assert!(decoded.validate().is_empty());
    assert_eq!(decoded.encode().unwrap().to_bytes(), bytes);
}

#[test]
fn test_non_utf8_mount_point_survives_unrelated_edit() {
    let mut table = sample_table();
    let mount_point = [0xe9u8; 20];
    let bytes = with_first_mount_point(table.encode().unwrap().to_bytes(), &mount_point);

    let mut decoded = FwTable::decode(bytes.as_slice()).unwrap();
    assert!(decoded.validate().is_empty());
    decoded
        .add_firmware(FirmwareType::Tee, &[5u8; 64][..], 8192, 0x0800_0000)
        .unwrap();
    let rewritten = decoded.encode().unwrap().to_bytes();
    let field = HEADER_SIZE + 16;
    assert_eq!(&rewritten[field..field + 20], &mount_point);
    assert_eq!(rewritten[field + 20], 0);
    assert!(FwTable::decode(rewritten.as_slice())
        .unwrap()
        .validate()
        .is_empty());
}
