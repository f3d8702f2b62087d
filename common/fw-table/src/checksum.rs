// Licensed under the Apache-2.0 license

//! Byte-sum checksum and sector arithmetic shared by the table and its entries.

/// Storage alignment unit for table sizes, payload paddings and disk offsets.
pub const SECTOR_SIZE: u32 = 512;

/// Adds every byte of `data` to `seed` with 32-bit wraparound.
///
/// This is not a CRC: the result only depends on the multiset of bytes, so
/// callers chain segments by passing the previous result as the seed.
pub fn sum(data: &[u8], seed: u32) -> u32 {
    data.iter()
        .fold(seed, |acc, &byte| acc.wrapping_add(byte as u32))
}

/// Running byte-sum over a stream of chunks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    value: u32,
    len: u64,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.value = sum(data, self.value);
        self.len += data.len() as u64;
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Number of bytes accumulated so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Rounds `size` up to the next sector boundary.
///
/// An exact multiple still moves to the following sector (512 -> 1024).
pub const fn round_up_sector(size: u64) -> u64 {
    size + SECTOR_SIZE as u64 - (size % SECTOR_SIZE as u64)
}
