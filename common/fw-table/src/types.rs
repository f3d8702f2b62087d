// Licensed under the Apache-2.0 license

//! Code tables for firmware, partition and filesystem types.
//!
//! Each table is ordered: a name's position is its on-disk code. Codes past
//! the end of a table decode to an `Invalid(code)` value instead of failing,
//! so a table written by a newer tool can still be read and re-checksummed.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Serialize, Serializer};

use crate::error::UnknownName;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $names:ident ($kind:literal) {
            $($variant:ident = $code:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
        #[repr(u8)]
        $vis enum $name {
            $($variant = $code,)+
            #[num_enum(catch_all)]
            Invalid(u8),
        }

        /// Known names, indexed by code.
        $vis const $names: &[&str] = &[$($text,)+];

        impl $name {
            /// Every known value, in code order.
            pub const KNOWN: &'static [$name] = &[$($name::$variant,)+];

            pub fn code(self) -> u8 {
                self.into()
            }

            pub fn is_known(self) -> bool {
                !matches!(self, $name::Invalid(_))
            }

            pub fn name(self) -> Cow<'static, str> {
                match self {
                    $($name::$variant => Cow::Borrowed($text),)+
                    $name::Invalid(code) => Cow::Owned(format!("Invalid ({})", code)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.name())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                match input {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownName {
                        kind: $kind,
                        name: input.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.name())
            }
        }
    };
}

coded_enum! {
    /// Kind of image a firmware entry points at.
    pub enum FirmwareType: FIRMWARE_TYPE_NAMES ("firmware type") {
        Reserved = 0 => "Reserved",
        Bootcode = 1 => "Bootcode",
        Kernel = 2 => "Kernel",
        RescueDeviceTree = 3 => "RescueDeviceTree",
        KernelDeviceTree = 4 => "KernelDeviceTree",
        RescueRootFs = 5 => "RescueRootFS",
        KernelRootFs = 6 => "KernelRootFS",
        Audio = 7 => "Audio",
        AudioFile = 8 => "AudioFile",
        VideoFile = 9 => "VideoFile",
        Ext4 = 10 => "Ext4",
        Ubifs = 11 => "Ubifs",
        Squash = 12 => "Squash",
        Ext3 = 13 => "Ext3",
        Odd = 14 => "Odd",
        Yaffs2 = 15 => "YAFFS2",
        Iso = 16 => "ISO",
        Swap = 17 => "Swap",
        Ntfs = 18 => "NTFS",
        Jffs2 = 19 => "JFFS2",
        ImageFile = 20 => "ImageFile",
        ImageFile1 = 21 => "ImageFile1",
        ImageFile2 = 22 => "ImageFile2",
        AudioFile1 = 23 => "AudioFile1",
        AudioFile2 = 24 => "AudioFile2",
        VideoFile1 = 25 => "VideoFile1",
        VideoFile2 = 26 => "VideoFile2",
        Video = 27 => "Video",
        Video2 = 28 => "Video2",
        ECpu = 29 => "eCPU",
        Tee = 30 => "Tee",
        GoldKernel = 31 => "GoldKernel",
        GoldRescueDeviceTree = 32 => "GoldRescueDeviceTree",
        GoldRescueRootFs = 33 => "GoldRescueRootfs",
        GoldAudio = 34 => "GoldAudio",
        GoldTee = 35 => "GoldTee",
        Config = 36 => "Config",
        UBoot = 37 => "uBoot",
        Bl31 = 38 => "BL31",
        Hypervisor = 39 => "Hypervisor",
        GoldBl31 = 40 => "GoldBL31",
        RsaKeyFw = 41 => "RSAKeyFW",
        RsaKeyTee = 42 => "RSAKeyTee",
        RescueKernel = 43 => "RescueKernel",
        RescueAudio = 44 => "RescueAudio",
        RescueConfig = 45 => "RescueConfig",
        Unknown = 46 => "Unknown",
    }
}

coded_enum! {
    /// Role of a partition on the storage medium.
    pub enum PartitionType: PARTITION_TYPE_NAMES ("partition type") {
        Reserved = 0 => "reserved",
        Firmware = 1 => "firmware",
        Filesystem = 2 => "filesystem",
    }
}

coded_enum! {
    /// Filesystem stored in a partition.
    pub enum FilesystemType: FILESYSTEM_TYPE_NAMES ("filesystem type") {
        Jffs2 = 0 => "jffs2",
        Yaffs2 = 1 => "yaffs2",
        Squash = 2 => "squash",
        RawFile = 3 => "rawfile",
        Ext4 = 4 => "ext4",
        Ubifs = 5 => "ubifs",
        None = 6 => "none",
        Unknown = 7 => "unknown",
    }
}
