// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clap_num::maybe_hex;
use fw_table::FirmwareType;

/// Inspect and edit the firmware table read by the bootloader.
///
/// The table can be a regular file or the block device holding it. Edits are
/// written back in place, without truncating the target.
#[derive(Parser, Debug)]
#[command(
    version,
    after_help = "Examples:
  fwtablectl show /dev/sataa1
  fwtablectl firmware update fwtable.bin KernelRootFS rootfs.cpio.gz
  fwtablectl firmware new /dev/sataa1 KernelRootFS rootfs.cpio.gz 67584 0x02200000
  fwtablectl firmware remove /root/fwtable.bin uBoot"
)]
pub struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); FWTABLECTL_LOG overrides it
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a table and show its entries
    Show {
        /// Firmware table file or device
        #[arg(env = "FWTABLE")]
        table: PathBuf,

        /// Print the table and its validation errors as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check signature, reserved bytes and checksum of a table
    Verify {
        /// Firmware table file or device
        #[arg(env = "FWTABLE")]
        table: PathBuf,
    },
    /// Add, update or remove firmware entries
    Firmware {
        #[command(subcommand)]
        subcommand: FirmwareCommands,
    },
    /// Remove partition entries
    Part {
        #[command(subcommand)]
        subcommand: PartCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum FirmwareCommands {
    /// Add a new firmware entry
    New {
        /// Firmware table file or device
        table: PathBuf,

        /// Firmware type, see `firmware types`
        fw_type: FirmwareType,

        /// Firmware image to describe
        file: PathBuf,

        /// Location of the image on disk, in 512-byte sectors
        #[arg(value_parser = maybe_hex::<u32>)]
        sector: u32,

        /// Address the bootloader loads the image to
        #[arg(value_parser = maybe_hex::<u32>)]
        load_address: u32,
    },
    /// Update an entry with a new image
    Update {
        /// Firmware table file or device
        table: PathBuf,

        /// Firmware type of the entry to update
        fw_type: FirmwareType,

        /// New firmware image
        file: PathBuf,
    },
    /// Remove a firmware entry
    Remove {
        /// Firmware table file or device
        table: PathBuf,

        /// Firmware type of the entry to remove
        fw_type: FirmwareType,
    },
    /// Print the available firmware types
    Types,
}

#[derive(Subcommand, Debug)]
pub enum PartCommands {
    /// Remove a partition entry
    Remove {
        /// Firmware table file or device
        table: PathBuf,

        /// Partition number as shown by `show`, starting at 1
        index: usize,
    },
}
