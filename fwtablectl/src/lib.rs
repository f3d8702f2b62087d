// Licensed under the Apache-2.0 license

//! Command implementations behind the `fwtablectl` binary.

use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;

pub mod cli;
pub mod firmware;
pub mod part;
pub mod show;
pub mod table_file;

pub use cli::{Cli, Commands, FirmwareCommands, PartCommands};

/// Environment variable overriding the `-v` log level.
pub const LOG_ENV: &str = "FWTABLECTL_LOG";

/// Picks the log level from `FWTABLECTL_LOG` if set and valid, else from `-v`.
pub fn log_level(verbose: u8, env: Option<&str>) -> LevelFilter {
    if let Some(level) = env.and_then(|v| LevelFilter::from_str(v.trim()).ok()) {
        return level;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Show { table, json } => show::show(table, *json, out),
        Commands::Verify { table } => show::verify(table, out),
        Commands::Firmware { subcommand } => match subcommand {
            FirmwareCommands::New {
                table,
                fw_type,
                file,
                sector,
                load_address,
            } => firmware::new(table, *fw_type, file, *sector, *load_address),
            FirmwareCommands::Update {
                table,
                fw_type,
                file,
            } => firmware::update(table, *fw_type, file),
            FirmwareCommands::Remove { table, fw_type } => firmware::remove(table, *fw_type),
            FirmwareCommands::Types => firmware::types(out),
        },
        Commands::Part { subcommand } => match subcommand {
            PartCommands::Remove { table, index } => part::remove(table, *index),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, None), LevelFilter::Warn);
        assert_eq!(log_level(1, None), LevelFilter::Info);
        assert_eq!(log_level(2, None), LevelFilter::Debug);
        assert_eq!(log_level(7, None), LevelFilter::Trace);
        assert_eq!(log_level(0, Some("trace")), LevelFilter::Trace);
        assert_eq!(log_level(3, Some("off")), LevelFilter::Off);
        assert_eq!(log_level(1, Some("loud")), LevelFilter::Info);
    }
}
