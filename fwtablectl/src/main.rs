// Licensed under the Apache-2.0 license

use std::io;

use clap::Parser;
use fwtablectl::{log_level, run, Cli, LOG_ENV};
use simple_logger::SimpleLogger;

fn main() {
    let cli = Cli::parse();

    let env = std::env::var(LOG_ENV).ok();
    let _ = SimpleLogger::new()
        .with_level(log_level(cli.verbose, env.as_deref()))
        .init();

    let stdout = io::stdout();
    let result = run(&cli, &mut stdout.lock());
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
