use crate::error::Result;
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps the repeatable `-v` flag and `-q` onto a level filter. Quiet wins
/// over any verbosity.
fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: compact output on stderr for interactive
/// use, optionally mirrored without ANSI codes into a log file so screening
/// runs leave an auditable record.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let registry = tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(console);

    match log_file {
        Some(path) => {
            let sink = File::create(path)?;
            let audit = fmt::layer().with_writer(sink).with_ansi(false);
            registry.with(audit).init();
        }
        None => registry.init(),
    }
    Ok(())
}
