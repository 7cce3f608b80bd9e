//! Logger setup shared by both binaries.
use std::path::Path;

use courier_logging::LogDestination;
use log::LevelFilter;

/// Terminal logging, plus `log_file` when configured.
pub fn initialize(log_file: Option<&Path>, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match log_file {
        Some(path) => LogDestination::Both(path.to_path_buf()),
        None => LogDestination::Terminal,
    };
    courier_logging::initialize(destination, level);
}
