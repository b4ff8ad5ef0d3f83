//! Subcommands of the `twiss` binary.

use std::error::Error;
use std::fs;
use std::path::Path;

pub mod commands;

/// Writes `value` as pretty JSON, creating parent directories.
pub fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
