//! Init command - write the configuration file.

use std::path::Path;

use blockbatch::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
///
/// An existing file is left alone unless `force` is set.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    let written = write_config(&path, force)?;

    if written {
        println!("Wrote default configuration: {}", path.display());
    } else {
        println!("Configuration already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    println!();
    println!("Set the RCON password in [connection] or export BLOCKBATCH_RCON_PASSWORD.");
    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<bool, CliError> {
    if path.exists() && !force {
        return Ok(false);
    }
    ConfigFile::default().save_to(path)?;
    Ok(true)
}
