//! Loading a [`SimConfig`] tuning table from disk.
//!
//! Every table of `SimConfig` is `#[serde(default)]`, so a file only names
//! what it overrides:
//!
//! ```toml
//! cell_size = 48.0
//!
//! [steam]
//! boiler_max_pressure = 180.0
//!
//! [explosions]
//! pressure_threshold = 150.0
//! ```

use doohickeys_core::config::SimConfig;
use std::path::Path;

use crate::loader::{DataLoadError, deserialize_file, find_data_file};

/// Base name of the tuning file discovered by [`load_from_dir`].
pub const CONFIG_BASE_NAME: &str = "simulation";

/// Read and validate a tuning file. The format follows the extension.
pub fn load_sim_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: path.to_path_buf(),
            source,
        })?;
    tracing::info!(file = %path.display(), "loaded simulation config");
    Ok(config)
}

/// Look for `simulation.{ron,toml,json}` in `dir`. Stock tuning when none
/// exists; an error when more than one does.
pub fn load_from_dir(dir: &Path) -> Result<SimConfig, DataLoadError> {
    match find_data_file(dir, CONFIG_BASE_NAME)? {
        Some(path) => load_sim_config(&path),
        None => {
            tracing::debug!(dir = %dir.display(), "no simulation config, using defaults");
            Ok(SimConfig::default())
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
