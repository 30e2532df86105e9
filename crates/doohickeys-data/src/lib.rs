//! DooHickeys Data -- loads simulation tuning from RON, TOML, or JSON files.
//!
//! The engine itself never touches the filesystem. Hosts that want to tune
//! the step without recompiling point this crate at a file or a directory
//! and hand the resulting [`SimConfig`](doohickeys_core::config::SimConfig)
//! to `Simulation::with_config`.

pub mod config;
pub mod loader;

pub use config::{load_from_dir, load_sim_config};
pub use loader::{DataLoadError, Format};
