//! Configuration for tunebox front ends
//!
//! - YAML loading/saving that falls back to defaults
//! - Standard data and config locations
//! - [`TuneboxConfig`], the settings shared by every front end
//!
//! # Usage
//!
//! ```ignore
//! use tunebox_core::config::{default_config_path, load_config, TuneboxConfig};
//!
//! let config: TuneboxConfig = load_config(&default_config_path());
//! let store = DirectoryStore::open(config.data_dir())?;
//! ```

mod io;
mod paths;
mod settings;

pub use io::{load_config, save_config};
pub use paths::{default_config_path, default_data_dir, CONFIG_FILE_NAME};
pub use settings::{TuneboxConfig, DEFAULT_LIBRARY_FILE};
