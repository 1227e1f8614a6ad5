//! Path management for TaskShare configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/taskshare/         # Config directory (platform config dir)
//! └── config.toml              # Client configuration
//! ```

use std::path::PathBuf;
use taskshare_core::error::{Result, TaskShareError};

const APP_DIR: &str = "taskshare";
const CONFIG_FILE: &str = "config.toml";

pub struct TaskSharePaths;

impl TaskSharePaths {
    /// Returns the TaskShare configuration directory.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the platform config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| TaskShareError::config("Cannot find config directory"))
    }

    /// Returns the path to the client configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }
}
