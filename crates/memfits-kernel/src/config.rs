//! Mount configuration.
//!
//! [`MountConfig`] is the on-disk form, read from a RON file and then
//! overridden by command-line flags. [`MountContext`] is what the
//! dispatcher holds: validated, with the backing root created and
//! canonicalized, and never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Defaults for the mount.
pub mod constants {
    /// Name the synthetic image is listed under in every directory.
    pub const DEFAULT_SYNTHETIC_NAME: &str = "inMemFITS.fits";

    /// Paths whose final component ends with this are served from memory.
    pub const DEFAULT_SYNTHETIC_SUFFIX: &str = ".fits";

    /// Permission bits reported for the synthetic image.
    pub const DEFAULT_SYNTHETIC_MODE: u32 = 0o644;

    /// Permission bits reported for directory hints.
    pub const DIRECTORY_MODE: u32 = 0o755;

    /// Backing directory used when none is configured.
    pub const DEFAULT_BACKING_ROOT: &str = "/tmp/memfits";
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Mount settings as written in a config file.
///
/// ```ron
/// (
///     backing_root: "/srv/fits-scratch",
///     debug_trace: true,
///     synthetic_name: "image.fits",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub backing_root: PathBuf,
    pub debug_trace: bool,
    pub synthetic_name: String,
    pub synthetic_suffix: String,
    pub synthetic_mode: u32,
    /// Refuse every mutating passthrough operation.
    pub read_only_backing: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            backing_root: PathBuf::from(constants::DEFAULT_BACKING_ROOT),
            debug_trace: false,
            synthetic_name: constants::DEFAULT_SYNTHETIC_NAME.to_string(),
            synthetic_suffix: constants::DEFAULT_SYNTHETIC_SUFFIX.to_string(),
            synthetic_mode: constants::DEFAULT_SYNTHETIC_MODE,
            read_only_backing: false,
        }
    }
}

impl MountConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Check the settings without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.synthetic_suffix.is_empty() {
            return Err(ConfigError::Invalid("synthetic_suffix is empty".into()));
        }
        if self.synthetic_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "synthetic_name must be a bare file name: {}",
                self.synthetic_name
            )));
        }
        if !self.synthetic_name.ends_with(&self.synthetic_suffix) {
            return Err(ConfigError::Invalid(format!(
                "synthetic_name {} does not end with {}",
                self.synthetic_name, self.synthetic_suffix
            )));
        }
        if self.synthetic_mode & !0o7777 != 0 {
            return Err(ConfigError::Invalid(format!(
                "synthetic_mode {:o} has non-permission bits",
                self.synthetic_mode
            )));
        }
        Ok(())
    }

    /// Validate, create the backing root if missing, and freeze.
    pub fn into_context(self) -> Result<MountContext, ConfigError> {
        self.validate()?;
        std::fs::create_dir_all(&self.backing_root)?;
        let backing_root = dunce::canonicalize(&self.backing_root)?;

        Ok(MountContext {
            backing_root,
            debug_trace: self.debug_trace,
            synthetic_name: self.synthetic_name,
            synthetic_suffix: self.synthetic_suffix,
            synthetic_mode: self.synthetic_mode,
            read_only_backing: self.read_only_backing,
        })
    }
}

/// Immutable settings shared by the router and dispatcher.
#[derive(Debug, Clone)]
pub struct MountContext {
    backing_root: PathBuf,
    debug_trace: bool,
    synthetic_name: String,
    synthetic_suffix: String,
    synthetic_mode: u32,
    read_only_backing: bool,
}

impl MountContext {
    pub fn backing_root(&self) -> &Path {
        &self.backing_root
    }

    /// Log every callback at debug level.
    pub fn debug_trace(&self) -> bool {
        self.debug_trace
    }

    pub fn synthetic_name(&self) -> &str {
        &self.synthetic_name
    }

    pub fn synthetic_suffix(&self) -> &str {
        &self.synthetic_suffix
    }

    pub fn synthetic_mode(&self) -> u32 {
        self.synthetic_mode
    }

    pub fn read_only_backing(&self) -> bool {
        self.read_only_backing
    }
}
