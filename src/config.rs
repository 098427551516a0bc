//! Configuration for the lending store, read from TOML.
//!
//! Every field is optional in the file; missing fields take the defaults
//! below, and a missing file is the default configuration.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default members stream file name
pub const DEFAULT_MEMBERS_FILE: &str = "members.dat";

/// Default books stream file name
pub const DEFAULT_BOOKS_FILE: &str = "books.dat";

/// Default open loans stream file name
pub const DEFAULT_LOANS_FILE: &str = "loans.dat";

/// Default library name
pub const DEFAULT_LIBRARY_NAME: &str = "Library";

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid TOML for this configuration
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How persisted open loans are attached on load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    /// Replay through the normal checkout rules; refused loans are dropped
    #[default]
    Checkout,
    /// Attach loans to free books without checking member eligibility
    Restore,
}

/// Settings for the lending store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Name given to the loaded library
    pub library_name: String,
    /// Directory holding the three streams
    pub data_dir: PathBuf,
    /// Members stream file name, relative to `data_dir`
    pub members_file: String,
    /// Books stream file name, relative to `data_dir`
    pub books_file: String,
    /// Open loans stream file name, relative to `data_dir`
    pub loans_file: String,
    /// How open loans are attached on load
    pub replay: ReplayMode,
    /// Log file for the demo binary; stderr when unset
    pub log_file: Option<PathBuf>,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            data_dir: PathBuf::from("."),
            members_file: DEFAULT_MEMBERS_FILE.to_string(),
            books_file: DEFAULT_BOOKS_FILE.to_string(),
            loans_file: DEFAULT_LOANS_FILE.to_string(),
            replay: ReplayMode::default(),
            log_file: None,
        }
    }
}

impl LendingConfig {
    /// Defaults with the streams placed in `data_dir`
    #[must_use]
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Self::default() }
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML or mistyped fields.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a TOML file; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists but cannot be read, and
    /// `ConfigError::Parse` if it is not valid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                debug!("loading config from {}", path.display());
                Self::from_toml_str(&contents)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full path of the members stream
    #[must_use]
    pub fn members_path(&self) -> PathBuf {
        self.data_dir.join(&self.members_file)
    }

    /// Full path of the books stream
    #[must_use]
    pub fn books_path(&self) -> PathBuf {
        self.data_dir.join(&self.books_file)
    }

    /// Full path of the open loans stream
    #[must_use]
    pub fn loans_path(&self) -> PathBuf {
        self.data_dir.join(&self.loans_file)
    }
}
