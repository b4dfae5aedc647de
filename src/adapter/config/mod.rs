mod content;
mod file;

use std::path::{Path, PathBuf};

pub use content::{
    Configuration, RemoteContent, StorageContent, SyncContent, TimerContent, UserContent,
    DEFAULT_CONTENT,
};
pub use file::{ConfigFile, ReadConfigError};

use snafu::prelude::*;
use toml::de::Error as DeError;

use crate::utils::xdg::{AppDirs, XdgError};

/// An error type for loading configuration from files.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LoadConfigurationError {
    #[snafu(display("Could not locate the configuration directory"))]
    Locate { source: XdgError },
    #[snafu(display("Could not read {}", path.display()))]
    Read {
        path: PathBuf,
        source: ReadConfigError,
    },
    #[snafu(display("Invalid configuration in {}", path.display()))]
    Parse { path: PathBuf, source: DeError },
}

/// Load the configuration from a path given by the user. No file is created.
///
/// # Errors
///
/// This function will return an error if the file is missing, unreadable or
/// invalid.
pub fn load_with_path<P: AsRef<Path>>(path: P) -> Result<Configuration, LoadConfigurationError> {
    ConfigFile::existing(path).load()
}

/// Load `config.toml` from the XDG configuration directory, writing the
/// default template on first use.
///
/// # Errors
///
/// This function will return an error if the directory cannot be created or
/// the file is unreadable or invalid.
pub fn load_with_xdg(dirs: &AppDirs) -> Result<Configuration, LoadConfigurationError> {
    let path = dirs.config_file().context(LocateSnafu)?;
    ConfigFile::seeded(path).load()
}
