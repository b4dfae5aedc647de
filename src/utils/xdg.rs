use std::io::Error as IoError;
use std::path::PathBuf;
use std::sync::Arc;

use snafu::prelude::*;
use xdg::{BaseDirectories, BaseDirectoriesError};

const CONFIG_FILE: &str = "config.toml";
const STATE_DIR: &str = "state";
const REMOTE_DIR: &str = "remote";

/// The application's locations under the XDG base directories.
pub struct AppDirs {
    base: BaseDirectories,
}

impl AppDirs {
    /// Locate the directories of application `name`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the environment has no usable
    /// home directory.
    pub fn new(name: &str) -> Result<Self, XdgError> {
        let base = BaseDirectories::with_prefix(name).context(InitSnafu)?;
        Ok(Self { base })
    }

    /// Path of the configuration file. Its directory is created if missing.
    ///
    /// # Errors
    ///
    /// This function will return an error if creating the directory fails.
    pub fn config_file(&self) -> Result<PathBuf, XdgError> {
        self.base
            .place_config_file(CONFIG_FILE)
            .context(CreateSnafu { what: "configuration" })
    }

    /// Directory of the local records. Left to the store to create.
    pub fn state_dir(&self) -> PathBuf {
        self.base.get_data_home().join(STATE_DIR)
    }

    /// Folder used as the remote store when none is configured. It is
    /// created so the store starts out reachable.
    ///
    /// # Errors
    ///
    /// This function will return an error if creating the folder fails.
    pub fn remote_dir(&self) -> Result<PathBuf, XdgError> {
        self.base
            .create_data_directory(REMOTE_DIR)
            .context(CreateSnafu { what: "remote" })
    }
}

/// An error for XDG-related operations.
#[derive(Debug, Snafu, Clone)]
pub enum XdgError {
    #[snafu(display("Could not get XDG settings"))]
    Init {
        #[snafu(source(from(BaseDirectoriesError, Arc::new)))]
        source: Arc<BaseDirectoriesError>,
    },
    #[snafu(display("Could not create the {what} directory"))]
    Create {
        what: &'static str,
        #[snafu(source(from(IoError, Arc::new)))]
        source: Arc<IoError>,
    },
}
