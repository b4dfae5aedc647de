use std::fs;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use super::content::{Configuration, DEFAULT_CONTENT};
use super::{LoadConfigurationError, ParseSnafu, ReadSnafu};

/// The configuration file on disk.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    seed: bool,
}

impl ConfigFile {
    /// A file given by the user. It must already exist.
    pub fn existing<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            seed: false,
        }
    }

    /// A file which receives the default template when missing.
    pub fn seeded<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            seed: true,
        }
    }

    /// Read the raw content.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file is missing and not
    /// seeded, or if any file system operation fails.
    pub fn read(&self) -> Result<String, ReadConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound && self.seed => self.write_default(),
            Err(err) if err.kind() == ErrorKind::NotFound => MissingSnafu.fail(),
            Err(err) => Err(err).context(IoSnafu { action: "read" }),
        }
    }

    /// Read and parse the file.
    ///
    /// # Errors
    ///
    /// This function will return an error if reading fails or the content
    /// is not a valid configuration.
    pub fn load(&self) -> Result<Configuration, LoadConfigurationError> {
        let content = self.read().context(ReadSnafu { path: &self.path })?;
        toml::from_str(&content).context(ParseSnafu { path: &self.path })
    }

    fn write_default(&self) -> Result<String, ReadConfigError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context(IoSnafu {
                action: "create the directory of",
            })?;
        }
        fs::write(&self.path, DEFAULT_CONTENT).context(IoSnafu { action: "write" })?;
        tracing::info!(path = %self.path.display(), "Wrote default configuration");
        Ok(DEFAULT_CONTENT.to_owned())
    }
}

/// An error type for reading the configuration file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadConfigError {
    #[snafu(display("The file does not exist"))]
    Missing,
    #[snafu(display("Could not {action} the file"))]
    Io {
        action: &'static str,
        source: IoError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use predicates::path as path_pred;

    #[test]
    fn existing_file_is_read_verbatim() {
        let tmp = TempDir::new().expect("Test environment should support temporary directories");
        let file = tmp.child("config.toml");
        file.write_str("[user]\nid = \"u\"").unwrap();
        assert_eq!(ConfigFile::existing(file.path()).read().unwrap(), "[user]\nid = \"u\"");
    }

    #[test]
    fn missing_existing_file_is_not_created() {
        let tmp = TempDir::new().expect("Test environment should support temporary directories");
        let file = tmp.child("config.toml");
        assert!(matches!(
            ConfigFile::existing(file.path()).read(),
            Err(ReadConfigError::Missing)
        ));
        file.assert(path_pred::missing());
    }

    #[test]
    fn seeded_file_gets_default_template() {
        let tmp = TempDir::new().expect("Test environment should support temporary directories");
        let file = tmp.child("nested").child("config.toml");
        let config = ConfigFile::seeded(file.path()).load().unwrap();
        file.assert(DEFAULT_CONTENT);
        assert_eq!(config.user.id, "local");

        file.write_str("[user]\nid = \"edited\"").unwrap();
        assert_eq!(ConfigFile::seeded(file.path()).load().unwrap().user.id, "edited");
    }
}
