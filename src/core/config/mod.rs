//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! There are two configuration scopes:
//! - **User**: settings shared by every document
//! - **Project**: overrides kept next to the module descriptors
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. User config file
//! 3. Project config file
//!
//! # User Config Locations
//!
//! Searched in order:
//! 1. `$GWTMODULE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gwtmodule/config.toml`
//! 3. `<platform config dir>/gwtmodule/config.toml`
//!
//! # Project Config Location
//!
//! `<project>/.gwtmodule.toml`
//!
//! # Example
//!
//! ```no_run
//! use gwtmodule::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! println!("indent: {:?}", config.format().indent);
//! println!("verify after sync: {}", config.verify_sync());
//! ```

pub mod schema;

pub use schema::{ConfigFile, FormatSection, SyncSection};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit user config file.
pub const CONFIG_ENV: &str = "GWTMODULE_CONFIG";

/// File name of the project config.
pub const PROJECT_FILE: &str = ".gwtmodule.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved serialization settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Indentation unit per nesting level.
    pub indent: String,
    /// Whether to emit an XML declaration.
    pub xml_declaration: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            xml_declaration: false,
        }
    }
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// User configuration
    pub user: ConfigFile,
    /// Project configuration (if found)
    pub project: Option<ConfigFile>,
    user_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads `<project_dir>/.gwtmodule.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let (user, user_path) = match Self::find_user_config() {
            Some(path) => (Self::read_file(&path)?, Some(path)),
            None => (ConfigFile::default(), None),
        };

        let (project, project_path) = match project_dir.map(|dir| dir.join(PROJECT_FILE)) {
            Some(path) if path.exists() => (Some(Self::read_file(&path)?), Some(path)),
            _ => (None, None),
        };

        tracing::debug!(?user_path, ?project_path, "loaded configuration");

        Ok(Self {
            user,
            project,
            user_path,
            project_path,
        })
    }

    /// Load a single explicit file as the user scope.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            user: Self::read_file(path)?,
            user_path: Some(path.to_path_buf()),
            ..Default::default()
        })
    }

    fn find_user_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gwtmodule/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("gwtmodule/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read, parse and validate one config file.
    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed, writes to a sibling temp file
    /// and renames it into place.
    pub fn write(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
        file.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(file).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut handle = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        handle
            .write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;
        handle.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn layered<T>(&self, pick: impl Fn(&ConfigFile) -> Option<T>) -> Option<T> {
        self.project.as_ref().and_then(&pick).or_else(|| pick(&self.user))
    }

    /// Resolved serialization settings.
    pub fn format(&self) -> FormatConfig {
        let defaults = FormatConfig::default();
        FormatConfig {
            indent: self
                .layered(|f| f.format.as_ref().and_then(|s| s.indent.clone()))
                .unwrap_or(defaults.indent),
            xml_declaration: self
                .layered(|f| f.format.as_ref().and_then(|s| s.xml_declaration))
                .unwrap_or(defaults.xml_declaration),
        }
    }

    /// Whether to verify the typed tree after each sync batch.
    ///
    /// Defaults to `true` if not configured.
    pub fn verify_sync(&self) -> bool {
        self.layered(|f| f.sync.as_ref().and_then(|s| s.verify))
            .unwrap_or(true)
    }

    /// Path the user scope was loaded from.
    pub fn user_config_loaded_from(&self) -> Option<&Path> {
        self.user_path.as_deref()
    }

    /// Path the project scope was loaded from.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
