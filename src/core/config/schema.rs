//! core::config::schema
//!
//! Configuration file schema.
//!
//! The same schema is used for the user-level file and for the per-project
//! file. Every field is optional so that a project file only needs to name
//! what it overrides.
//!
//! # Example
//!
//! ```toml
//! [format]
//! indent = "\t"
//! xml_declaration = true
//!
//! [sync]
//! verify = false
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Serialization settings for the reference store.
    pub format: Option<FormatSection>,

    /// Reconciliation settings.
    pub sync: Option<SyncSection>,
}

/// `[format]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatSection {
    /// Indentation unit; spaces and tabs only.
    pub indent: Option<String>,

    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` first.
    pub xml_declaration: Option<bool>,
}

/// `[sync]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Check the typed tree against the store after every sync batch.
    pub verify: Option<bool>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(indent) = self.format.as_ref().and_then(|f| f.indent.as_deref()) {
            if !indent.chars().all(|c| c == ' ' || c == '\t') {
                return Err(ConfigError::InvalidValue(format!(
                    "indent must contain only spaces or tabs, got {indent:?}"
                )));
            }
        }
        Ok(())
    }
}
