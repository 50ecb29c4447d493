//! Session configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration.

use std::path::Path;

use serde::Deserialize;

use crate::data::CsvOptions;
use crate::error::{Result, TallyError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How uploaded datasets are parsed.
    pub csv: CsvOptions,

    /// Push outcomes of nodes without a bound view to the sinks as well.
    pub publish_unbound: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            publish_unbound: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| TallyError::Config {
            message: err.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| TallyError::Config {
            message: format!("{}: {err}", path.display()),
        })?;
        Self::from_json(&text)
    }
}
