//! Map identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnimError, Result};

/// Name of a host map, safe to embed in a file name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MapId(String);

impl MapId {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AnimError::Input("map name cannot be empty".to_string()));
        }
        if name.contains(['/', '\\']) || name.contains("..") || name.chars().any(char::is_whitespace) {
            return Err(AnimError::Input(format!("invalid map name: {:?}", name)));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MapId {
    type Error = AnimError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MapId> for String {
    fn from(id: MapId) -> Self {
        id.0
    }
}
