//! Remembered aliases
//!
//! Interactive resolution keeps a login → alias map so a login that needed
//! an alias once can be offered the same one at its next conflict, and so
//! a saved map can answer conflicts without prompting at all. The map is
//! printed after interactive runs and round-trips through a JSON file in
//! first-seen order.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasMapError {
    #[error("failed to read aliases from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid aliases file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Login → alias map, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a map from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AliasMapError> {
        let text = fs::read_to_string(path).map_err(|source| AliasMapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AliasMapError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, login: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(known, _)| known == login)
            .map(|(_, alias)| alias.as_str())
    }

    pub fn contains(&self, login: &str) -> bool {
        self.get(login).is_some()
    }

    /// Remember an alias for a login, returning the alias it replaced.
    /// A replaced login keeps its original position.
    pub fn set(&mut self, login: impl Into<String>, alias: impl Into<String>) -> Option<String> {
        let login = login.into();
        let alias = alias.into();
        match self.entries.iter_mut().find(|(known, _)| *known == login) {
            Some((_, slot)) => Some(std::mem::replace(slot, alias)),
            None => {
                self.entries.push((login, alias));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(login, alias)| (login.as_str(), alias.as_str()))
    }
}

impl Serialize for AliasMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (login, alias) in &self.entries {
            map.serialize_entry(login, alias)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AliasMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AliasVisitor;

        impl<'de> Visitor<'de> for AliasVisitor {
            type Value = AliasMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object mapping logins to aliases")
            }

            // A hand-edited file may repeat a login; the last value wins.
            fn visit_map<A>(self, mut access: A) -> Result<AliasMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut aliases = AliasMap::new();
                while let Some((login, alias)) = access.next_entry::<String, String>()? {
                    aliases.set(login, alias);
                }
                Ok(aliases)
            }
        }

        deserializer.deserialize_map(AliasVisitor)
    }
}
