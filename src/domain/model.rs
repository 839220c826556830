use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque name of a stored object, chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Reference {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRefsItem {
    pub reference: Reference,
    pub size: u64,
}

/// One page of a listing walk. An empty `next_token` ends the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub refs: Vec<ListRefsItem>,
    pub next_token: String,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }
}

/// String options handed to a backend factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOpts {
    pub opts: HashMap<String, String>,
}

impl StorageOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.opts.get(key).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for StorageOpts {
    fn from(opts: HashMap<String, String>) -> Self {
        Self { opts }
    }
}
