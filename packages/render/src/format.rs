use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format identifier, e.g. `dom`, `dom/html`, `text/plain`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatId(String);

impl FormatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormatId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FormatId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&FormatId> for FormatId {
    fn from(id: &FormatId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for FormatId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FormatId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
