use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Content hash of a candle window (hex BLAKE3 over timestamp/close pairs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntegrityHash(pub String);

impl IntegrityHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine name -> semantic version for every engine that contributed to a result.
pub type EngineVersions = BTreeMap<String, String>;

/// Symbol type alias
pub type Symbol = String;
