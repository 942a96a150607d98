//! Watch keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one `watch` call
///
/// A random v4 UUID, rendered in its hyphenated form. Two watches of the same
/// object get two different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchKey(Uuid);

impl WatchKey {
    /// Generate a fresh random key
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for WatchKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_keys_differ() {
        assert_ne!(WatchKey::random(), WatchKey::random());
    }

    #[test]
    fn test_display_parses_back() {
        let key = WatchKey::random();
        let text = key.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<WatchKey>().ok(), Some(key));
    }

    #[test]
    fn test_rejects_malformed_key() {
        assert!("not-a-key".parse::<WatchKey>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let key = WatchKey::random();
        let json = serde_json::to_string(&key).expect("key should serialize");
        assert_eq!(json, format!("\"{}\"", key));
    }
}
