use std::fmt;

use serde::{Deserialize, Serialize};

const DASHBOARD_STATS: &str = "dashboard_stats";
const REGISTRATIONS_PREFIX: &str = "registrations_event_";
const VISITORS_PREFIX: &str = "visitor_data_reg_";
const EXPIRY_SUFFIX: &str = ".expiry";

/// Name of a cached resource.
///
/// Each key family is owned by exactly one service; the constructors are the
/// only place the naming convention is spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn dashboard_stats() -> Self {
        Self(DASHBOARD_STATS.to_string())
    }

    pub fn registrations_for_event(event_id: impl fmt::Display) -> Self {
        Self(format!("{}{}", REGISTRATIONS_PREFIX, event_id))
    }

    pub fn visitors_for_registration(registration_id: impl fmt::Display) -> Self {
        Self(format!("{}{}", VISITORS_PREFIX, registration_id))
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem for the persisted value.
    ///
    /// ASCII alphanumerics, `_` and `-` are kept; every other byte becomes
    /// `%XX`. The mapping is injective and never produces a `.`.
    pub fn file_stem(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                out.push(byte as char);
            } else {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
        out
    }

    /// File stem for the expiry sidecar of this key.
    pub fn expiry_stem(&self) -> String {
        format!("{}{}", self.file_stem(), EXPIRY_SUFFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::custom(s)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_namespaced_keys() {
        assert_eq!(CacheKey::dashboard_stats().as_str(), "dashboard_stats");
        assert_eq!(
            CacheKey::registrations_for_event(2024).as_str(),
            "registrations_event_2024"
        );
        assert_eq!(
            CacheKey::visitors_for_registration(17).as_str(),
            "visitor_data_reg_17"
        );
    }

    #[test]
    fn test_same_resource_same_key() {
        assert_eq!(
            CacheKey::visitors_for_registration(17),
            CacheKey::visitors_for_registration("17")
        );
    }

    #[test]
    fn test_plain_keys_keep_their_stem() {
        assert_eq!(CacheKey::dashboard_stats().file_stem(), "dashboard_stats");
        assert_eq!(
            CacheKey::dashboard_stats().expiry_stem(),
            "dashboard_stats.expiry"
        );
    }

    #[test]
    fn test_file_stem_is_injective() {
        let keys = [
            "a/b", "a%2Fb", "a.b", "a%2Eb", "a b", "a_b", "../x", "%", "%25", "é",
        ];
        let stems: HashSet<String> = keys.iter().map(|k| CacheKey::custom(*k).file_stem()).collect();
        assert_eq!(stems.len(), keys.len());
        for stem in &stems {
            assert!(!stem.contains('.'));
            assert!(!stem.contains('/'));
        }
    }
}
