//! Repository identifiers in `owner/name` form.

use serde::{Deserialize, Serialize};

/// Errors produced while parsing a repository identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoKeyError {
    /// The identifier is not in `owner/name` form or a component is empty.
    #[error("repository identifier malformed: expected 'owner/name', got '{0}'")]
    Malformed(String),
}

/// A repository key uniquely identifying a remote mod repository.
///
/// Serialized as the plain `owner/name` string so persisted catalogs stay
/// readable.
///
/// # Example
///
/// ```
/// use modlayer_schema::RepoKey;
///
/// let repo = RepoKey::parse("abbysssal/RogueLibs").unwrap();
/// assert_eq!(repo.owner, "abbysssal");
/// assert_eq!(repo.name, "RogueLibs");
/// assert_eq!(repo.to_string(), "abbysssal/RogueLibs");
/// ```
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoKey {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoKey {
    /// Create a new `RepoKey` from an owner and repository name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` identifier.
    ///
    /// Everything after the first `/` belongs to the name, but both halves
    /// must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`RepoKeyError::Malformed`] when there is no `/` or either
    /// component is empty.
    pub fn parse(s: &str) -> Result<Self, RepoKeyError> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(RepoKeyError::Malformed(s.to_string())),
        }
    }

    /// Case-insensitive comparison against an `owner/name` string.
    pub fn matches(&self, s: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(s)
    }
}

impl std::fmt::Display for RepoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoKey {
    type Err = RepoKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoKey {
    type Error = RepoKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoKey> for String {
    fn from(key: RepoKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let key = RepoKey::parse("owner/name").unwrap();
        assert_eq!(key, RepoKey::new("owner", "name"));
    }

    #[test]
    fn test_parse_keeps_extra_slashes_in_name() {
        let key = RepoKey::parse("owner/name/extra").unwrap();
        assert_eq!(key.owner, "owner");
        assert_eq!(key.name, "name/extra");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RepoKey::parse("noslash").is_err());
        assert!(RepoKey::parse("/name").is_err());
        assert!(RepoKey::parse("owner/").is_err());
        assert!(RepoKey::parse("").is_err());
    }

    #[test]
    fn test_error_message_is_actionable() {
        let err = RepoKey::parse("bad").unwrap_err();
        assert!(err.to_string().contains("repository identifier malformed"));
    }

    #[test]
    fn test_serde_as_string() {
        let key = RepoKey::new("a", "b");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"a/b\"");
        let back: RepoKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<RepoKey>("\"nope\"").is_err());
    }
}
