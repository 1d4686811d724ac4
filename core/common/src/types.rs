//! Common types used throughout invest storage.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name under which a storage provider is registered and selected.
///
/// Names are case-sensitive tokens made of ASCII alphanumerics,
/// `-`, `_` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);

impl ProviderName {
    /// Create a new ProviderName from a string.
    ///
    /// # Preconditions
    /// - `name` must be non-empty
    /// - `name` must only contain ASCII alphanumerics, `-`, `_` or `.`
    ///
    /// # Errors
    /// - Returns error if name is empty or contains other characters
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Provider name cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(crate::Error::InvalidInput(format!(
                "Provider name '{}' contains invalid character {:?}",
                name, bad
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProviderName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<ProviderName> for String {
    fn from(name: ProviderName) -> Self {
        name.0
    }
}

// Hashes identically to the inner String, so maps keyed by ProviderName
// can be queried with a plain &str.
impl Borrow<str> for ProviderName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of an object held by a storage provider.
///
/// Keys are logical, `/`-separated and independent of how a provider lays
/// objects out physically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    segments: Vec<String>,
}

impl StorageKey {
    /// Create a key from its segments.
    ///
    /// # Errors
    /// - No segments given
    /// - A segment is empty, `.` or `..`, or contains a separator
    pub fn from_segments(segments: Vec<String>) -> crate::Result<Self> {
        if segments.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Storage key cannot be empty".to_string(),
            ));
        }
        for segment in &segments {
            Self::check_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Parse a key string using `/` as separator.
    ///
    /// Leading and trailing separators are ignored.
    pub fn parse(key: &str) -> crate::Result<Self> {
        let trimmed = key.trim_matches('/');
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Storage key cannot be empty".to_string(),
            ));
        }
        Self::from_segments(trimmed.split('/').map(String::from).collect())
    }

    fn check_segment(segment: &str) -> crate::Result<()> {
        if segment.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Key segment cannot be empty".to_string(),
            ));
        }
        if segment == "." || segment == ".." {
            return Err(crate::Error::InvalidInput(format!(
                "Key segment '{}' is not allowed",
                segment
            )));
        }
        if segment.contains('/') || segment.contains('\\') {
            return Err(crate::Error::InvalidInput(
                "Key segment cannot contain separators".to_string(),
            ));
        }
        Ok(())
    }

    /// Append a segment.
    pub fn join(&self, segment: &str) -> crate::Result<Self> {
        Self::check_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Key segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment.
    pub fn name(&self) -> &str {
        // from_segments rejects empty keys
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Proper prefixes of this key, shortest first.
    ///
    /// `/a/b/c` yields `/a` and `/a/b`.
    pub fn ancestors(&self) -> impl Iterator<Item = StorageKey> + '_ {
        (1..self.segments.len()).map(move |len| Self {
            segments: self.segments[..len].to_vec(),
        })
    }

    /// Whether `prefix` matches the leading segments of this key.
    ///
    /// Matching is per segment: `/quotes/AAPL` is under `/quotes` but not
    /// under `/quo`.
    pub fn starts_with(&self, prefix: &StorageKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
