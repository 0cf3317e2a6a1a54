//! Canonical media identifiers.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally assigned media identifier in canonical string form.
///
/// Upstream APIs emit the same identifier as a JSON number in one response and
/// a string in the next. Every id is normalized to its decimal string so that
/// `3141` and `"3141"` compare equal.
///
/// # Examples
///
/// ```
/// use tagrelay_ledger::MediaId;
///
/// assert_eq!(MediaId::from(3141_u64), MediaId::from("3141"));
/// assert_eq!(MediaId::from(" 7 ").as_str(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, derive_more::Display)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Borrow the canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for MediaId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for MediaId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for MediaId {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&MediaId> for MediaId {
    fn from(value: &MediaId) -> Self {
        value.clone()
    }
}

impl From<u64> for MediaId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for MediaId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for MediaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

struct MediaIdVisitor;

impl Visitor<'_> for MediaIdVisitor {
    type Value = MediaId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a media id as a string or an integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(MediaId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(MediaId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(MediaId::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.fract() == 0.0 && v.is_finite() {
            Ok(MediaId(format!("{:.0}", v)))
        } else {
            Err(E::custom(format!("non-integral media id: {}", v)))
        }
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MediaIdVisitor)
    }
}
