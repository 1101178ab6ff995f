//! Qualified resource names: `<mod>.<kind>.<name>`.

use crate::error::{CoreError, CoreResult};
use crate::kind::ResourceKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("segment pattern is valid")
});

/// Check a single name segment (mod name or unqualified name)
///
/// # Errors
///
/// Returns `InvalidName` if the segment is empty or contains illegal characters
pub fn validate_segment(segment: &str) -> CoreResult<()> {
    if SEGMENT.is_match(segment) {
        Ok(())
    } else {
        Err(CoreError::InvalidName {
            name: segment.to_string(),
            reason: "segments must match [A-Za-z_][A-Za-z0-9_-]*".to_string(),
        })
    }
}

/// Fully qualified name of a resource
///
/// Serialized as its dotted text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    mod_name: String,
    kind: ResourceKind,
    name: String,
}

impl QualifiedName {
    /// Create a qualified name, validating both segments
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if either segment is invalid
    pub fn new(mod_name: impl Into<String>, kind: ResourceKind, name: impl Into<String>) -> CoreResult<Self> {
        let mod_name = mod_name.into();
        let name = name.into();
        validate_segment(&mod_name)?;
        validate_segment(&name)?;
        Ok(Self { mod_name, kind, name })
    }

    /// Owning mod
    #[must_use]
    pub fn mod_name(&self) -> &str {
        &self.mod_name
    }

    /// Resource kind
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Unqualified name
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// `<kind>.<name>` without the mod prefix
    #[must_use]
    pub fn scoped(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.mod_name, self.kind, self.name)
    }
}

impl FromStr for QualifiedName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [mod_name, kind, name] = parts.as_slice() else {
            return Err(CoreError::InvalidName {
                name: s.to_string(),
                reason: format!("expected <mod>.<kind>.<name>, found {} segment(s)", parts.len()),
            });
        };
        let kind = kind.parse::<ResourceKind>()?;
        Self::new(*mod_name, kind, *name)
    }
}

impl Serialize for QualifiedName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QualifiedName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
