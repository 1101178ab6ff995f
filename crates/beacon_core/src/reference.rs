//! Directed references between resources.

use crate::name::QualifiedName;
use serde::{Deserialize, Serialize};

/// An edge from a referencing resource to the canonical name it refers to
///
/// `to` is kept as text: a reference may name something that does not
/// exist, and that is only discovered once the reference index is checked
/// against a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Referencing resource
    pub from: QualifiedName,
    /// Canonical name of the referenced resource
    pub to: String,
    /// Attribute of `from` that holds the reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl ResourceReference {
    /// Create a new reference
    #[must_use]
    pub fn new(from: QualifiedName, to: impl Into<String>) -> Self {
        Self {
            from,
            to: to.into(),
            attribute: None,
        }
    }

    /// Record the attribute that holds the reference
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Parsed target, if `to` is a well-formed qualified name
    #[must_use]
    pub fn target(&self) -> Option<QualifiedName> {
        self.to.parse().ok()
    }
}

impl std::fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)?;
        if let Some(attribute) = &self.attribute {
            write!(f, "#{}", attribute)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;

    fn chart() -> QualifiedName {
        QualifiedName::new("demo", ResourceKind::Chart, "by_region").unwrap()
    }

    #[test]
    fn test_reference_display() {
        let reference = ResourceReference::new(chart(), "demo.query.by_region");
        assert_eq!(reference.to_string(), "demo.chart.by_region -> demo.query.by_region");
    }

    #[test]
    fn test_reference_display_with_attribute() {
        let reference = ResourceReference::new(chart(), "demo.input.region").with_attribute("args");
        assert_eq!(
            reference.to_string(),
            "demo.chart.by_region -> demo.input.region#args"
        );
    }

    #[test]
    fn test_reference_target() {
        let reference = ResourceReference::new(chart(), "demo.input.region");
        assert_eq!(reference.target().unwrap().kind(), ResourceKind::Input);
        assert!(ResourceReference::new(chart(), "garbage").target().is_none());
    }
}
