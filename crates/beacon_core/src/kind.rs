//! Resource kinds (block types).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of resource kinds a mod can declare.
///
/// Variant order is the catalog walk order, so `Ord` on this enum is what
/// makes every per-kind iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Named SQL query
    Query,
    /// Compliance control
    Control,
    /// Group of controls and nested benchmarks
    Benchmark,
    /// Top-level dashboard
    Dashboard,
    /// Layout container inside a dashboard
    Container,
    /// Single-value card
    Card,
    /// Chart panel
    Chart,
    /// Flow diagram panel
    Flow,
    /// Hierarchy diagram panel
    Hierarchy,
    /// Static or query-backed image
    Image,
    /// User input (dashboard-scoped or global)
    Input,
    /// Table panel
    Table,
    /// Static text panel
    Text,
    /// Mod variable
    Variable,
    /// Local value
    Local,
}

impl ResourceKind {
    /// Every kind, in walk order
    pub const ALL: [ResourceKind; 15] = [
        Self::Query,
        Self::Control,
        Self::Benchmark,
        Self::Dashboard,
        Self::Container,
        Self::Card,
        Self::Chart,
        Self::Flow,
        Self::Hierarchy,
        Self::Image,
        Self::Input,
        Self::Table,
        Self::Text,
        Self::Variable,
        Self::Local,
    ];

    /// Block name used in qualified names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Control => "control",
            Self::Benchmark => "benchmark",
            Self::Dashboard => "dashboard",
            Self::Container => "container",
            Self::Card => "card",
            Self::Chart => "chart",
            Self::Flow => "flow",
            Self::Hierarchy => "hierarchy",
            Self::Image => "image",
            Self::Input => "input",
            Self::Table => "table",
            Self::Text => "text",
            Self::Variable => "variable",
            Self::Local => "local",
        }
    }

    /// Whether resources of this kind can produce query results
    #[must_use]
    pub const fn is_query_provider(self) -> bool {
        matches!(
            self,
            Self::Query
                | Self::Control
                | Self::Card
                | Self::Chart
                | Self::Flow
                | Self::Hierarchy
                | Self::Input
                | Self::Table
        )
    }

    /// Whether references held by this kind are recorded in the reference index
    #[must_use]
    pub const fn is_referenceable(self) -> bool {
        !matches!(self, Self::Variable | Self::Local)
    }

    /// Whether additions of this kind are mirrored by unqualified name
    #[must_use]
    pub const fn mirrors_locally(self) -> bool {
        matches!(self, Self::Query | Self::Control | Self::Benchmark)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_parse_unknown() {
        let result = "widget".parse::<ResourceKind>();
        assert_eq!(result, Err(CoreError::UnknownKind("widget".to_string())));
    }

    #[test]
    fn test_kind_order_matches_walk_order() {
        let mut sorted = ResourceKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ResourceKind::ALL);
        assert!(ResourceKind::Query < ResourceKind::Local);
    }

    #[test]
    fn test_query_providers() {
        let providers: Vec<_> = ResourceKind::ALL
            .into_iter()
            .filter(|k| k.is_query_provider())
            .collect();
        assert_eq!(providers.len(), 8);
        assert!(!ResourceKind::Dashboard.is_query_provider());
        assert!(!ResourceKind::Text.is_query_provider());
    }

    #[test]
    fn test_referenceable() {
        assert!(ResourceKind::Chart.is_referenceable());
        assert!(!ResourceKind::Variable.is_referenceable());
        assert!(!ResourceKind::Local.is_referenceable());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&ResourceKind::Hierarchy).unwrap();
        assert_eq!(json, "\"hierarchy\"");
    }
}
