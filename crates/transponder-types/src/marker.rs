use serde::{Deserialize, Serialize};

use crate::shape::IndexKind;
use crate::value::Value;

/// Query text plus the language and optional dialect it is written for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub text: String,
    pub language: String,
    /// Driver dialect this text targets; `None` means dialect-neutral.
    pub dialect: Option<String>,
}

impl QuerySpec {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            dialect: None,
        }
    }

    pub fn for_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }
}

/// Declarative metadata attached to a method.
///
/// Markers come in two flavors. *Descriptive* markers (`Property`,
/// `PropertyIndex`, `OverrideByThis`) feed the entity describer or steer
/// rule expansion. *Dispatch* markers name the strategy that implements the
/// method; each distinct dispatch tag becomes one rule during expansion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Marker {
    /// Stored property overrides: explicit name, linked type, inverse name.
    Property {
        name: Option<String>,
        linked: Option<String>,
        inverse: Option<String>,
    },
    /// The property behind this accessor takes part in a single-property index.
    PropertyIndex { name: Option<String>, kind: IndexKind },
    /// Run a query and return all results (or the single result for scalar returns).
    Query(QuerySpec),
    /// Run a query and rebind the receiving proxy to its single result.
    Lookup(QuerySpec),
    /// Execute a command.
    Command(QuerySpec),
    /// A null result is replaced with this value.
    DefaultValue(Value),
    /// Run the method under elevated driver privilege.
    Sudo,
    /// Implement the method with the named terminal strategy.
    Delegate { strategy: String },
    /// Wrap the method with the named wrapping strategy.
    Advice { strategy: String },
    /// This declaration overrides same-signature declarations of other shapes.
    OverrideByThis,
    /// Caller-defined marker bound through the strategy catalog by tag.
    Custom {
        tag: String,
        #[serde(default)]
        args: serde_json::Value,
    },
}

impl Marker {
    /// Stored property marker with only an explicit name.
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property {
            name: Some(name.into()),
            linked: None,
            inverse: None,
        }
    }

    /// Stored property marker with only an explicit linked type.
    pub fn linked(type_name: impl Into<String>) -> Self {
        Self::Property {
            name: None,
            linked: Some(type_name.into()),
            inverse: None,
        }
    }

    pub fn query(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Query(QuerySpec::new(language, text))
    }

    pub fn lookup(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Lookup(QuerySpec::new(language, text))
    }

    pub fn command(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Command(QuerySpec::new(language, text))
    }

    pub fn custom(tag: impl Into<String>) -> Self {
        Self::Custom {
            tag: tag.into(),
            args: serde_json::Value::Null,
        }
    }

    /// Stable tag of the marker kind. Custom markers report their own tag.
    pub fn tag(&self) -> &str {
        match self {
            Self::Property { .. } => "property",
            Self::PropertyIndex { .. } => "property-index",
            Self::Query(_) => "query",
            Self::Lookup(_) => "lookup",
            Self::Command(_) => "command",
            Self::DefaultValue(_) => "default-value",
            Self::Sudo => "sudo",
            Self::Delegate { .. } => "delegate",
            Self::Advice { .. } => "advice",
            Self::OverrideByThis => "override-by-this",
            Self::Custom { tag, .. } => tag,
        }
    }

    /// Whether this marker names an implementation strategy.
    pub fn is_dispatch(&self) -> bool {
        !matches!(
            self,
            Self::Property { .. } | Self::PropertyIndex { .. } | Self::OverrideByThis
        )
    }

    /// Identity used to collapse repeated markers into one rule.
    ///
    /// `Delegate` and `Advice` are keyed by the strategy they name; every
    /// other dispatch marker is keyed by its tag, since the strategy reads the
    /// marker's arguments from the invoked method at call time.
    pub fn rule_key(&self) -> String {
        match self {
            Self::Delegate { strategy } => format!("delegate:{strategy}"),
            Self::Advice { strategy } => format!("advice:{strategy}"),
            other => other.tag().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_markers_are_not_dispatch() {
        assert!(!Marker::property("name").is_dispatch());
        assert!(!Marker::OverrideByThis.is_dispatch());
        assert!(!Marker::PropertyIndex { name: None, kind: IndexKind::Unique }.is_dispatch());
        assert!(Marker::Sudo.is_dispatch());
        assert!(Marker::custom("audit").is_dispatch());
    }

    #[test]
    fn rule_keys_collapse_by_tag_or_strategy() {
        assert_eq!(
            Marker::query("sql", "a").rule_key(),
            Marker::query("sql", "b").rule_key()
        );
        assert_ne!(
            Marker::Delegate { strategy: "x".into() }.rule_key(),
            Marker::Delegate { strategy: "y".into() }.rule_key()
        );
        assert_eq!(Marker::custom("audit").rule_key(), "audit");
    }

    #[test]
    fn marker_serde_roundtrip_keeps_custom_args() {
        let marker = Marker::Custom {
            tag: "audit".into(),
            args: serde_json::json!({ "level": 3 }),
        };
        let json = serde_json::to_string(&marker).unwrap();
        let back: Marker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, marker);
    }
}
