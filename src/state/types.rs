//! State document type definitions
//!
//! The snapshot is the unit of synchronization: it is always written and
//! replaced as a whole. Every field carries a serde default so that a
//! partially-populated document still loads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current schema version stamped into fresh snapshots
pub const SCHEMA_VERSION: u32 = 1;

/// Default trigger prefix (e.g. `:date`)
pub const DEFAULT_TRIGGER_PREFIX: &str = ":";

// ============================================
// VARIABLES
// ============================================

/// Kind of value a variable holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    Time,
    List,
}

/// A primitive or list value stored in a variable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<VariableValue>),
}

impl VariableValue {
    /// The string form when the value is a string, for format lookups
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            // Whole floats print without a fractional part (2.0 -> "2")
            Self::Number(n) => match n.as_f64() {
                Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < 1e15 => {
                    write!(f, "{}", x as i64)
                }
                _ => write!(f, "{}", n),
            },
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for VariableValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for VariableValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for VariableValue {
    /// Non-finite numbers have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

/// A named substitution source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: VariableType,
    #[serde(default)]
    pub default: VariableValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Variable {
    pub fn new(id: impl Into<String>, kind: VariableType, default: impl Into<VariableValue>) -> Self {
        Self {
            id: id.into(),
            kind,
            default: default.into(),
            label: None,
        }
    }
}

// ============================================
// CUES
// ============================================

fn default_enabled() -> bool {
    true
}

/// One expansion rule: a trigger and the template it expands into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub id: String,
    pub trigger: String,
    #[serde(default)]
    pub template: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Cue {
    pub fn new(id: impl Into<String>, trigger: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trigger: trigger.into(),
            template: template.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================
// SETTINGS
// ============================================

fn default_auto_expand() -> bool {
    true
}
fn default_trigger_prefix() -> String {
    DEFAULT_TRIGGER_PREFIX.to_string()
}

/// User-level expansion settings stored in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Gates whether the matcher runs at all
    #[serde(default = "default_auto_expand")]
    pub auto_expand: bool,
    #[serde(default = "default_trigger_prefix")]
    pub trigger_prefix: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_expand: true,
            trigger_prefix: default_trigger_prefix(),
            case_sensitive: false,
        }
    }
}

// ============================================
// SNAPSHOT
// ============================================

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Unix milliseconds of the last write, 0 if never written
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for Meta {
    fn default() -> Self {
        Meta {
            schema_version: SCHEMA_VERSION,
            updated_at: 0,
        }
    }
}

/// The complete, atomically-replaced state document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default)]
    pub cues: Vec<Cue>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub meta: Meta,
}

impl StateSnapshot {
    /// Parse a document, treating anything malformed as absent
    pub fn from_json_lenient(json: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed state document, treating as absent");
                None
            }
        }
    }

    pub fn enabled_cues(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter().filter(|cue| cue.enabled)
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Stamp the write time, as every store does on `set`
    pub fn stamped(mut self) -> Self {
        self.meta.updated_at = chrono::Utc::now().timestamp_millis();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_snapshot_defaults_missing_collections() {
        let snapshot: StateSnapshot =
            serde_json::from_str(r#"{"cues":[{"id":"1","trigger":":hi"}]}"#).unwrap();

        assert_eq!(snapshot.cues.len(), 1);
        assert!(snapshot.cues[0].enabled);
        assert_eq!(snapshot.cues[0].template, "");
        assert!(snapshot.variables.is_empty());
        assert_eq!(snapshot.settings, Settings::default());
        assert_eq!(snapshot.meta.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_empty_object_is_default_snapshot() {
        let snapshot: StateSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, StateSnapshot::default());
    }

    #[test]
    fn test_malformed_document_is_absent() {
        assert!(StateSnapshot::from_json_lenient("{not json").is_none());
        assert!(StateSnapshot::from_json_lenient(r#"{"cues":"oops"}"#).is_none());
    }

    #[test]
    fn test_settings_camel_case() {
        let settings: Settings = serde_json::from_str(
            r#"{"autoExpand":false,"triggerPrefix":"/","caseSensitive":true}"#,
        )
        .unwrap();
        assert!(!settings.auto_expand);
        assert_eq!(settings.trigger_prefix, "/");
        assert!(settings.case_sensitive);
    }

    #[test]
    fn test_variable_value_untagged() {
        let v: Variable =
            serde_json::from_str(r#"{"id":"n","type":"number","default":42}"#).unwrap();
        assert_eq!(v.kind, VariableType::Number);
        assert_eq!(v.default.to_string(), "42");

        let v: Variable =
            serde_json::from_str(r#"{"id":"l","type":"list","default":["a",1,true]}"#).unwrap();
        assert_eq!(v.default.to_string(), "a,1,true");

        let v: Variable = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(v.kind, VariableType::Text);
        assert_eq!(v.default, VariableValue::Null);
        assert_eq!(v.default.to_string(), "");
    }

    #[test]
    fn test_number_stringification() {
        assert_eq!(VariableValue::from(7_i64).to_string(), "7");
        assert_eq!(VariableValue::from(1.5_f64).to_string(), "1.5");
        assert_eq!(VariableValue::from(2.0_f64).to_string(), "2");
        assert_eq!(VariableValue::from(f64::NAN), VariableValue::Null);
        assert_eq!(VariableValue::from(false).to_string(), "false");
    }

    #[test]
    fn test_enabled_cues_filters_disabled() {
        let snapshot = StateSnapshot {
            cues: vec![Cue::new("1", ":a", "A"), Cue::new("2", ":b", "B").disabled()],
            ..Default::default()
        };
        let ids: Vec<_> = snapshot.enabled_cues().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_stamped_sets_updated_at() {
        let snapshot = StateSnapshot::default().stamped();
        assert!(snapshot.meta.updated_at > 0);
    }
}
