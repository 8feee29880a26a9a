//! Rule grid model: one [`RuleEntry`] per validated field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single allowed value, either an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedValue {
    Int(i64),
    Str(String),
}

impl AllowedValue {
    /// Membership test against a record value. Integers only match numbers
    /// and strings only match strings.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int(n), Value::Number(num)) => match num.as_i64() {
                Some(v) => v == *n,
                None => num.as_f64() == Some(*n as f64),
            },
            (Self::Str(s), Value::String(v)) => s == v,
            _ => false,
        }
    }

    /// Numeric reading, used for age thresholds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Str(s) => s.trim().parse().ok(),
        }
    }
}

/// `true` when any allowed value matches `value`.
pub fn is_allowed(allowed: &[AllowedValue], value: &Value) -> bool {
    allowed.iter().any(|a| a.matches(value))
}

/// Declared value type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    Int,
    Str,
    Regex,
    List,
    ListList,
    /// Any other declared name; checked as scalar membership.
    Other(String),
}

impl ValueType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int => "int",
            Self::Str => "str",
            Self::Regex => "regex",
            Self::List => "list",
            Self::ListList => "listlist",
            Self::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "int" => Self::Int,
            "str" => Self::Str,
            "regex" => Self::Regex,
            "list" => Self::List,
            "listlist" => Self::ListList,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ValueType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ValueType> for String {
    fn from(ty: ValueType) -> Self {
        ty.as_str().to_string()
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed values of a field: a value list, or a raw pattern for `regex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedValues {
    Pattern(String),
    Values(Vec<AllowedValue>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub allowed_values: AllowedValues,
    pub value_type: ValueType,
}

/// Dependent field name to the values that make the target field applicable.
pub type Condition = IndexMap<String, Vec<AllowedValue>>;

/// Validation rules for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub condition: Option<Condition>,
    /// AND (`true`) or OR (`false`) across the dependent fields of `condition`.
    pub combine_and: bool,
    /// Skip the general participation gate for this field.
    #[serde(default)]
    pub excluded_from_general: bool,
    pub value_spec: Option<ValueSpec>,
    pub mandatory: bool,
}

impl RuleEntry {
    pub fn is_int(&self) -> bool {
        matches!(
            self.value_spec,
            Some(ValueSpec {
                value_type: ValueType::Int,
                ..
            })
        )
    }
}

/// Field name to [`RuleEntry`], in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleGrid {
    entries: IndexMap<String, RuleEntry>,
}

impl RuleGrid {
    pub fn get(&self, field: &str) -> Option<&RuleEntry> {
        self.entries.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mandatory field names in declaration order.
    pub fn mandatory_fields(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, e)| e.mandatory)
            .map(|(name, _)| name.as_str())
    }

    /// Fields whose declared value type is `int`.
    pub fn int_fields(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_int())
            .map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, RuleEntry)> for RuleGrid {
    fn from_iter<I: IntoIterator<Item = (String, RuleEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
