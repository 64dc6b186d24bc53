//! Parameter registry: named, typed, defaulted template inputs.
//!
//! Parameters are declared once and never mutated. Resources reference them
//! by identifier; the provisioning platform substitutes runtime values or the
//! declared defaults.

use super::error::{StackError, StackResult};
use super::naming::{tag_param_name, Tier};
use super::types::{Literal, ParamHandle};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    String,
    Number,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "String"),
            Self::Number => write!(f, "Number"),
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: String,
    pub param_type: ParamType,
    pub default: Option<Literal>,
    pub allowed_values: Vec<String>,
    pub description: String,
}

/// Value of an externally configurable tag.
///
/// Either a single fixed default, or an enumerated set with one chosen default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTagValue", into = "RawTagValue")]
pub enum TagValue {
    Fixed(String),
    Enumerated(Choices),
}

/// Non-empty list of allowed values with an in-range default.
///
/// Fields are private: every constructor checks both conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices {
    values: Vec<String>,
    default_index: usize,
}

impl Choices {
    fn from_parts(values: Vec<String>, default_index: usize) -> Result<Self, String> {
        if values.is_empty() {
            return Err("enumerated tag value needs at least one allowed value".to_string());
        }
        if default_index >= values.len() {
            return Err(format!(
                "default index {} out of range for {} allowed value(s)",
                default_index,
                values.len()
            ));
        }
        Ok(Self {
            values,
            default_index,
        })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn default_value(&self) -> &str {
        &self.values[self.default_index]
    }
}

impl TagValue {
    pub fn fixed(value: &str) -> Self {
        Self::Fixed(value.to_string())
    }

    /// Enumerated tag value; fails on an empty list or out-of-range index.
    pub fn enumerated(values: &[&str], default_index: usize) -> Result<Self, String> {
        Self::from_parts(values.iter().map(|v| v.to_string()).collect(), default_index)
    }

    /// Enumerated tag value whose default is `first`.
    pub fn choices<S: Into<String>>(first: S, rest: impl IntoIterator<Item = S>) -> Self {
        let mut values = vec![first.into()];
        values.extend(rest.into_iter().map(Into::into));
        Self::Enumerated(Choices {
            values,
            default_index: 0,
        })
    }

    fn from_parts(values: Vec<String>, default_index: usize) -> Result<Self, String> {
        Choices::from_parts(values, default_index).map(Self::Enumerated)
    }

    pub fn default_value(&self) -> &str {
        match self {
            Self::Fixed(v) => v,
            Self::Enumerated(choices) => choices.default_value(),
        }
    }

    pub fn allowed_values(&self) -> &[String] {
        match self {
            Self::Fixed(_) => &[],
            Self::Enumerated(choices) => choices.values(),
        }
    }
}

/// Wire form of [`TagValue`]: a scalar, a list (first is default), or an
/// explicit `{values, default}` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTagValue {
    Fixed(Scalar),
    List(Vec<Scalar>),
    Explicit { values: Vec<Scalar>, default: Scalar },
}

/// A YAML scalar read as text, so `true` and `3` are accepted like `"true"`
/// and `"3"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Text(v) => v,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
        }
    }
}

fn texts(values: Vec<Scalar>) -> Vec<String> {
    values.into_iter().map(String::from).collect()
}

impl TryFrom<RawTagValue> for TagValue {
    type Error = String;

    fn try_from(raw: RawTagValue) -> Result<Self, Self::Error> {
        match raw {
            RawTagValue::Fixed(v) => Ok(TagValue::Fixed(v.into())),
            RawTagValue::List(values) => TagValue::from_parts(texts(values), 0),
            RawTagValue::Explicit { values, default } => {
                let values = texts(values);
                let default = String::from(default);
                let index = values
                    .iter()
                    .position(|v| *v == default)
                    .ok_or_else(|| format!("default '{}' is not one of [{}]", default, values.join(", ")))?;
                TagValue::from_parts(values, index)
            }
        }
    }
}

impl From<TagValue> for RawTagValue {
    fn from(value: TagValue) -> Self {
        match value {
            TagValue::Fixed(v) => RawTagValue::Fixed(Scalar::Text(v)),
            TagValue::Enumerated(choices) => {
                let default = choices.default_value().to_string();
                let values: Vec<Scalar> = choices.values.into_iter().map(Scalar::Text).collect();
                if choices.default_index == 0 {
                    RawTagValue::List(values)
                } else {
                    RawTagValue::Explicit {
                        values,
                        default: Scalar::Text(default),
                    }
                }
            }
        }
    }
}

/// Check that an identifier is non-empty and strictly `[A-Za-z0-9]`.
pub fn validate_identifier(id: &str) -> StackResult<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StackError::InvalidIdentifier { id: id.to_string() });
    }
    Ok(())
}

/// Registry of declared parameters, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    params: IndexMap<String, Parameter>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter.
    ///
    /// With non-empty `allowed_values`, a given default must be a member; when
    /// no default is given, the first allowed value becomes the default.
    pub fn declare(
        &mut self,
        id: &str,
        param_type: ParamType,
        default: Option<Literal>,
        allowed_values: &[&str],
        description: &str,
    ) -> StackResult<ParamHandle> {
        validate_identifier(id)?;
        if self.params.contains_key(id) {
            return Err(StackError::DuplicateParameter { id: id.to_string() });
        }

        let allowed: Vec<String> = allowed_values.iter().map(|v| v.to_string()).collect();
        let default = match (default, allowed.first()) {
            (Some(d), Some(_)) => {
                let rendered = d.to_string();
                if !allowed.contains(&rendered) {
                    return Err(StackError::InvalidDefault {
                        id: id.to_string(),
                        default: rendered,
                        allowed,
                    });
                }
                Some(d)
            }
            (None, Some(first)) => Some(Literal::String(first.clone())),
            (d, None) => d,
        };

        debug!(parameter = id, %param_type, "declared parameter");
        self.params.insert(
            id.to_string(),
            Parameter {
                id: id.to_string(),
                param_type,
                default,
                allowed_values: allowed,
                description: description.to_string(),
            },
        );
        Ok(ParamHandle { id: id.to_string() })
    }

    /// Declare a `String` parameter with a plain default.
    pub fn declare_string(
        &mut self,
        id: &str,
        default: &str,
        description: &str,
    ) -> StackResult<ParamHandle> {
        self.declare(id, ParamType::String, Some(Literal::from(default)), &[], description)
    }

    /// Declare the parameter backing a tier's tag.
    pub fn declare_tag(&mut self, tier: Tier, tag: &str, value: &TagValue) -> StackResult<ParamHandle> {
        let id = tag_param_name(tier, tag);
        let allowed: Vec<&str> = value.allowed_values().iter().map(String::as_str).collect();
        self.declare(
            &id,
            ParamType::String,
            Some(Literal::from(value.default_value())),
            &allowed,
            &format!("Value of {} tag for {} instances", tag, tier),
        )
    }

    pub fn resolve(&self, id: &str) -> StackResult<ParamHandle> {
        if self.params.contains_key(id) {
            Ok(ParamHandle { id: id.to_string() })
        } else {
            Err(StackError::UnknownParameter { id: id.to_string() })
        }
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.params.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.params.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
