//! Preview evaluation of conditions and intrinsic functions.
//!
//! The provisioning platform evaluates `Fn::If`, `Fn::Split`, `Fn::Select` and
//! friends at deploy time. This module mirrors those semantics offline so a
//! template can be inspected for a given set of parameter values, with
//! stand-in values for references to resources that do not exist yet.

use super::emitter::literal_to_json;
use super::error::{StackError, StackResult};
use super::graph::ConditionExpr;
use super::template::Template;
use super::types::{Expr, Pseudo, RefTarget};
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::HashMap;

const DEFAULT_REGION: &str = "us-east-1";

/// Outcome of evaluating an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Value(Value),
    /// `AWS::NoValue`: the attribute is removed
    NoValue,
}

impl Evaluated {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::NoValue => None,
        }
    }
}

/// Evaluates expressions of one template against supplied values.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    template: &'a Template,
    region: String,
    parameters: HashMap<String, String>,
    node_values: HashMap<String, String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(template: &'a Template) -> Self {
        Self {
            template,
            region: DEFAULT_REGION.to_string(),
            parameters: HashMap::new(),
            node_values: HashMap::new(),
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    /// Override a parameter's default.
    pub fn with_parameter(mut self, id: &str, value: &str) -> Self {
        self.parameters.insert(id.to_string(), value.to_string());
        self
    }

    /// Stand-in for `Ref(node)`, e.g. a synthetic ARN.
    pub fn with_node_ref(mut self, id: &str, value: &str) -> Self {
        self.node_values.insert(id.to_string(), value.to_string());
        self
    }

    /// Stand-in for `GetAtt(node, attribute)`.
    pub fn with_node_attribute(mut self, id: &str, attribute: &str, value: &str) -> Self {
        self.node_values
            .insert(format!("{}.{}", id, attribute), value.to_string());
        self
    }

    fn fail(owner: &str, message: String) -> StackError {
        StackError::Preview {
            owner: owner.to_string(),
            message,
        }
    }

    /// Effective parameter value: override, else declared default.
    pub fn parameter(&self, id: &str) -> StackResult<Value> {
        let declared = self
            .template
            .parameters()
            .get(id)
            .ok_or_else(|| StackError::UnknownParameter { id: id.to_string() })?;
        if let Some(v) = self.parameters.get(id) {
            return Ok(Value::String(v.clone()));
        }
        match &declared.default {
            Some(d) => literal_to_json(id, d),
            None => Err(Self::fail(id, "no value supplied and no default".to_string())),
        }
    }

    pub fn condition(&self, name: &str) -> StackResult<bool> {
        let expr = self
            .template
            .graph
            .condition(name)
            .ok_or_else(|| Self::fail(name, "unknown condition".to_string()))?;
        match expr {
            ConditionExpr::Equals(a, b) => {
                let a = self.evaluate(name, a)?;
                let b = self.evaluate(name, b)?;
                Ok(scalar_text(name, &a)? == scalar_text(name, &b)?)
            }
        }
    }

    /// Evaluate one attribute of a declared resource.
    pub fn attribute(&self, node_id: &str, name: &str) -> StackResult<Evaluated> {
        let node = self
            .template
            .graph
            .node(node_id)
            .ok_or_else(|| Self::fail(node_id, "unknown resource".to_string()))?;
        let expr = node
            .properties
            .get(name)
            .ok_or_else(|| Self::fail(node_id, format!("no attribute '{}'", name)))?;
        self.evaluate(node_id, expr)
    }

    pub fn evaluate(&self, owner: &str, expr: &Expr) -> StackResult<Evaluated> {
        let value = match expr {
            Expr::Literal(lit) => literal_to_json(owner, lit)?,
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Evaluated::Value(v) = self.evaluate(owner, item)? {
                        out.push(v);
                    }
                }
                Value::Array(out)
            }
            Expr::Map(entries) => {
                let mut out = Map::new();
                for (k, v) in entries {
                    if let Evaluated::Value(v) = self.evaluate(owner, v)? {
                        out.insert(k.clone(), v);
                    }
                }
                Value::Object(out)
            }
            Expr::Ref(RefTarget::Pseudo(Pseudo::NoValue)) => return Ok(Evaluated::NoValue),
            Expr::Ref(RefTarget::Pseudo(Pseudo::Region)) => Value::String(self.region.clone()),
            Expr::Ref(RefTarget::Parameter(id)) => self.parameter(id)?,
            Expr::Ref(RefTarget::Node(id)) => self
                .node_values
                .get(id)
                .map(|v| Value::String(v.clone()))
                .ok_or_else(|| Self::fail(owner, format!("no stand-in value for resource '{}'", id)))?,
            Expr::GetAtt { node, attribute } => {
                let key = format!("{}.{}", node, attribute);
                self.node_values
                    .get(&key)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| Self::fail(owner, format!("no stand-in value for {}", key)))?
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                return if self.condition(condition)? {
                    self.evaluate(owner, then)
                } else {
                    self.evaluate(owner, otherwise)
                };
            }
            Expr::Join { delimiter, parts } => {
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts {
                    let v = self.evaluate(owner, part)?;
                    pieces.push(scalar_text(owner, &v)?);
                }
                Value::String(pieces.join(delimiter))
            }
            Expr::Split { delimiter, source } => {
                let text = scalar_text(owner, &self.evaluate(owner, source)?)?;
                Value::Array(
                    text.split(delimiter.as_str())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                )
            }
            Expr::Select { index, source } => match self.evaluate(owner, source)? {
                Evaluated::Value(Value::Array(items)) => {
                    let len = items.len();
                    items.into_iter().nth(*index).ok_or_else(|| {
                        Self::fail(owner, format!("select index {} out of range for {} item(s)", index, len))
                    })?
                }
                other => {
                    return Err(Self::fail(owner, format!("select source is not a list: {:?}", other)))
                }
            },
            Expr::GetAzs(region) => {
                let region = scalar_text(owner, &self.evaluate(owner, region)?)?;
                Value::Array(
                    ["a", "b", "c"]
                        .iter()
                        .map(|zone| Value::String(format!("{}{}", region, zone)))
                        .collect(),
                )
            }
            Expr::Base64(payload) => {
                let text = scalar_text(owner, &self.evaluate(owner, payload)?)?;
                Value::String(base64::engine::general_purpose::STANDARD.encode(text))
            }
        };
        Ok(Evaluated::Value(value))
    }
}

fn scalar_text(owner: &str, v: &Evaluated) -> StackResult<String> {
    match v {
        Evaluated::Value(Value::String(s)) => Ok(s.clone()),
        Evaluated::Value(Value::Number(n)) => Ok(n.to_string()),
        Evaluated::Value(Value::Bool(b)) => Ok(b.to_string()),
        other => Err(Evaluator::fail(owner, format!("expected a scalar, got {:?}", other))),
    }
}
