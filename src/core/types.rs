//! Core types: literals, attribute expressions, resource kinds and handles.
//!
//! An [`Expr`] is what a resource attribute holds. References stay symbolic
//! (node id, parameter id, condition name) until the emitter maps them to the
//! platform's intrinsic-function form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Literals
// ============================================================================

/// A scalar value: parameter defaults and literal attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Literal {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Platform-provided pseudo parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    /// `AWS::Region`
    Region,
    /// `AWS::NoValue`: removes the attribute (or list element) entirely
    NoValue,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "AWS::Region",
            Self::NoValue => "AWS::NoValue",
        }
    }
}

/// Target of a `Ref`.
#[derive(Debug, Clone, PartialEq)]
pub enum RefTarget {
    Node(String),
    Parameter(String),
    Pseudo(Pseudo),
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    List(Vec<Expr>),
    Map(IndexMap<String, Expr>),
    Ref(RefTarget),
    GetAtt {
        node: String,
        attribute: String,
    },
    If {
        condition: String,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Join {
        delimiter: String,
        parts: Vec<Expr>,
    },
    Split {
        delimiter: String,
        source: Box<Expr>,
    },
    Select {
        index: usize,
        source: Box<Expr>,
    },
    GetAzs(Box<Expr>),
    Base64(Box<Expr>),
}

impl Expr {
    pub fn region() -> Self {
        Self::Ref(RefTarget::Pseudo(Pseudo::Region))
    }

    pub fn no_value() -> Self {
        Self::Ref(RefTarget::Pseudo(Pseudo::NoValue))
    }

    pub fn list<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Ordered map literal from `(key, value)` pairs.
    pub fn map<I, K, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<Expr>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get_att(node: &NodeHandle, attribute: &str) -> Self {
        Self::GetAtt {
            node: node.id.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// `value` when `condition` holds, otherwise `otherwise`.
    pub fn if_else(condition: &ConditionHandle, then: Expr, otherwise: Expr) -> Self {
        Self::If {
            condition: condition.name.clone(),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// `value` when `condition` holds, otherwise the attribute is absent.
    pub fn when(condition: &ConditionHandle, then: Expr) -> Self {
        Self::if_else(condition, then, Self::no_value())
    }

    pub fn join(delimiter: &str, parts: Vec<Expr>) -> Self {
        Self::Join {
            delimiter: delimiter.to_string(),
            parts,
        }
    }

    pub fn split(delimiter: &str, source: Expr) -> Self {
        Self::Split {
            delimiter: delimiter.to_string(),
            source: Box::new(source),
        }
    }

    pub fn select(index: usize, source: Expr) -> Self {
        Self::Select {
            index,
            source: Box::new(source),
        }
    }

    pub fn get_azs(region: Expr) -> Self {
        Self::GetAzs(Box::new(region))
    }

    pub fn base64(payload: Expr) -> Self {
        Self::Base64(Box::new(payload))
    }

    /// Collect every symbolic reference embedded in this expression.
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        match self {
            Self::Literal(_) => {}
            Self::List(items) | Self::Join { parts: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Self::Ref(RefTarget::Node(id)) => out.push(Reference::Node(id.clone())),
            Self::Ref(RefTarget::Parameter(id)) => out.push(Reference::Parameter(id.clone())),
            Self::Ref(RefTarget::Pseudo(_)) => {}
            Self::GetAtt { node, .. } => out.push(Reference::Node(node.clone())),
            Self::If {
                condition,
                then,
                otherwise,
            } => {
                out.push(Reference::Condition(condition.clone()));
                then.collect_references(out);
                otherwise.collect_references(out);
            }
            Self::Split { source, .. } | Self::Select { source, .. } => {
                source.collect_references(out)
            }
            Self::GetAzs(inner) | Self::Base64(inner) => inner.collect_references(out),
        }
    }
}

impl From<Literal> for Expr {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::Literal(Literal::from(s))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Self::Literal(Literal::String(s))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Self::Literal(Literal::Integer(n))
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Self::Literal(Literal::Float(x))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }
}

impl From<&NodeHandle> for Expr {
    fn from(h: &NodeHandle) -> Self {
        Self::Ref(RefTarget::Node(h.id.clone()))
    }
}

impl From<&ParamHandle> for Expr {
    fn from(h: &ParamHandle) -> Self {
        Self::Ref(RefTarget::Parameter(h.id.clone()))
    }
}

/// A symbolic reference found inside an expression or ordering edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Node(String),
    Parameter(String),
    Condition(String),
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Self::Node(id) | Self::Parameter(id) | Self::Condition(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "resource",
            Self::Parameter(_) => "parameter",
            Self::Condition(_) => "condition",
        }
    }
}

// ============================================================================
// Resource kinds
// ============================================================================

/// Closed set of resource kinds the builder can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Network,
    Subnet,
    Gateway,
    GatewayAttachment,
    RouteTable,
    Route,
    SubnetRouteTableAssociation,
    SecurityGroup,
    LaunchTemplate,
    ScalingGroup,
    ScalingPolicy,
    LoadBalancer,
    Listener,
    ListenerRule,
    TargetGroup,
    Alarm,
    Role,
    Policy,
    InstanceProfile,
}

impl ResourceKind {
    /// Resource type string understood by the provisioning platform.
    pub fn platform_type(&self) -> &'static str {
        match self {
            Self::Network => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::Gateway => "AWS::EC2::InternetGateway",
            Self::GatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::Route => "AWS::EC2::Route",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::LaunchTemplate => "AWS::AutoScaling::LaunchConfiguration",
            Self::ScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::ScalingPolicy => "AWS::AutoScaling::ScalingPolicy",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::ListenerRule => "AWS::ElasticLoadBalancingV2::ListenerRule",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Alarm => "AWS::CloudWatch::Alarm",
            Self::Role => "AWS::IAM::Role",
            Self::Policy => "AWS::IAM::Policy",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Subnet => "subnet",
            Self::Gateway => "gateway",
            Self::GatewayAttachment => "gateway-attachment",
            Self::RouteTable => "route-table",
            Self::Route => "route",
            Self::SubnetRouteTableAssociation => "subnet-route-table-association",
            Self::SecurityGroup => "security-rule-group",
            Self::LaunchTemplate => "launch-template",
            Self::ScalingGroup => "scaling-group",
            Self::ScalingPolicy => "scaling-policy",
            Self::LoadBalancer => "load-balancer",
            Self::Listener => "listener",
            Self::ListenerRule => "listener-rule",
            Self::TargetGroup => "target-group",
            Self::Alarm => "alarm",
            Self::Role => "role",
            Self::Policy => "policy",
            Self::InstanceProfile => "instance-profile",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Handles
// ============================================================================

/// Handle to a declared resource node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: String,
    pub kind: ResourceKind,
}

impl NodeHandle {
    pub fn to_ref(&self) -> Expr {
        Expr::from(self)
    }
}

/// Handle to a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamHandle {
    pub id: String,
}

impl ParamHandle {
    pub fn to_ref(&self) -> Expr {
        Expr::from(self)
    }
}

/// Handle to a declared condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionHandle {
    pub name: String,
}

// ============================================================================
// Tags
// ============================================================================

/// A resource tag. Scaling-group tags additionally propagate to instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub key: String,
    pub value: Expr,
}

impl Tag {
    pub fn new(key: &str, value: Expr) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }

    pub fn to_expr(&self) -> Expr {
        Expr::map([("Key", Expr::from(self.key.as_str())), ("Value", self.value.clone())])
    }

    pub fn to_propagating_expr(&self) -> Expr {
        Expr::map([
            ("Key", Expr::from(self.key.as_str())),
            ("Value", self.value.clone()),
            ("PropagateAtLaunch", Expr::from(true)),
        ])
    }
}

/// Render a tag list as a plain attribute value.
pub fn tags_expr(tags: &[Tag]) -> Expr {
    Expr::List(tags.iter().map(Tag::to_expr).collect())
}
