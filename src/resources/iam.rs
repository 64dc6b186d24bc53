//! Instance role, inline policy and instance profile.

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{Expr, NodeHandle, ResourceKind};

/// A single statement of a policy document.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub effect: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    /// Service principals, for trust policies
    pub principal_services: Vec<String>,
}

impl Statement {
    pub fn allow(actions: &[&str]) -> Self {
        Self {
            effect: "Allow".to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources: Vec::new(),
            principal_services: Vec::new(),
        }
    }

    pub fn on(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn for_service(mut self, service: &str) -> Self {
        self.principal_services.push(service.to_string());
        self
    }

    fn to_expr(&self) -> Expr {
        let mut entries = vec![
            ("Effect", Expr::from(self.effect.as_str())),
            ("Action", Expr::list(self.actions.iter().cloned())),
        ];
        if !self.principal_services.is_empty() {
            entries.push((
                "Principal",
                Expr::map([("Service", Expr::list(self.principal_services.iter().cloned()))]),
            ));
        }
        if !self.resources.is_empty() {
            entries.push(("Resource", Expr::list(self.resources.iter().cloned())));
        }
        Expr::map(entries)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn to_expr(&self) -> Expr {
        Expr::map([(
            "Statement",
            Expr::List(self.statements.iter().map(Statement::to_expr).collect()),
        )])
    }
}

/// Role assumable by EC2 instances.
pub fn instance_role(t: &mut Template, id: &str) -> StackResult<NodeHandle> {
    let trust = PolicyDocument::new(vec![
        Statement::allow(&["sts:AssumeRole"]).for_service("ec2.amazonaws.com")
    ]);
    t.add_node(
        ResourceNode::new(id, ResourceKind::Role).with("AssumeRolePolicyDocument", trust.to_expr()),
    )
}

/// Inline policy attached to `roles`. The policy name is its identifier.
pub fn policy(
    t: &mut Template,
    id: &str,
    document: &PolicyDocument,
    roles: &[&NodeHandle],
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::Policy)
            .with("PolicyName", id)
            .with("PolicyDocument", document.to_expr())
            .with("Roles", Expr::list(roles.iter().copied())),
    )
}

pub fn instance_profile(
    t: &mut Template,
    id: &str,
    roles: &[&NodeHandle],
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::InstanceProfile)
            .with("Roles", Expr::list(roles.iter().copied())),
    )
}
