//! Resource graph: typed nodes, conditions and reference edges.
//!
//! Nodes are inserted exactly once. Every reference a node carries must
//! already exist when it is inserted, so insertion order is a valid creation
//! order. The only mutation after insertion is appending explicit ordering
//! edges with [`ResourceGraph::add_dependency`].

use super::error::{StackError, StackResult};
use super::params::{validate_identifier, ParameterRegistry};
use super::types::{ConditionHandle, Expr, NodeHandle, Reference, ResourceKind};
use indexmap::IndexMap;
use tracing::debug;

/// A declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    /// Attribute name → value, in declaration order
    pub properties: IndexMap<String, Expr>,
    /// Explicit ordering edges (node ids that must exist first)
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn new(id: &str, kind: ResourceKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            properties: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Set an attribute.
    pub fn with(mut self, name: &str, value: impl Into<Expr>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Set an attribute only when a value is present.
    pub fn with_opt(self, name: &str, value: Option<Expr>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn after(mut self, dep: &NodeHandle) -> Self {
        if !self.depends_on.contains(&dep.id) {
            self.depends_on.push(dep.id.clone());
        }
        self
    }

    /// Every reference carried by this node: attribute references first,
    /// then ordering edges.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs: Vec<Reference> = self
            .properties
            .values()
            .flat_map(Expr::references)
            .collect();
        refs.extend(self.depends_on.iter().cloned().map(Reference::Node));
        refs
    }

    /// Node ids this node must be created after.
    pub fn node_dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for r in self.references() {
            if let Reference::Node(id) = r {
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
        }
        deps
    }
}

/// Boolean expression over parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Equals(Expr, Expr),
}

impl ConditionExpr {
    pub fn references(&self) -> Vec<Reference> {
        match self {
            Self::Equals(a, b) => {
                let mut refs = a.references();
                refs.extend(b.references());
                refs
            }
        }
    }
}

/// The resource graph of one template.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    conditions: IndexMap<String, ConditionExpr>,
    nodes: IndexMap<String, ResourceNode>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named condition. It may only reference parameters.
    pub fn add_condition(
        &mut self,
        registry: &ParameterRegistry,
        name: &str,
        expr: ConditionExpr,
    ) -> StackResult<ConditionHandle> {
        if name.is_empty() {
            return Err(StackError::InvalidIdentifier { id: String::new() });
        }
        if self.conditions.contains_key(name) {
            return Err(StackError::DuplicateCondition {
                name: name.to_string(),
            });
        }
        for r in expr.references() {
            let known = match &r {
                Reference::Parameter(id) => registry.contains(id),
                Reference::Condition(id) => self.conditions.contains_key(id),
                Reference::Node(_) => false,
            };
            if !known {
                return Err(StackError::DanglingReference {
                    from: name.to_string(),
                    target: r.id().to_string(),
                    target_kind: r.kind(),
                });
            }
        }
        debug!(condition = name, "declared condition");
        self.conditions.insert(name.to_string(), expr);
        Ok(ConditionHandle {
            name: name.to_string(),
        })
    }

    /// Insert a node after checking identity and reference integrity.
    pub fn add_node(
        &mut self,
        registry: &ParameterRegistry,
        node: ResourceNode,
    ) -> StackResult<NodeHandle> {
        validate_identifier(&node.id)?;
        if self.nodes.contains_key(&node.id) {
            return Err(StackError::DuplicateNode {
                id: node.id,
                existing: "resource",
            });
        }
        if registry.contains(&node.id) {
            return Err(StackError::DuplicateNode {
                id: node.id,
                existing: "parameter",
            });
        }
        for r in node.references() {
            if !self.is_declared(registry, &r) {
                return Err(StackError::DanglingReference {
                    from: node.id.clone(),
                    target: r.id().to_string(),
                    target_kind: r.kind(),
                });
            }
        }

        debug!(resource = %node.id, kind = %node.kind, "declared resource");
        let handle = NodeHandle {
            id: node.id.clone(),
            kind: node.kind,
        };
        self.nodes.insert(node.id.clone(), node);
        Ok(handle)
    }

    /// Append an explicit ordering edge: `node` is created after `after`.
    pub fn add_dependency(&mut self, node: &NodeHandle, after: &NodeHandle) -> StackResult<()> {
        if !self.nodes.contains_key(&after.id) {
            return Err(StackError::DanglingReference {
                from: node.id.clone(),
                target: after.id.clone(),
                target_kind: "resource",
            });
        }
        let entry = self
            .nodes
            .get_mut(&node.id)
            .ok_or_else(|| StackError::UnknownNode { id: node.id.clone() })?;
        if !entry.depends_on.contains(&after.id) {
            entry.depends_on.push(after.id.clone());
        }
        Ok(())
    }

    fn is_declared(&self, registry: &ParameterRegistry, r: &Reference) -> bool {
        match r {
            Reference::Node(id) => self.nodes.contains_key(id),
            Reference::Parameter(id) => registry.contains(id),
            Reference::Condition(name) => self.conditions.contains_key(name),
        }
    }

    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionExpr> {
        self.conditions.get(name)
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&String, &ConditionExpr)> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
