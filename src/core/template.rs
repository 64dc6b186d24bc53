//! A template under construction: parameter registry plus resource graph.

use super::emitter::{self, Document};
use super::error::{StackError, StackResult};
use super::graph::{ConditionExpr, ResourceGraph, ResourceNode};
use super::naming::{tag_param_name, Tier};
use super::params::{ParamType, ParameterRegistry, TagValue};
use super::types::{ConditionHandle, Literal, NodeHandle, ParamHandle};

/// Schema version declared at the document root.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Owns everything one orchestration run declares.
///
/// Parameters and resources share one namespace; declarations on either side
/// go through here so neither can shadow the other.
#[derive(Debug, Clone)]
pub struct Template {
    pub description: String,
    parameters: ParameterRegistry,
    pub graph: ResourceGraph,
}

impl Template {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            parameters: ParameterRegistry::new(),
            graph: ResourceGraph::new(),
        }
    }

    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    fn unclaimed(&self, id: &str) -> StackResult<()> {
        if self.graph.contains_node(id) {
            return Err(StackError::DuplicateParameter { id: id.to_string() });
        }
        Ok(())
    }

    /// Declare a parameter. See [`ParameterRegistry::declare`].
    pub fn declare(
        &mut self,
        id: &str,
        param_type: ParamType,
        default: Option<Literal>,
        allowed_values: &[&str],
        description: &str,
    ) -> StackResult<ParamHandle> {
        self.unclaimed(id)?;
        self.parameters
            .declare(id, param_type, default, allowed_values, description)
    }

    pub fn declare_string(&mut self, id: &str, default: &str, description: &str) -> StackResult<ParamHandle> {
        self.unclaimed(id)?;
        self.parameters.declare_string(id, default, description)
    }

    pub fn declare_tag(&mut self, tier: Tier, tag: &str, value: &TagValue) -> StackResult<ParamHandle> {
        self.unclaimed(&tag_param_name(tier, tag))?;
        self.parameters.declare_tag(tier, tag, value)
    }

    /// Insert a node, validating it against the declared parameters.
    pub fn add_node(&mut self, node: ResourceNode) -> StackResult<NodeHandle> {
        self.graph.add_node(&self.parameters, node)
    }

    pub fn add_condition(&mut self, name: &str, expr: ConditionExpr) -> StackResult<ConditionHandle> {
        self.graph.add_condition(&self.parameters, name, expr)
    }

    pub fn add_dependency(&mut self, node: &NodeHandle, after: &NodeHandle) -> StackResult<()> {
        self.graph.add_dependency(node, after)
    }

    pub fn emit(&self) -> StackResult<Document> {
        emitter::emit(&self.description, &self.graph, &self.parameters)
    }
}
