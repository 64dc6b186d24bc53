//! Creation-order resolution over the resource graph.
//!
//! Builds a DAG from attribute references and explicit `DependsOn` edges and
//! computes a topological order using Kahn's algorithm with deterministic
//! (alphabetical) tie-breaking.

use super::error::{StackError, StackResult};
use super::graph::ResourceGraph;
use std::collections::{HashMap, VecDeque};

/// Compute the order in which the platform must create the graph's nodes.
pub fn creation_order(graph: &ResourceGraph) -> StackResult<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<String>> = HashMap::new();

    for node in graph.nodes() {
        in_degree.insert(node.id.as_str(), 0);
        adjacency.insert(node.id.as_str(), Vec::new());
    }

    for node in graph.nodes() {
        for dep in node.node_dependencies() {
            let dependents = adjacency
                .get_mut(dep.as_str())
                .ok_or_else(|| StackError::UnresolvedReference {
                    from: node.id.clone(),
                    id: dep.clone(),
                })?;
            dependents.push(node.id.clone());
            if let Some(d) = in_degree.get_mut(node.id.as_str()) {
                *d += 1;
            }
        }
    }

    let mut zero_degree: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    zero_degree.sort_unstable();
    let mut queue: VecDeque<String> = zero_degree.into_iter().map(str::to_string).collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(current) = queue.pop_front() {
        let mut next_ready: Vec<String> = Vec::new();
        if let Some(neighbors) = adjacency.get(current.as_str()) {
            for neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(neighbor.clone());
                    }
                }
            }
        }
        next_ready.sort();
        queue.extend(next_ready);
        order.push(current);
    }

    if order.len() != graph.len() {
        let mut members: Vec<String> = graph
            .nodes()
            .map(|n| n.id.clone())
            .filter(|id| !order.contains(id))
            .collect();
        members.sort();
        return Err(StackError::CyclicReference { members });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::ResourceNode;
    use crate::core::params::ParameterRegistry;
    use crate::core::types::{Expr, ResourceKind};

    #[test]
    fn test_resolver_linear() {
        let reg = ParameterRegistry::new();
        let mut g = ResourceGraph::new();
        let a = g
            .add_node(&reg, ResourceNode::new("c", ResourceKind::Network))
            .unwrap();
        let b = g
            .add_node(&reg, ResourceNode::new("b", ResourceKind::Subnet).with("VpcId", &a))
            .unwrap();
        g.add_node(&reg, ResourceNode::new("a", ResourceKind::Route).with("S", &b))
            .unwrap();
        assert_eq!(creation_order(&g).unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_resolver_parallel_alphabetical() {
        let reg = ParameterRegistry::new();
        let mut g = ResourceGraph::new();
        g.add_node(&reg, ResourceNode::new("beta", ResourceKind::Subnet))
            .unwrap();
        g.add_node(&reg, ResourceNode::new("alpha", ResourceKind::Subnet))
            .unwrap();
        assert_eq!(creation_order(&g).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_resolver_diamond_with_depends_on() {
        let reg = ParameterRegistry::new();
        let mut g = ResourceGraph::new();
        let top = g
            .add_node(&reg, ResourceNode::new("top", ResourceKind::Network))
            .unwrap();
        let left = g
            .add_node(&reg, ResourceNode::new("left", ResourceKind::Subnet).with("V", &top))
            .unwrap();
        let right = g
            .add_node(&reg, ResourceNode::new("right", ResourceKind::Subnet).after(&top))
            .unwrap();
        g.add_node(
            &reg,
            ResourceNode::new("bottom", ResourceKind::Route)
                .with("L", Expr::get_att(&left, "Id"))
                .after(&right),
        )
        .unwrap();
        assert_eq!(
            creation_order(&g).unwrap(),
            vec!["top", "left", "right", "bottom"]
        );
    }

    #[test]
    fn test_resolver_cycle_via_appended_edge() {
        let reg = ParameterRegistry::new();
        let mut g = ResourceGraph::new();
        let a = g
            .add_node(&reg, ResourceNode::new("a", ResourceKind::Gateway))
            .unwrap();
        let b = g
            .add_node(&reg, ResourceNode::new("b", ResourceKind::Route).with("G", &a))
            .unwrap();
        g.add_node(&reg, ResourceNode::new("z", ResourceKind::Subnet))
            .unwrap();
        g.add_dependency(&a, &b).unwrap();
        let err = creation_order(&g).unwrap_err();
        assert_eq!(
            err,
            StackError::CyclicReference {
                members: vec!["a".to_string(), "b".to_string()]
            }
        );
    }
}
