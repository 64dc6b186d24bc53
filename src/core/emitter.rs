//! Document emission: graph + parameter registry → provisioning document.
//!
//! References become `{"Ref": id}`, attribute lookups `{"Fn::GetAtt": [..]}`,
//! conditionals `{"Fn::If": [..]}`. Object keys are emitted in sorted order so
//! identical inputs always render byte-identical output.

use super::error::{StackError, StackResult};
use super::graph::{ConditionExpr, ResourceGraph, ResourceNode};
use super::params::{Parameter, ParameterRegistry};
use super::resolver;
use super::template::FORMAT_VERSION;
use super::types::{Expr, Literal, RefTarget};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A fully emitted document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    body: Value,
}

impl Document {
    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    pub fn to_yaml(&self) -> StackResult<String> {
        Ok(serde_yaml_ng::to_string(&self.body)?)
    }

    /// BLAKE3 of the compact JSON form. Returns `"blake3:{hex}"`.
    pub fn fingerprint(&self) -> String {
        format!("blake3:{}", blake3::hash(self.body.to_string().as_bytes()).to_hex())
    }

    fn section_keys(&self, section: &str) -> BTreeSet<String> {
        self.body
            .get(section)
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn parameter_ids(&self) -> BTreeSet<String> {
        self.section_keys("Parameters")
    }

    pub fn resource_ids(&self) -> BTreeSet<String> {
        self.section_keys("Resources")
    }

    pub fn condition_names(&self) -> BTreeSet<String> {
        self.section_keys("Conditions")
    }

    /// Resource bodies of the given platform type, keyed by id.
    pub fn resources_of_type<'a>(&'a self, platform_type: &'a str) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.body
            .get("Resources")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(move |(_, r)| r.get("Type").and_then(Value::as_str) == Some(platform_type))
    }

    /// Re-walk the emitted document and check every reference token against
    /// the identifiers the document itself declares.
    pub fn verify_references(&self) -> StackResult<()> {
        let params = self.parameter_ids();
        let resources = self.resource_ids();
        let conditions = self.condition_names();
        if let Some(id) = params.intersection(&resources).next() {
            return Err(StackError::DuplicateNode {
                id: id.clone(),
                existing: "parameter",
            });
        }
        let check = TokenCheck {
            params: &params,
            resources: &resources,
            conditions: &conditions,
        };

        if let Some(section) = self.body.get("Conditions").and_then(Value::as_object) {
            for (name, body) in section {
                check.walk(name, body)?;
            }
        }
        if let Some(section) = self.body.get("Resources").and_then(Value::as_object) {
            for (id, body) in section {
                if let Some(props) = body.get("Properties") {
                    check.walk(id, props)?;
                }
                match body.get("DependsOn") {
                    Some(Value::String(dep)) => check.resource(id, dep)?,
                    Some(Value::Array(deps)) => {
                        for dep in deps.iter().filter_map(Value::as_str) {
                            check.resource(id, dep)?;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

struct TokenCheck<'a> {
    params: &'a BTreeSet<String>,
    resources: &'a BTreeSet<String>,
    conditions: &'a BTreeSet<String>,
}

impl TokenCheck<'_> {
    fn unresolved(from: &str, id: &str) -> StackError {
        StackError::UnresolvedReference {
            from: from.to_string(),
            id: id.to_string(),
        }
    }

    fn resource(&self, from: &str, id: &str) -> StackResult<()> {
        if self.resources.contains(id) {
            Ok(())
        } else {
            Err(Self::unresolved(from, id))
        }
    }

    fn walk(&self, from: &str, value: &Value) -> StackResult<()> {
        match value {
            Value::Array(items) => items.iter().try_for_each(|v| self.walk(from, v)),
            Value::Object(map) => {
                if let Some(Value::String(id)) = map.get("Ref") {
                    let known = id.starts_with("AWS::")
                        || self.params.contains(id)
                        || self.resources.contains(id);
                    if !known {
                        return Err(Self::unresolved(from, id));
                    }
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(id) = args.first().and_then(Value::as_str) {
                        self.resource(from, id)?;
                    }
                }
                if let Some(Value::Array(args)) = map.get("Fn::If") {
                    if let Some(name) = args.first().and_then(Value::as_str) {
                        if !self.conditions.contains(name) {
                            return Err(Self::unresolved(from, name));
                        }
                    }
                }
                map.values().try_for_each(|v| self.walk(from, v))
            }
            _ => Ok(()),
        }
    }
}

/// Emit the document for a graph and its parameters.
pub fn emit(
    description: &str,
    graph: &ResourceGraph,
    registry: &ParameterRegistry,
) -> StackResult<Document> {
    let order = resolver::creation_order(graph)?;
    debug!(order = ?order, "resolved creation order");

    let mut root = Map::new();
    root.insert("AWSTemplateFormatVersion".into(), json!(FORMAT_VERSION));
    root.insert("Description".into(), json!(description));

    let mut parameters = Map::new();
    for p in registry.iter() {
        parameters.insert(p.id.clone(), emit_parameter(p)?);
    }
    root.insert("Parameters".into(), Value::Object(parameters));

    let ctx = EmitContext { graph, registry };

    let mut conditions = Map::new();
    for (name, expr) in graph.conditions() {
        let body = match expr {
            ConditionExpr::Equals(a, b) => {
                json!({ "Fn::Equals": [ctx.expr(name, a)?, ctx.expr(name, b)?] })
            }
        };
        conditions.insert(name.clone(), body);
    }
    if !conditions.is_empty() {
        root.insert("Conditions".into(), Value::Object(conditions));
    }

    let mut resources = Map::new();
    for node in graph.nodes() {
        resources.insert(node.id.clone(), ctx.node(node)?);
    }
    root.insert("Resources".into(), Value::Object(resources));

    let doc = Document {
        body: Value::Object(root),
    };
    info!(
        parameters = registry.len(),
        resources = graph.len(),
        fingerprint = %doc.fingerprint(),
        "emitted document"
    );
    Ok(doc)
}

/// JSON value of a literal; non-finite floats have no JSON form.
pub(crate) fn literal_to_json(owner: &str, lit: &Literal) -> StackResult<Value> {
    Ok(match lit {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Integer(n) => json!(n),
        Literal::Float(x) => serde_json::Number::from_f64(*x)
            .map(Value::Number)
            .ok_or_else(|| StackError::Render(format!("{}: non-finite number {}", owner, x)))?,
        Literal::String(s) => Value::String(s.clone()),
    })
}

fn emit_parameter(p: &Parameter) -> StackResult<Value> {
    let mut body = Map::new();
    body.insert("Type".into(), json!(p.param_type.to_string()));
    if let Some(ref d) = p.default {
        body.insert("Default".into(), literal_to_json(&p.id, d)?);
    }
    if !p.allowed_values.is_empty() {
        body.insert("AllowedValues".into(), json!(p.allowed_values));
    }
    if !p.description.is_empty() {
        body.insert("Description".into(), json!(p.description));
    }
    Ok(Value::Object(body))
}

struct EmitContext<'a> {
    graph: &'a ResourceGraph,
    registry: &'a ParameterRegistry,
}

impl EmitContext<'_> {
    fn node(&self, node: &ResourceNode) -> StackResult<Value> {
        let mut body = Map::new();
        body.insert("Type".into(), json!(node.kind.platform_type()));
        if !node.properties.is_empty() {
            let mut props = Map::new();
            for (name, value) in &node.properties {
                props.insert(name.clone(), self.expr(&node.id, value)?);
            }
            body.insert("Properties".into(), Value::Object(props));
        }
        for dep in &node.depends_on {
            if !self.graph.contains_node(dep) {
                return Err(StackError::UnresolvedReference {
                    from: node.id.clone(),
                    id: dep.clone(),
                });
            }
        }
        match node.depends_on.as_slice() {
            [] => {}
            [single] => {
                body.insert("DependsOn".into(), json!(single));
            }
            many => {
                body.insert("DependsOn".into(), json!(many));
            }
        }
        Ok(Value::Object(body))
    }

    fn expr(&self, owner: &str, expr: &Expr) -> StackResult<Value> {
        let unresolved = |id: &str| StackError::UnresolvedReference {
            from: owner.to_string(),
            id: id.to_string(),
        };
        Ok(match expr {
            Expr::Literal(lit) => literal_to_json(owner, lit)?,
            Expr::List(items) => Value::Array(
                items
                    .iter()
                    .map(|e| self.expr(owner, e))
                    .collect::<StackResult<_>>()?,
            ),
            Expr::Map(entries) => {
                let mut m = Map::new();
                for (k, v) in entries {
                    m.insert(k.clone(), self.expr(owner, v)?);
                }
                Value::Object(m)
            }
            Expr::Ref(RefTarget::Node(id)) => {
                if !self.graph.contains_node(id) {
                    return Err(unresolved(id));
                }
                json!({ "Ref": id })
            }
            Expr::Ref(RefTarget::Parameter(id)) => {
                if !self.registry.contains(id) {
                    return Err(unresolved(id));
                }
                json!({ "Ref": id })
            }
            Expr::Ref(RefTarget::Pseudo(p)) => json!({ "Ref": p.as_str() }),
            Expr::GetAtt { node, attribute } => {
                if !self.graph.contains_node(node) {
                    return Err(unresolved(node));
                }
                json!({ "Fn::GetAtt": [node, attribute] })
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                if self.graph.condition(condition).is_none() {
                    return Err(unresolved(condition));
                }
                json!({ "Fn::If": [condition, self.expr(owner, then)?, self.expr(owner, otherwise)?] })
            }
            Expr::Join { delimiter, parts } => {
                let parts: Vec<Value> = parts
                    .iter()
                    .map(|e| self.expr(owner, e))
                    .collect::<StackResult<_>>()?;
                json!({ "Fn::Join": [delimiter, parts] })
            }
            Expr::Split { delimiter, source } => {
                json!({ "Fn::Split": [delimiter, self.expr(owner, source)?] })
            }
            Expr::Select { index, source } => {
                json!({ "Fn::Select": [index, self.expr(owner, source)?] })
            }
            Expr::GetAzs(region) => json!({ "Fn::GetAZs": self.expr(owner, region)? }),
            Expr::Base64(payload) => json!({ "Fn::Base64": self.expr(owner, payload)? }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::ConditionExpr;
    use crate::core::params::ParamType;
    use crate::core::template::Template;
    use crate::core::types::{Literal, ResourceKind};

    fn sample() -> Template {
        let mut t = Template::new("sample");
        let flag = t
            .declare(
                "Metrics",
                ParamType::String,
                Some(Literal::from("False")),
                &["True", "False"],
                "toggle",
            )
            .unwrap();
        t.declare("Threshold", ParamType::Number, Some(Literal::Float(0.2)), &[], "")
            .unwrap();
        let cond = t
            .add_condition("metrics_on", ConditionExpr::Equals(flag.to_ref(), Expr::from("True")))
            .unwrap();
        let sg = t
            .add_node(ResourceNode::new("albSG", ResourceKind::SecurityGroup).with("GroupDescription", "x"))
            .unwrap();
        t.add_node(
            ResourceNode::new("asg", ResourceKind::ScalingGroup)
                .with("Sg", Expr::get_att(&sg, "GroupId"))
                .with("MetricsCollection", Expr::when(&cond, Expr::list([Expr::map([("Granularity", "1Minute")])])))
                .with("AZs", Expr::get_azs(Expr::region()))
                .after(&sg),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_emitter_root_sections() {
        let doc = sample().emit().unwrap();
        let v = doc.as_value();
        assert_eq!(v["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(v["Description"], "sample");
        assert_eq!(v["Parameters"]["Metrics"]["AllowedValues"], json!(["True", "False"]));
        assert_eq!(v["Parameters"]["Threshold"]["Type"], "Number");
        assert_eq!(v["Parameters"]["Threshold"]["Default"], json!(0.2));
        assert_eq!(
            v["Conditions"]["metrics_on"],
            json!({ "Fn::Equals": [{ "Ref": "Metrics" }, "True"] })
        );
    }

    #[test]
    fn test_emitter_intrinsics() {
        let doc = sample().emit().unwrap();
        let asg = &doc.as_value()["Resources"]["asg"];
        assert_eq!(asg["Type"], "AWS::AutoScaling::AutoScalingGroup");
        assert_eq!(asg["Properties"]["Sg"], json!({ "Fn::GetAtt": ["albSG", "GroupId"] }));
        assert_eq!(
            asg["Properties"]["MetricsCollection"],
            json!({ "Fn::If": ["metrics_on", [{ "Granularity": "1Minute" }], { "Ref": "AWS::NoValue" }] })
        );
        assert_eq!(
            asg["Properties"]["AZs"],
            json!({ "Fn::GetAZs": { "Ref": "AWS::Region" } })
        );
        assert_eq!(asg["DependsOn"], "albSG");
    }

    #[test]
    fn test_emitter_select_split_join() {
        let mut t = Template::new("x");
        let d = t.declare_string("Domain", "example.com", "").unwrap();
        t.add_node(
            ResourceNode::new("rule", ResourceKind::ListenerRule)
                .with("Host", Expr::join(".", vec![Expr::from("api"), d.to_ref()]))
                .with("Seg", Expr::select(5, Expr::split(":", d.to_ref()))),
        )
        .unwrap();
        let doc = t.emit().unwrap();
        let props = &doc.as_value()["Resources"]["rule"]["Properties"];
        assert_eq!(props["Host"], json!({ "Fn::Join": [".", ["api", { "Ref": "Domain" }]] }));
        assert_eq!(
            props["Seg"],
            json!({ "Fn::Select": [5, { "Fn::Split": [":", { "Ref": "Domain" }] }] })
        );
    }

    #[test]
    fn test_emitter_no_conditions_section_when_empty() {
        let t = Template::new("empty");
        let doc = t.emit().unwrap();
        assert!(doc.as_value().get("Conditions").is_none());
        assert!(doc.resource_ids().is_empty());
    }

    #[test]
    fn test_emitter_non_finite_float_rejected() {
        let mut t = Template::new("x");
        t.add_node(ResourceNode::new("a", ResourceKind::Alarm).with("T", f64::NAN))
            .unwrap();
        assert!(matches!(t.emit(), Err(StackError::Render(_))));
    }

    #[test]
    fn test_emitter_cycle_aborts() {
        let mut t = Template::new("x");
        let a = t.add_node(ResourceNode::new("a", ResourceKind::Gateway)).unwrap();
        let b = t
            .add_node(ResourceNode::new("b", ResourceKind::Route).with("G", &a))
            .unwrap();
        t.add_dependency(&a, &b).unwrap();
        assert!(matches!(t.emit(), Err(StackError::CyclicReference { .. })));
    }

    #[test]
    fn test_emitter_verify_references_ok_and_detects_dangling() {
        let doc = sample().emit().unwrap();
        doc.verify_references().unwrap();

        let mut body = doc.as_value().clone();
        body["Resources"]["asg"]["Properties"]["Bad"] = json!({ "Ref": "ghost" });
        let tampered = Document { body };
        assert_eq!(
            tampered.verify_references().unwrap_err(),
            StackError::UnresolvedReference {
                from: "asg".to_string(),
                id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_emitter_verify_references_rejects_shared_identifier() {
        let doc = sample().emit().unwrap();
        let mut body = doc.as_value().clone();
        body["Parameters"]["asg"] = json!({ "Type": "String" });
        let tampered = Document { body };
        assert_eq!(
            tampered.verify_references().unwrap_err(),
            StackError::DuplicateNode {
                id: "asg".to_string(),
                existing: "parameter"
            }
        );
    }

    #[test]
    fn test_emitter_fingerprint_and_renderings() {
        let a = sample().emit().unwrap();
        let b = sample().emit().unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("blake3:"));
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        let yaml = a.to_yaml().unwrap();
        assert!(yaml.contains("AWSTemplateFormatVersion"));
    }

    #[test]
    fn test_emitter_resources_of_type() {
        let doc = sample().emit().unwrap();
        let ids: Vec<&String> = doc
            .resources_of_type("AWS::EC2::SecurityGroup")
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["albSG"]);
    }
}
