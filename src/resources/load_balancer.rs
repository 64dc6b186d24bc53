//! Application load balancer, listeners, host-header rules and target groups.

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{tags_expr, Expr, NodeHandle, ResourceKind, Tag};

/// Target-group health checking.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub path: Expr,
    pub protocol: String,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    pub healthy_threshold: i64,
    pub unhealthy_threshold: i64,
    pub success_codes: String,
}

impl HealthCheck {
    /// HTTP check every 30s, 5s timeout, 5 up / 2 down, expecting `200`.
    pub fn http(path: Expr) -> Self {
        Self {
            path,
            protocol: "HTTP".to_string(),
            interval_seconds: 30,
            timeout_seconds: 5,
            healthy_threshold: 5,
            unhealthy_threshold: 2,
            success_codes: "200".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetGroupProps {
    pub port: u16,
    pub protocol: String,
    pub vpc: Expr,
    pub health_check: HealthCheck,
    pub tags: Vec<Tag>,
}

pub fn target_group(t: &mut Template, id: &str, props: TargetGroupProps) -> StackResult<NodeHandle> {
    let hc = props.health_check;
    t.add_node(
        ResourceNode::new(id, ResourceKind::TargetGroup)
            .with("Port", props.port.to_string())
            .with("Protocol", props.protocol)
            .with("VpcId", props.vpc)
            .with("HealthCheckPath", hc.path)
            .with("HealthCheckIntervalSeconds", hc.interval_seconds)
            .with("HealthCheckProtocol", hc.protocol)
            .with("HealthCheckTimeoutSeconds", hc.timeout_seconds)
            .with("HealthyThresholdCount", hc.healthy_threshold)
            .with("UnhealthyThresholdCount", hc.unhealthy_threshold)
            .with("Matcher", Expr::map([("HttpCode", hc.success_codes)]))
            .with("Tags", tags_expr(&props.tags)),
    )
}

#[derive(Debug, Clone)]
pub struct LoadBalancerProps<'a> {
    pub scheme: String,
    pub subnets: Vec<Expr>,
    /// Also recorded as ordering edges: the groups must exist first
    pub security_groups: Vec<&'a NodeHandle>,
    /// `LoadBalancerAttributes` key/value pairs
    pub attributes: Vec<(String, Expr)>,
    pub tags: Vec<Tag>,
}

pub fn load_balancer(
    t: &mut Template,
    id: &str,
    props: LoadBalancerProps<'_>,
) -> StackResult<NodeHandle> {
    let attributes = props
        .attributes
        .into_iter()
        .map(|(key, value)| Expr::map([("Key", Expr::from(key)), ("Value", value)]))
        .collect();
    let mut node = ResourceNode::new(id, ResourceKind::LoadBalancer)
        .with("Scheme", props.scheme)
        .with("Subnets", Expr::List(props.subnets))
        .with("SecurityGroups", Expr::list(props.security_groups.iter().copied()))
        .with("LoadBalancerAttributes", Expr::List(attributes))
        .with("Tags", tags_expr(&props.tags));
    for sg in &props.security_groups {
        node = node.after(sg);
    }
    t.add_node(node)
}

fn forward_to(target_group: &NodeHandle) -> Expr {
    Expr::map([
        ("Type", Expr::from("forward")),
        ("TargetGroupArn", target_group.to_ref()),
    ])
}

#[derive(Debug, Clone)]
pub struct ListenerProps<'a> {
    pub port: u16,
    pub protocol: String,
    pub default_target: &'a NodeHandle,
    /// Certificate ARN; required for HTTPS
    pub certificate: Option<Expr>,
}

pub fn listener(
    t: &mut Template,
    id: &str,
    load_balancer: &NodeHandle,
    props: ListenerProps<'_>,
) -> StackResult<NodeHandle> {
    let certificates = props
        .certificate
        .map(|arn| Expr::List(vec![Expr::map([("CertificateArn", arn)])]));
    t.add_node(
        ResourceNode::new(id, ResourceKind::Listener)
            .with("Port", props.port.to_string())
            .with("Protocol", props.protocol)
            .with("LoadBalancerArn", load_balancer)
            .with("DefaultActions", Expr::List(vec![forward_to(props.default_target)]))
            .with_opt("Certificates", certificates),
    )
}

/// Route requests whose `Host` header matches `host` to `target_group`.
#[derive(Debug, Clone)]
pub struct HostRule<'a> {
    pub host: Expr,
    pub target_group: &'a NodeHandle,
    pub priority: u32,
}

pub fn listener_rule(
    t: &mut Template,
    id: &str,
    listener: &NodeHandle,
    rule: HostRule<'_>,
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::ListenerRule)
            .with("ListenerArn", listener)
            .with(
                "Conditions",
                Expr::List(vec![Expr::map([
                    ("Field", Expr::from("host-header")),
                    ("Values", Expr::List(vec![rule.host])),
                ])]),
            )
            .with("Actions", Expr::List(vec![forward_to(rule.target_group)]))
            .with("Priority", rule.priority.to_string()),
    )
}
