//! Metric alarms, including the load-balancer response-time alarm.
//!
//! Load-balancer metric dimensions are not the resources' ARNs but trailing
//! pieces of them. An ARN splits on `:` into six segments; segment 5 is the
//! resource part. For a target group that part is the dimension value as is
//! (`targetgroup/<name>/<id>`). For a load balancer it is
//! `loadbalancer/app/<name>/<id>` and the `loadbalancer/` prefix must go, so
//! it is split again on that prefix and element 1 is taken (element 0 is the
//! empty string before it).

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{Expr, NodeHandle, ParamHandle, ResourceKind};

/// Index of the resource segment in a `:`-split ARN.
pub const ARN_RESOURCE_SEGMENT: usize = 5;

/// Prefix stripped from a load balancer's resource segment.
pub const LOAD_BALANCER_PREFIX: &str = "loadbalancer/";

/// `LoadBalancer` dimension value derived from the balancer's ARN.
pub fn load_balancer_dimension(load_balancer: &NodeHandle) -> Expr {
    Expr::select(
        1,
        Expr::split(
            LOAD_BALANCER_PREFIX,
            Expr::select(ARN_RESOURCE_SEGMENT, Expr::split(":", load_balancer.to_ref())),
        ),
    )
}

/// `TargetGroup` dimension value derived from the target group's ARN.
pub fn target_group_dimension(target_group: &NodeHandle) -> Expr {
    Expr::select(ARN_RESOURCE_SEGMENT, Expr::split(":", target_group.to_ref()))
}

#[derive(Debug, Clone)]
pub struct AlarmProps {
    pub description: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<(String, Expr)>,
    pub statistic: String,
    pub period_seconds: u32,
    pub evaluation_periods: u32,
    pub threshold: Expr,
    pub comparison: String,
    pub actions: Vec<Expr>,
}

pub fn alarm(t: &mut Template, id: &str, props: AlarmProps) -> StackResult<NodeHandle> {
    let dimensions = props
        .dimensions
        .into_iter()
        .map(|(name, value)| Expr::map([("Name", Expr::from(name)), ("Value", value)]))
        .collect();
    t.add_node(
        ResourceNode::new(id, ResourceKind::Alarm)
            .with("AlarmDescription", props.description)
            .with("Namespace", props.namespace)
            .with("MetricName", props.metric_name)
            .with("Dimensions", Expr::List(dimensions))
            .with("Statistic", props.statistic)
            .with("Period", props.period_seconds.to_string())
            .with("EvaluationPeriods", props.evaluation_periods.to_string())
            .with("Threshold", props.threshold)
            .with("ComparisonOperator", props.comparison)
            .with("AlarmActions", Expr::List(props.actions)),
    )
}

/// Alarm when a target group's average response time exceeds `threshold`
/// over one minute, notifying `topic`.
pub fn response_time_alarm(
    t: &mut Template,
    id: &str,
    load_balancer: &NodeHandle,
    target_group: &NodeHandle,
    threshold: &ParamHandle,
    topic: &ParamHandle,
) -> StackResult<NodeHandle> {
    alarm(
        t,
        id,
        AlarmProps {
            description: "Alarm if a target takes too long to respond to an HTTP request".to_string(),
            namespace: "AWS/ApplicationELB".to_string(),
            metric_name: "TargetResponseTime".to_string(),
            dimensions: vec![
                ("LoadBalancer".to_string(), load_balancer_dimension(load_balancer)),
                ("TargetGroup".to_string(), target_group_dimension(target_group)),
            ],
            statistic: "Average".to_string(),
            period_seconds: 60,
            evaluation_periods: 1,
            threshold: threshold.to_ref(),
            comparison: "GreaterThanThreshold".to_string(),
            actions: vec![topic.to_ref()],
        },
    )
}
