//! Launch templates, scaling groups and target-tracking scaling policies.

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{ConditionHandle, Expr, NodeHandle, ResourceKind, Tag};

/// Lifecycle events every scaling group reports to its notification topic.
pub const NOTIFICATION_TYPES: [&str; 4] = [
    "autoscaling:EC2_INSTANCE_LAUNCH",
    "autoscaling:EC2_INSTANCE_LAUNCH_ERROR",
    "autoscaling:EC2_INSTANCE_TERMINATE",
    "autoscaling:EC2_INSTANCE_TERMINATE_ERROR",
];

/// Root device of every instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RootVolume {
    pub device_name: String,
    pub size_gib: u32,
}

impl Default for RootVolume {
    fn default() -> Self {
        Self {
            device_name: "/dev/sda1".to_string(),
            size_gib: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchTemplateProps {
    pub image: Expr,
    pub instance_type: Expr,
    pub detailed_monitoring: Expr,
    pub instance_profile: Expr,
    pub public_ip: bool,
    pub security_groups: Vec<Expr>,
    pub key_name: Expr,
    pub root_volume: RootVolume,
    /// Boot script, shipped base64-encoded
    pub user_data: String,
}

pub fn launch_template(
    t: &mut Template,
    id: &str,
    props: LaunchTemplateProps,
) -> StackResult<NodeHandle> {
    let public_ip = if props.public_ip { "True" } else { "False" };
    t.add_node(
        ResourceNode::new(id, ResourceKind::LaunchTemplate)
            .with("ImageId", props.image)
            .with("InstanceType", props.instance_type)
            .with("InstanceMonitoring", props.detailed_monitoring)
            .with("IamInstanceProfile", props.instance_profile)
            .with("AssociatePublicIpAddress", public_ip)
            .with("SecurityGroups", Expr::List(props.security_groups))
            .with("KeyName", props.key_name)
            .with(
                "BlockDeviceMappings",
                Expr::List(vec![Expr::map([
                    ("DeviceName", Expr::from(props.root_volume.device_name)),
                    (
                        "Ebs",
                        Expr::map([("VolumeSize", props.root_volume.size_gib.to_string())]),
                    ),
                ])]),
            )
            .with("UserData", Expr::base64(Expr::from(props.user_data))),
    )
}

/// Capacity bounds of a scaling group.
#[derive(Debug, Clone)]
pub struct Capacity {
    pub desired: Expr,
    pub min: Expr,
    pub max: Expr,
}

#[derive(Debug, Clone)]
pub struct ScalingGroupProps<'a> {
    pub capacity: Capacity,
    pub launch_template: &'a NodeHandle,
    pub subnets: Vec<Expr>,
    pub target_groups: Vec<&'a NodeHandle>,
    pub health_check_grace_period: Expr,
    /// One-minute group metrics are collected only while this holds
    pub metrics_collection: Option<&'a ConditionHandle>,
    pub notification_topic: Expr,
    pub tags: Vec<Tag>,
}

pub fn scaling_group(
    t: &mut Template,
    id: &str,
    props: ScalingGroupProps<'_>,
) -> StackResult<NodeHandle> {
    let metrics = props.metrics_collection.map(|cond| {
        Expr::when(
            cond,
            Expr::List(vec![Expr::map([("Granularity", "1Minute")])]),
        )
    });
    let notifications = Expr::List(vec![Expr::map([
        ("TopicARN", props.notification_topic),
        ("NotificationTypes", Expr::list(NOTIFICATION_TYPES)),
    ])]);
    t.add_node(
        ResourceNode::new(id, ResourceKind::ScalingGroup)
            .with("DesiredCapacity", props.capacity.desired)
            .with("MinSize", props.capacity.min)
            .with("MaxSize", props.capacity.max)
            .with("LaunchConfigurationName", props.launch_template)
            .with("HealthCheckType", "ELB")
            .with("VPCZoneIdentifier", Expr::List(props.subnets))
            .with("AvailabilityZones", Expr::get_azs(Expr::region()))
            .with("TargetGroupARNs", Expr::list(props.target_groups.iter().copied()))
            .with("HealthCheckGracePeriod", props.health_check_grace_period)
            .with_opt("MetricsCollection", metrics)
            .with("NotificationConfigurations", notifications)
            .with(
                "Tags",
                Expr::List(props.tags.iter().map(Tag::to_propagating_expr).collect()),
            ),
    )
}

/// Keep a group's average CPU near `target_percent`, without scaling in.
#[derive(Debug, Clone)]
pub struct TargetTracking {
    pub metric: String,
    pub target_percent: f64,
    pub disable_scale_in: bool,
}

impl TargetTracking {
    pub fn cpu(target_percent: f64) -> Self {
        Self {
            metric: "ASGAverageCPUUtilization".to_string(),
            target_percent,
            disable_scale_in: true,
        }
    }
}

pub fn scaling_policy(
    t: &mut Template,
    id: &str,
    group: &NodeHandle,
    tracking: TargetTracking,
) -> StackResult<NodeHandle> {
    let disable_scale_in = if tracking.disable_scale_in { "True" } else { "False" };
    t.add_node(
        ResourceNode::new(id, ResourceKind::ScalingPolicy)
            .with("AutoScalingGroupName", group)
            .with("PolicyType", "TargetTrackingScaling")
            .with(
                "TargetTrackingConfiguration",
                Expr::map([
                    (
                        "PredefinedMetricSpecification",
                        Expr::map([("PredefinedMetricType", tracking.metric)]),
                    ),
                    ("TargetValue", Expr::from(tracking.target_percent)),
                    ("DisableScaleIn", Expr::from(disable_scale_in)),
                ]),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evaluate::{Evaluated, Evaluator};
    use crate::core::graph::ConditionExpr;
    use crate::core::params::ParamType;
    use crate::core::types::Literal;
    use serde_json::json;

    fn template() -> (Template, NodeHandle, NodeHandle, ConditionHandle) {
        let mut t = Template::new("asg");
        let flag = t
            .declare(
                "ASGEnableMetricsCollection",
                ParamType::String,
                Some(Literal::from("False")),
                &["True", "False"],
                "",
            )
            .unwrap();
        t.declare_string("Topic", "arn:aws:sns:us-east-2:1:t", "").unwrap();
        let cond = t
            .add_condition(
                "asg_enable_metrics_collection",
                ConditionExpr::Equals(flag.to_ref(), Expr::from("True")),
            )
            .unwrap();
        let lc = launch_template(
            &mut t,
            "spaLC",
            LaunchTemplateProps {
                image: Expr::from("ami-1"),
                instance_type: Expr::from("t2.medium"),
                detailed_monitoring: Expr::from("False"),
                instance_profile: Expr::from("profile"),
                public_ip: true,
                security_groups: vec![],
                key_name: Expr::from("kp"),
                root_volume: RootVolume::default(),
                user_data: "#!/bin/bash\necho hi\n".to_string(),
            },
        )
        .unwrap();
        let tg = t
            .add_node(ResourceNode::new("spaTG", ResourceKind::TargetGroup))
            .unwrap();
        (t, lc, tg, cond)
    }

    fn group(t: &mut Template, lc: &NodeHandle, tg: &NodeHandle, cond: &ConditionHandle) -> NodeHandle {
        let topic = t.parameters().resolve("Topic").unwrap();
        scaling_group(
            t,
            "spaASG",
            ScalingGroupProps {
                capacity: Capacity {
                    desired: Expr::from(1i64),
                    min: Expr::from(1i64),
                    max: Expr::from(2i64),
                },
                launch_template: lc,
                subnets: vec![Expr::from("subnet-1")],
                target_groups: vec![tg],
                health_check_grace_period: Expr::from(300i64),
                metrics_collection: Some(cond),
                notification_topic: topic.to_ref(),
                tags: vec![Tag::new("lh-app", Expr::from("refapp"))],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_autoscaling_user_data_base64() {
        let (t, _, _, _) = template();
        let ev = Evaluator::new(&t);
        assert_eq!(
            ev.attribute("spaLC", "UserData").unwrap(),
            Evaluated::Value(json!("IyEvYmluL2Jhc2gKZWNobyBoaQo="))
        );
        assert_eq!(
            ev.attribute("spaLC", "BlockDeviceMappings").unwrap(),
            Evaluated::Value(json!([{ "DeviceName": "/dev/sda1", "Ebs": { "VolumeSize": "8" } }]))
        );
    }

    #[test]
    fn test_autoscaling_metrics_collection_follows_condition() {
        let (mut t, lc, tg, cond) = template();
        group(&mut t, &lc, &tg, &cond);

        let off = Evaluator::new(&t);
        assert_eq!(off.attribute("spaASG", "MetricsCollection").unwrap(), Evaluated::NoValue);

        let on = Evaluator::new(&t).with_parameter("ASGEnableMetricsCollection", "True");
        assert_eq!(
            on.attribute("spaASG", "MetricsCollection").unwrap(),
            Evaluated::Value(json!([{ "Granularity": "1Minute" }]))
        );
    }

    #[test]
    fn test_autoscaling_group_tags_propagate() {
        let (mut t, lc, tg, cond) = template();
        group(&mut t, &lc, &tg, &cond);
        let ev = Evaluator::new(&t);
        assert_eq!(
            ev.attribute("spaASG", "Tags").unwrap(),
            Evaluated::Value(json!([{ "Key": "lh-app", "Value": "refapp", "PropagateAtLaunch": true }]))
        );
        let notifications = ev.attribute("spaASG", "NotificationConfigurations").unwrap();
        assert_eq!(
            notifications.as_value().unwrap()[0]["NotificationTypes"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_autoscaling_policy_targets_group() {
        let (mut t, lc, tg, cond) = template();
        let asg = group(&mut t, &lc, &tg, &cond);
        scaling_policy(&mut t, "spaScalingPolicy", &asg, TargetTracking::cpu(50.0)).unwrap();
        let ev = Evaluator::new(&t);
        assert_eq!(
            ev.attribute("spaScalingPolicy", "TargetTrackingConfiguration").unwrap(),
            Evaluated::Value(json!({
                "PredefinedMetricSpecification": { "PredefinedMetricType": "ASGAverageCPUUtilization" },
                "TargetValue": 50.0,
                "DisableScaleIn": "True"
            }))
        );
    }
}
