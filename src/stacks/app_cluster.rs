//! Application cluster: an internet-facing load balancer in front of one
//! auto-scaled instance group per tier.
//!
//! Build order: parameters and the metrics condition, security groups, target
//! groups, load balancer with listeners and host rules, response-time alarms,
//! instance identity, then the per-tier launch template, scaling group and
//! scaling policy.

use crate::core::config::{title_bool, ClusterConfig, TierConfig};
use crate::core::emitter::Document;
use crate::core::error::StackResult;
use crate::core::graph::ConditionExpr;
use crate::core::naming::{Tier, APP_ENV_TAG_PARAM, APP_TAG_PARAM};
use crate::core::params::{ParamType, TagValue};
use crate::core::template::Template;
use crate::core::types::{ConditionHandle, Expr, Literal, NodeHandle, ParamHandle, Tag};
use crate::resources::alarm::response_time_alarm;
use crate::resources::autoscaling::{
    launch_template, scaling_group, scaling_policy, Capacity, LaunchTemplateProps, RootVolume,
    ScalingGroupProps, TargetTracking,
};
use crate::resources::iam::{self, PolicyDocument, Statement};
use crate::resources::load_balancer::{
    listener, listener_rule, load_balancer, target_group, HealthCheck, HostRule, ListenerProps,
    LoadBalancerProps, TargetGroupProps,
};
use crate::resources::security::{security_group, IngressRule, SecurityGroupProps};
use crate::resources::app_tags;
use crate::stacks::Payloads;
use indexmap::IndexMap;
use tracing::{debug, info};

/// Name of the condition gating group metrics collection.
pub const METRICS_CONDITION: &str = "asg_enable_metrics_collection";

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;
const SSH_PORT: u16 = 22;

/// Declare `id` as a `String` parameter choosing among `choice`'s values.
fn declare_choice(
    t: &mut Template,
    id: &str,
    choice: &TagValue,
    description: &str,
) -> StackResult<ParamHandle> {
    let allowed: Vec<&str> = choice.allowed_values().iter().map(String::as_str).collect();
    t.declare(
        id,
        ParamType::String,
        Some(Literal::from(choice.default_value())),
        &allowed,
        description,
    )
}

fn declare_number(
    t: &mut Template,
    id: &str,
    default: Literal,
    description: &str,
) -> StackResult<ParamHandle> {
    t.declare(id, ParamType::Number, Some(default), &[], description)
}

/// Handles to the parameters shared by every tier.
struct SharedParams {
    domain: ParamHandle,
    vpc: ParamHandle,
    subnets: Vec<ParamHandle>,
    database_sg: ParamHandle,
    instance_type: ParamHandle,
    detailed_monitoring: ParamHandle,
    access_logs_enabled: ParamHandle,
    access_logs_bucket: ParamHandle,
    response_time_threshold: ParamHandle,
    key_name: ParamHandle,
    certificate: ParamHandle,
    healthcheck_path: ParamHandle,
    notification_topic: ParamHandle,
}

impl SharedParams {
    fn subnet_refs(&self) -> Vec<Expr> {
        self.subnets.iter().map(ParamHandle::to_ref).collect()
    }
}

/// Handles to one tier's parameters.
struct TierParams {
    ami: ParamHandle,
    grace_period: ParamHandle,
    initial_size: ParamHandle,
    min_size: ParamHandle,
    max_size: ParamHandle,
    /// Tag key -> backing parameter
    tags: IndexMap<String, ParamHandle>,
}

fn declare_shared(t: &mut Template, config: &ClusterConfig) -> StackResult<SharedParams> {
    let domain = t.declare_string("AppDomain", &config.app_domain, "DNS domain of app")?;
    let vpc = t.declare_string("VPC", &config.vpc, "Existing VPC to deploy into")?;
    let mut subnets = Vec::with_capacity(config.subnets.len());
    for (i, subnet) in config.subnets.iter().enumerate() {
        subnets.push(t.declare_string(
            &format!("Subnet{}", i + 1),
            subnet,
            &format!("Existing public subnet {} of the VPC", i + 1),
        )?);
    }
    Ok(SharedParams {
        domain,
        vpc,
        subnets,
        database_sg: t.declare_string(
            "DatabaseSG",
            &config.database_security_group,
            "Existing security group to add API instances to so they can access the DB",
        )?,
        instance_type: declare_choice(
            t,
            "InstanceType",
            &config.instance_types,
            "EC2 instance type",
        )?,
        detailed_monitoring: t.declare(
            "DetailedInstanceMonitoring",
            ParamType::String,
            Some(Literal::from(title_bool(config.detailed_monitoring))),
            &["True", "False"],
            "Enable detailed instance monitoring when set to True",
        )?,
        access_logs_enabled: t.declare(
            "ALBAccessLogsEnabled",
            ParamType::String,
            Some(Literal::from(config.alb_access_logs_enabled.to_string())),
            &["true", "false"],
            "Enable access logging on the load balancer when set to true",
        )?,
        access_logs_bucket: t.declare_string(
            "ALBAccessLogsBucket",
            &config.alb_access_logs_bucket,
            "S3 bucket for access logs",
        )?,
        response_time_threshold: declare_number(
            t,
            "TargetResponseTimeAlarmThreshold",
            Literal::Float(config.response_time_threshold),
            "Threshold for response time alarm (in seconds - ex: 0.1 == 100 milliseconds)",
        )?,
        key_name: declare_choice(
            t,
            "KeyName",
            &config.key_names,
            "Name of the SSH keypair for accessing EC2 instances",
        )?,
        certificate: t.declare_string(
            "SSLCertArn",
            &config.ssl_cert_arn,
            "ARN of the SSL cert to use for the public SSL connection to the load balancer",
        )?,
        healthcheck_path: t.declare_string(
            "HealthcheckPath",
            &config.healthcheck_path,
            "Path for load balancer to check health of EC2 instances",
        )?,
        notification_topic: t.declare_string(
            "NotificationTopicARN",
            &config.notification_topic_arn,
            "SNS topic to which to publish alarms and events",
        )?,
    })
}

fn declare_tier(t: &mut Template, tier: &TierConfig) -> StackResult<TierParams> {
    let label = &tier.label;
    let scoped = |suffix: &str| tier.tier.scoped(suffix);
    let ami = t.declare_string(
        &scoped("AMI"),
        &tier.ami,
        &format!("AMI to use for the {} tier", label),
    )?;
    let grace_period = declare_number(
        t,
        &scoped("HealthcheckGracePeriod"),
        Literal::Integer(tier.health_check_grace_period),
        &format!(
            "How long the ASG waits to start health-checking {} instances after launching an instance",
            label
        ),
    )?;
    let initial_size = declare_number(
        t,
        &scoped("InitialASGSize"),
        Literal::Integer(tier.initial_size),
        &format!("Initial size of the {} autoscaling group", label),
    )?;
    let min_size = declare_number(
        t,
        &scoped("MinASGSize"),
        Literal::Integer(tier.min_size),
        &format!("Minimum size of the {} autoscaling group", label),
    )?;
    let max_size = declare_number(
        t,
        &scoped("MaxASGSize"),
        Literal::Integer(tier.max_size),
        &format!("Maximum size of the {} autoscaling group", label),
    )?;
    Ok(TierParams {
        ami,
        grace_period,
        initial_size,
        min_size,
        max_size,
        tags: IndexMap::new(),
    })
}

/// `api` -> `Api`, for listener-rule identifiers.
fn capitalized(tier: Tier) -> String {
    let name = tier.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Declare every parameter and the metrics condition.
fn declare_inputs(
    t: &mut Template,
    config: &ClusterConfig,
) -> StackResult<(SharedParams, Vec<TierParams>, ConditionHandle)> {
    let shared = declare_shared(t, config)?;

    let mut tiers = Vec::with_capacity(config.tiers.len());
    for tier in &config.tiers {
        tiers.push(declare_tier(t, tier)?);
    }

    let metrics_flag = t.declare(
        "ASGEnableMetricsCollection",
        ParamType::String,
        Some(Literal::from(title_bool(config.metrics_collection))),
        &["True", "False"],
        "Enable ASG metrics collection (group size, etc)",
    )?;
    let metrics = t.add_condition(
        METRICS_CONDITION,
        ConditionExpr::Equals(metrics_flag.to_ref(), Expr::from("True")),
    )?;

    t.declare_string(APP_TAG_PARAM, &config.app_tag, "lh-app tag for this cluster")?;
    declare_choice(
        t,
        APP_ENV_TAG_PARAM,
        &config.app_env_tag,
        "lh-app-env tag for this cluster",
    )?;

    for (tier, params) in config.tiers.iter().zip(tiers.iter_mut()) {
        for (key, value) in &tier.tags {
            let handle = t.declare_tag(tier.tier, key, value)?;
            params.tags.insert(key.clone(), handle);
        }
    }

    Ok((shared, tiers, metrics))
}

/// Assemble the cluster template without emitting it.
pub fn assemble(config: &ClusterConfig, payloads: &Payloads) -> StackResult<Template> {
    config.validate()?;
    for source in config.script_sources() {
        payloads.script(source)?;
    }

    let mut t = Template::new(&config.description);
    let (shared, tier_params, metrics) = declare_inputs(&mut t, config)?;
    let tags = app_tags(&t)?;

    // Security groups
    let alb_sg = security_group(
        &mut t,
        "albSG",
        SecurityGroupProps {
            description: "Enable HTTP and HTTPS from everywhere".to_string(),
            vpc: shared.vpc.to_ref(),
            ingress: vec![
                IngressRule::tcp_from_anywhere(HTTP_PORT),
                IngressRule::tcp_from_anywhere(HTTPS_PORT),
            ],
            tags: tags.clone(),
        },
    )?;
    let mut tier_sgs = Vec::with_capacity(config.tiers.len());
    for tier in &config.tiers {
        tier_sgs.push(security_group(
            &mut t,
            &tier.tier.scoped("SG"),
            SecurityGroupProps {
                description: "Enable HTTP from ALB and SSH from everywhere".to_string(),
                vpc: shared.vpc.to_ref(),
                ingress: vec![
                    IngressRule::tcp_from_group(HTTP_PORT, &alb_sg),
                    IngressRule::tcp_from_anywhere(SSH_PORT),
                ],
                tags: tags.clone(),
            },
        )?);
    }

    // Target groups
    let mut tier_tgs = Vec::with_capacity(config.tiers.len());
    for tier in &config.tiers {
        tier_tgs.push(target_group(
            &mut t,
            &tier.tier.scoped("TG"),
            TargetGroupProps {
                port: HTTP_PORT,
                protocol: "HTTP".to_string(),
                vpc: shared.vpc.to_ref(),
                health_check: HealthCheck::http(shared.healthcheck_path.to_ref()),
                tags: tags.clone(),
            },
        )?);
    }

    // Load balancer, listeners and host routing
    let alb = load_balancer(
        &mut t,
        "alb",
        LoadBalancerProps {
            scheme: "internet-facing".to_string(),
            subnets: shared.subnet_refs(),
            security_groups: vec![&alb_sg],
            attributes: vec![
                (
                    "access_logs.s3.enabled".to_string(),
                    shared.access_logs_enabled.to_ref(),
                ),
                (
                    "access_logs.s3.bucket".to_string(),
                    shared.access_logs_bucket.to_ref(),
                ),
            ],
            tags: tags.clone(),
        },
    )?;

    let default_index = config
        .tiers
        .iter()
        .position(|tier| tier.listener_priority.is_none())
        .unwrap_or(0);
    let default_tg = &tier_tgs[default_index];
    let listeners = [
        ("httpListener", HTTP_PORT, "HTTP", None),
        (
            "httpsListener",
            HTTPS_PORT,
            "HTTPS",
            Some(shared.certificate.to_ref()),
        ),
    ];
    for (id, port, protocol, certificate) in listeners {
        let handle = listener(
            &mut t,
            id,
            &alb,
            ListenerProps {
                port,
                protocol: protocol.to_string(),
                default_target: default_tg,
                certificate,
            },
        )?;
        for (tier, tg) in config.tiers.iter().zip(&tier_tgs) {
            let Some(priority) = tier.listener_priority else {
                continue;
            };
            listener_rule(
                &mut t,
                &format!("{}Rule{}", id, capitalized(tier.tier)),
                &handle,
                HostRule {
                    host: Expr::join(
                        &config.host_separator,
                        vec![Expr::from(tier.tier.as_str()), shared.domain.to_ref()],
                    ),
                    target_group: tg,
                    priority,
                },
            )?;
        }
    }

    // Alarms
    for (tier, tg) in config.tiers.iter().zip(&tier_tgs) {
        response_time_alarm(
            &mut t,
            &tier.tier.scoped("TargetResponseTimeAlarm"),
            &alb,
            tg,
            &shared.response_time_threshold,
            &shared.notification_topic,
        )?;
    }

    // Instance identity
    let role = iam::instance_role(&mut t, "EC2Role")?;
    iam::policy(
        &mut t,
        "DescribeTagsPolicy",
        &PolicyDocument::new(vec![Statement::allow(&["ec2:DescribeTags"]).on(&["*"])]),
        &[&role],
    )?;
    let profile = iam::instance_profile(&mut t, "InstanceProfile", &[&role])?;

    // Per-tier fan-out
    for (i, tier) in config.tiers.iter().enumerate() {
        build_tier(
            &mut t,
            config,
            tier,
            TierInputs {
                params: &tier_params[i],
                shared: &shared,
                security_group: &tier_sgs[i],
                target_group: &tier_tgs[i],
                profile: &profile,
                metrics: &metrics,
                app_tags: &tags,
                script: payloads.script(tier.script_source())?,
            },
        )?;
    }

    info!(
        tiers = config.tiers.len(),
        resources = t.graph.len(),
        parameters = t.parameters().len(),
        "assembled app cluster"
    );
    Ok(t)
}

/// Everything one tier's fan-out step reads.
struct TierInputs<'a> {
    params: &'a TierParams,
    shared: &'a SharedParams,
    security_group: &'a NodeHandle,
    target_group: &'a NodeHandle,
    profile: &'a NodeHandle,
    metrics: &'a ConditionHandle,
    app_tags: &'a [Tag],
    script: &'a str,
}

fn build_tier(
    t: &mut Template,
    config: &ClusterConfig,
    tier: &TierConfig,
    inputs: TierInputs<'_>,
) -> StackResult<()> {
    let TierInputs {
        params,
        shared,
        security_group,
        target_group,
        profile,
        metrics,
        app_tags,
        script,
    } = inputs;

    let mut groups = vec![security_group.to_ref()];
    if tier.database_access {
        groups.push(shared.database_sg.to_ref());
    }
    let lc = launch_template(
        t,
        &tier.tier.scoped("LC"),
        LaunchTemplateProps {
            image: params.ami.to_ref(),
            instance_type: shared.instance_type.to_ref(),
            detailed_monitoring: shared.detailed_monitoring.to_ref(),
            instance_profile: profile.to_ref(),
            public_ip: true,
            security_groups: groups,
            key_name: shared.key_name.to_ref(),
            root_volume: RootVolume::default(),
            user_data: script.to_string(),
        },
    )?;

    let mut group_tags: Vec<Tag> = params
        .tags
        .iter()
        .map(|(key, param)| Tag::new(key, param.to_ref()))
        .collect();
    group_tags.extend(app_tags.iter().cloned());

    let asg = scaling_group(
        t,
        &tier.tier.scoped("ASG"),
        ScalingGroupProps {
            capacity: Capacity {
                desired: params.initial_size.to_ref(),
                min: params.min_size.to_ref(),
                max: params.max_size.to_ref(),
            },
            launch_template: &lc,
            subnets: shared.subnet_refs(),
            target_groups: vec![target_group],
            health_check_grace_period: params.grace_period.to_ref(),
            metrics_collection: Some(metrics),
            notification_topic: shared.notification_topic.to_ref(),
            tags: group_tags,
        },
    )?;

    scaling_policy(
        t,
        &tier.tier.scoped("ScalingPolicy"),
        &asg,
        TargetTracking::cpu(config.cpu_target_percent),
    )?;
    debug!(tier = %tier.tier, "built tier");
    Ok(())
}

pub fn document(config: &ClusterConfig, payloads: &Payloads) -> StackResult<Document> {
    assemble(config, payloads)?.emit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StackError;
    use crate::core::evaluate::{Evaluated, Evaluator};
    use crate::core::types::{Reference, ResourceKind};
    use serde_json::json;

    const SPA_SCRIPT: &str = "#!/bin/bash\necho spa\n";
    const API_SCRIPT: &str = "#!/bin/bash\necho api\n";

    fn payloads() -> Payloads {
        Payloads::new()
            .with(Tier::Spa, SPA_SCRIPT)
            .with(Tier::Api, API_SCRIPT)
    }

    fn template() -> Template {
        assemble(&ClusterConfig::default(), &payloads()).unwrap()
    }

    #[test]
    fn test_cluster_document_verifies() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        doc.verify_references().unwrap();
        assert_eq!(
            doc.condition_names().into_iter().collect::<Vec<_>>(),
            vec![METRICS_CONDITION]
        );
        let body = doc.as_value();
        assert_eq!(body["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(body["Description"], json!("Creates a LifeHouse app cluster"));
        assert_eq!(
            body["Conditions"][METRICS_CONDITION],
            json!({ "Fn::Equals": [{ "Ref": "ASGEnableMetricsCollection" }, "True"] })
        );
    }

    #[test]
    fn test_cluster_idempotent() {
        let a = document(&ClusterConfig::default(), &payloads()).unwrap();
        let b = document(&ClusterConfig::default(), &payloads()).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_cluster_fan_out_per_tier() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        for kind in [
            ResourceKind::ScalingGroup,
            ResourceKind::LaunchTemplate,
            ResourceKind::TargetGroup,
            ResourceKind::ScalingPolicy,
        ] {
            let ids: Vec<&String> = doc
                .resources_of_type(kind.platform_type())
                .map(|(id, _)| id)
                .collect();
            assert_eq!(ids.len(), 3, "{}", kind);
            for tier in Tier::ALL {
                assert_eq!(
                    ids.iter().filter(|id| id.starts_with(tier.as_str())).count(),
                    1,
                    "{} for {}",
                    kind,
                    tier
                );
            }
        }
    }

    #[test]
    fn test_cluster_no_cross_tier_references() {
        let t = template();
        let scoped_kinds = [
            ResourceKind::LaunchTemplate,
            ResourceKind::ScalingGroup,
            ResourceKind::ScalingPolicy,
            ResourceKind::Alarm,
        ];
        for node in t.graph.nodes().filter(|n| scoped_kinds.contains(&n.kind)) {
            let owner = Tier::ALL
                .into_iter()
                .find(|tier| node.id.starts_with(tier.as_str()))
                .unwrap();
            for r in node.references() {
                let id = r.id();
                for other in Tier::ALL.into_iter().filter(|tier| *tier != owner) {
                    assert!(
                        !id.starts_with(other.as_str()),
                        "{} references {} of tier {}",
                        node.id,
                        id,
                        other
                    );
                }
                if let Reference::Node(target) = &r {
                    assert!(t.graph.contains_node(target));
                }
            }
        }
    }

    #[test]
    fn test_cluster_security_groups() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        let res = &doc.as_value()["Resources"];
        assert_eq!(
            res["spaSG"]["Properties"]["SecurityGroupIngress"][0]["SourceSecurityGroupId"],
            json!({ "Fn::GetAtt": ["albSG", "GroupId"] })
        );
        assert_eq!(
            res["albSG"]["Properties"]["SecurityGroupIngress"][1]["FromPort"],
            json!("443")
        );
        assert_eq!(
            res["apiLC"]["Properties"]["SecurityGroups"],
            json!([{ "Ref": "apiSG" }, { "Ref": "DatabaseSG" }])
        );
        assert_eq!(
            res["adminLC"]["Properties"]["SecurityGroups"],
            json!([{ "Ref": "adminSG" }])
        );
        assert_eq!(res["alb"]["DependsOn"], json!("albSG"));
    }

    #[test]
    fn test_cluster_listener_routing() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        let res = &doc.as_value()["Resources"];
        for listener in ["httpListener", "httpsListener"] {
            assert_eq!(
                res[listener]["Properties"]["DefaultActions"][0]["TargetGroupArn"],
                json!({ "Ref": "spaTG" })
            );
            let api = &res[format!("{}RuleApi", listener)]["Properties"];
            assert_eq!(api["Priority"], json!("1"));
            assert_eq!(
                api["Conditions"][0]["Values"][0],
                json!({ "Fn::Join": [".", ["api", { "Ref": "AppDomain" }]] })
            );
            let admin = &res[format!("{}RuleAdmin", listener)]["Properties"];
            assert_eq!(admin["Priority"], json!("2"));
            assert_eq!(admin["Actions"][0]["TargetGroupArn"], json!({ "Ref": "adminTG" }));
        }
        assert!(res.get("httpListenerRuleSpa").is_none());
        assert_eq!(
            res["httpsListener"]["Properties"]["Certificates"],
            json!([{ "CertificateArn": { "Ref": "SSLCertArn" } }])
        );
    }

    #[test]
    fn test_cluster_host_separator_configurable() {
        let config = ClusterConfig {
            host_separator: "-".to_string(),
            ..ClusterConfig::default()
        };
        let t = assemble(&config, &payloads()).unwrap();
        let ev = Evaluator::new(&t);
        let conditions = ev.attribute("httpListenerRuleApi", "Conditions").unwrap();
        assert_eq!(
            conditions,
            Evaluated::Value(json!([{
                "Field": "host-header",
                "Values": ["api-test-friends.life-house.com"]
            }]))
        );
    }

    #[test]
    fn test_cluster_tag_parameters() {
        let t = template();
        for id in ["spaEnvFile", "apiRepoUrl", "adminAutoredeploy", "spaRepoBranch"] {
            assert!(t.parameters().contains(id), "missing {}", id);
        }
        let env = t.parameters().get("apiEnvFile").unwrap();
        assert_eq!(env.allowed_values, vec![".env.dev", ".env.staging", ".env.prod"]);
        assert_eq!(env.default, Some(Literal::from(".env.dev")));
        assert_eq!(env.description, "Value of env-file tag for api instances");
        assert!(t.parameters().get("spaRepoUrl").unwrap().allowed_values.is_empty());

        let ev = Evaluator::new(&t);
        let tags = ev.attribute("apiASG", "Tags").unwrap();
        let tags = tags.as_value().unwrap().as_array().unwrap();
        assert_eq!(tags.len(), 6);
        assert_eq!(
            tags[2],
            json!({
                "Key": "repo-url",
                "Value": "git@github.com:Life-House/referral-api.git",
                "PropagateAtLaunch": true
            })
        );
        assert_eq!(tags[5]["Key"], json!("lh-app-env"));
        assert_eq!(tags[5]["Value"], json!("test"));
    }

    #[test]
    fn test_cluster_boot_scripts() {
        let t = template();
        let ev = Evaluator::new(&t);
        let decoded = |id: &str| match ev.attribute(id, "UserData").unwrap() {
            Evaluated::Value(v) => v,
            Evaluated::NoValue => panic!("no user data"),
        };
        assert_eq!(decoded("spaLC"), decoded("adminLC"));
        assert_ne!(decoded("spaLC"), decoded("apiLC"));
        assert_eq!(
            t.graph.node("apiLC").unwrap().properties["UserData"],
            Expr::base64(Expr::from(API_SCRIPT))
        );
    }

    #[test]
    fn test_cluster_missing_payload() {
        let err = assemble(&ClusterConfig::default(), &Payloads::new().with(Tier::Spa, "x"))
            .unwrap_err();
        assert!(matches!(err, StackError::Config(m) if m.contains("'api'")));
    }

    #[test]
    fn test_cluster_metrics_collection_disabled_by_default() {
        let t = template();
        let off = Evaluator::new(&t);
        for tier in Tier::ALL {
            assert_eq!(
                off.attribute(&tier.scoped("ASG"), "MetricsCollection").unwrap(),
                Evaluated::NoValue
            );
        }
        let on = Evaluator::new(&t).with_parameter("ASGEnableMetricsCollection", "True");
        assert_eq!(
            on.attribute("spaASG", "MetricsCollection").unwrap(),
            Evaluated::Value(json!([{ "Granularity": "1Minute" }]))
        );
    }

    #[test]
    fn test_cluster_alarm_dimensions() {
        let t = template();
        let ev = Evaluator::new(&t)
            .with_node_ref(
                "alb",
                "arn:aws:elasticloadbalancing:us-east-2:123456789012:loadbalancer/app/my-alb/abc123",
            )
            .with_node_ref(
                "apiTG",
                "arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/api/0f1e2d",
            );
        let dims = ev.attribute("apiTargetResponseTimeAlarm", "Dimensions").unwrap();
        assert_eq!(
            dims,
            Evaluated::Value(json!([
                { "Name": "LoadBalancer", "Value": "app/my-alb/abc123" },
                { "Name": "TargetGroup", "Value": "targetgroup/api/0f1e2d" }
            ]))
        );
        assert_eq!(
            ev.attribute("apiTargetResponseTimeAlarm", "Threshold").unwrap(),
            Evaluated::Value(json!(0.2))
        );
    }

    #[test]
    fn test_cluster_scaling_policy() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        let policy = &doc.as_value()["Resources"]["adminScalingPolicy"]["Properties"];
        assert_eq!(policy["AutoScalingGroupName"], json!({ "Ref": "adminASG" }));
        assert_eq!(policy["PolicyType"], json!("TargetTrackingScaling"));
        assert_eq!(policy["TargetTrackingConfiguration"]["TargetValue"], json!(50.0));
        assert_eq!(policy["TargetTrackingConfiguration"]["DisableScaleIn"], json!("True"));
    }

    #[test]
    fn test_cluster_parameter_defaults() {
        let doc = document(&ClusterConfig::default(), &payloads()).unwrap();
        let params = &doc.as_value()["Parameters"];
        assert_eq!(params["KeyName"]["Default"], json!("refapp-dev-keypair"));
        assert_eq!(params["KeyName"]["AllowedValues"].as_array().unwrap().len(), 3);
        assert_eq!(params["ALBAccessLogsEnabled"]["Default"], json!("false"));
        assert_eq!(params["DetailedInstanceMonitoring"]["Default"], json!("False"));
        assert_eq!(params["spaHealthcheckGracePeriod"]["Type"], json!("Number"));
        assert_eq!(params["spaHealthcheckGracePeriod"]["Default"], json!(300));
        assert_eq!(params["adminAMI"]["Default"], params["spaAMI"]["Default"]);
        assert_eq!(params["lhAppEnvTag"]["Default"], json!("test"));
        assert_eq!(params["Subnet3"]["Default"], json!("subnet-51278e1c"));
    }

    #[test]
    fn test_cluster_invalid_config_aborts() {
        let mut config = ClusterConfig::default();
        config.tiers[0].listener_priority = Some(1);
        assert!(matches!(
            document(&config, &payloads()),
            Err(StackError::Config(_))
        ));
    }
}
