//! Naming conventions and defaults for both stacks.
//!
//! Every constant the orchestrators use lives here. Each config derives
//! `Deserialize` with `#[serde(default)]`, so a YAML file only has to name the
//! values it overrides.

use super::error::{StackError, StackResult};
use super::naming::Tier;
use super::params::TagValue;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Parse a config from a YAML file on disk.
pub fn parse_config_file<T: DeserializeOwned>(path: &Path) -> StackResult<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StackError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parse a config from a YAML string.
pub fn parse_config<T: DeserializeOwned>(yaml: &str) -> StackResult<T> {
    serde_yaml_ng::from_str(yaml).map_err(|e| StackError::Config(format!("YAML parse error: {}", e)))
}

// ============================================================================
// Network topology
// ============================================================================

/// One public subnet of the network topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    pub name: String,
    pub cidr_block: String,
    /// Index into the region's availability zones
    #[serde(default)]
    pub zone_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub description: String,
    pub vpc_name: String,
    pub app_tag: String,
    pub app_env_tag: String,
    pub vpc_cidr: String,
    pub subnets: Vec<SubnetConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let subnet = |name: &str, cidr: &str| SubnetConfig {
            name: name.to_string(),
            cidr_block: cidr.to_string(),
            zone_index: 0,
        };
        Self {
            description: "Create a VPC with 3 public subnets".to_string(),
            vpc_name: "MyVPC".to_string(),
            app_tag: "my-app".to_string(),
            app_env_tag: "prod".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            subnets: vec![
                subnet("SubnetA", "10.0.1.0/24"),
                subnet("SubnetB", "10.0.2.0/24"),
                subnet("SubnetC", "10.0.3.0/24"),
            ],
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> StackResult<()> {
        if self.subnets.is_empty() {
            return Err(StackError::Config("network needs at least one subnet".to_string()));
        }
        let mut seen = BTreeSet::new();
        for s in &self.subnets {
            if !seen.insert(s.name.as_str()) {
                return Err(StackError::Config(format!("subnet '{}' listed twice", s.name)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Application cluster
// ============================================================================

/// Descriptor of one tier: everything the fan-out loop varies per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    pub tier: Tier,
    /// Human-readable name used in parameter descriptions
    pub label: String,
    pub ami: String,
    /// Tier whose boot script this tier's instances run
    #[serde(default)]
    pub boot_script: Option<Tier>,
    /// Also join the existing database security group
    #[serde(default)]
    pub database_access: bool,
    /// Host-header rule priority; `None` makes this tier the listeners'
    /// default target
    #[serde(default)]
    pub listener_priority: Option<u32>,
    #[serde(default = "default_grace_period")]
    pub health_check_grace_period: i64,
    #[serde(default = "default_group_size")]
    pub initial_size: i64,
    #[serde(default = "default_group_size")]
    pub min_size: i64,
    #[serde(default = "default_group_size")]
    pub max_size: i64,
    /// Instance tags, each backed by a per-tier parameter
    #[serde(default)]
    pub tags: IndexMap<String, TagValue>,
}

fn default_grace_period() -> i64 {
    300
}

fn default_group_size() -> i64 {
    1
}

impl TierConfig {
    /// Tier whose boot script this tier runs (itself unless overridden).
    pub fn script_source(&self) -> Tier {
        self.boot_script.unwrap_or(self.tier)
    }
}

fn instance_tags(repo_url: &str) -> IndexMap<String, TagValue> {
    let mut tags = IndexMap::new();
    tags.insert(
        "env-file".to_string(),
        TagValue::choices(".env.dev", [".env.staging", ".env.prod"]),
    );
    tags.insert("repo-branch".to_string(), TagValue::fixed("master"));
    tags.insert("repo-url".to_string(), TagValue::fixed(repo_url));
    tags.insert(
        "autoredeploy".to_string(),
        TagValue::choices("false", ["true"]),
    );
    tags
}

fn tier(tier: Tier, label: &str, ami: &str, repo_url: &str) -> TierConfig {
    TierConfig {
        tier,
        label: label.to_string(),
        ami: ami.to_string(),
        boot_script: None,
        database_access: false,
        listener_priority: None,
        health_check_grace_period: default_grace_period(),
        initial_size: default_group_size(),
        min_size: default_group_size(),
        max_size: default_group_size(),
        tags: instance_tags(repo_url),
    }
}

const SPA_AMI: &str = "ami-a3bf8cc6";
const API_AMI: &str = "ami-192b187c";

/// Default tier table: spa serves the default route, api and admin are
/// reached by host name. Admin runs the spa image and boot script.
pub fn default_tiers() -> Vec<TierConfig> {
    let spa = tier(
        Tier::Spa,
        "SPA",
        SPA_AMI,
        "refapp-spa.github.com:Life-House/referral-spa.git",
    );
    let api = TierConfig {
        database_access: true,
        listener_priority: Some(1),
        ..tier(
            Tier::Api,
            "API",
            API_AMI,
            "git@github.com:Life-House/referral-api.git",
        )
    };
    let admin = TierConfig {
        boot_script: Some(Tier::Spa),
        listener_priority: Some(2),
        ..tier(
            Tier::Admin,
            "Admin",
            SPA_AMI,
            "refapp-admin.github.com:Life-House/referral-admin-spa.git",
        )
    };
    vec![spa, api, admin]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub description: String,
    pub app_tag: String,
    pub app_env_tag: TagValue,
    pub app_domain: String,
    /// Joins a tier prefix to the domain in host-header rules
    pub host_separator: String,
    pub vpc: String,
    pub subnets: Vec<String>,
    pub database_security_group: String,
    pub instance_types: TagValue,
    pub detailed_monitoring: bool,
    pub key_names: TagValue,
    pub alb_access_logs_enabled: bool,
    pub alb_access_logs_bucket: String,
    pub ssl_cert_arn: String,
    pub healthcheck_path: String,
    pub response_time_threshold: f64,
    pub notification_topic_arn: String,
    pub metrics_collection: bool,
    pub cpu_target_percent: f64,
    pub tiers: Vec<TierConfig>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let app = "refapp";
        Self {
            description: "Creates a LifeHouse app cluster".to_string(),
            app_tag: app.to_string(),
            app_env_tag: TagValue::choices("test", ["dev", "staging", "prod"]),
            app_domain: "test-friends.life-house.com".to_string(),
            host_separator: ".".to_string(),
            vpc: "vpc-93d88cfa".to_string(),
            subnets: vec![
                "subnet-12ae8a7b".to_string(),
                "subnet-3626474d".to_string(),
                "subnet-51278e1c".to_string(),
            ],
            database_security_group: "sg-0ce0a567".to_string(),
            instance_types: TagValue::choices("t2.medium", ["c5.large"]),
            detailed_monitoring: false,
            key_names: TagValue::choices(
                format!("{}-dev-keypair", app),
                ["staging", "prod"].map(|env| format!("{}-{}-keypair", app, env)),
            ),
            alb_access_logs_enabled: false,
            alb_access_logs_bucket: "life-house-logs".to_string(),
            ssl_cert_arn: "arn:aws:iam::306976287633:server-certificate/lifehousewildcard"
                .to_string(),
            healthcheck_path: "/healthcheck".to_string(),
            response_time_threshold: 0.2,
            notification_topic_arn:
                "arn:aws:sns:us-east-2:306976287633:lifehouse-techops-events".to_string(),
            metrics_collection: false,
            cpu_target_percent: 50.0,
            tiers: default_tiers(),
        }
    }
}

impl ClusterConfig {
    /// Check the tier table is usable before anything is declared.
    pub fn validate(&self) -> StackResult<()> {
        if self.tiers.is_empty() {
            return Err(StackError::Config("cluster needs at least one tier".to_string()));
        }
        if self.subnets.is_empty() {
            return Err(StackError::Config("cluster needs at least one subnet".to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut priorities = BTreeSet::new();
        let mut defaults = Vec::new();
        for t in &self.tiers {
            if !seen.insert(t.tier) {
                return Err(StackError::Config(format!("tier '{}' listed twice", t.tier)));
            }
            match t.listener_priority {
                Some(p) if !priorities.insert(p) => {
                    return Err(StackError::Config(format!(
                        "listener priority {} used by more than one tier",
                        p
                    )))
                }
                Some(_) => {}
                None => defaults.push(t.tier),
            }
        }
        if defaults.len() != 1 {
            return Err(StackError::Config(format!(
                "exactly one tier must be the default route, found {}",
                defaults.len()
            )));
        }
        for t in &self.tiers {
            if !seen.contains(&t.script_source()) {
                return Err(StackError::Config(format!(
                    "tier '{}' runs the boot script of undeclared tier '{}'",
                    t.tier,
                    t.script_source()
                )));
            }
        }
        Ok(())
    }

    /// The tier that receives requests no host rule matches.
    pub fn default_route(&self) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.listener_priority.is_none())
    }

    /// Tiers whose boot scripts must be supplied.
    pub fn script_sources(&self) -> BTreeSet<Tier> {
        self.tiers.iter().map(TierConfig::script_source).collect()
    }
}

/// Render a flag the way the platform's `True`/`False` parameters expect.
pub fn title_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}
