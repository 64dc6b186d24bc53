//! Security groups and their ingress rules.

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{tags_expr, Expr, NodeHandle, ResourceKind, Tag};

pub const ANYWHERE: &str = "0.0.0.0/0";

/// Where ingress traffic may come from.
#[derive(Debug, Clone, PartialEq)]
pub enum IngressSource {
    Cidr(String),
    /// Members of another security group (its `GroupId`)
    Group(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub source: IngressSource,
}

impl IngressRule {
    pub fn tcp_from_anywhere(port: u16) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            source: IngressSource::Cidr(ANYWHERE.to_string()),
        }
    }

    pub fn tcp_from_group(port: u16, group: &NodeHandle) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            source: IngressSource::Group(Expr::get_att(group, "GroupId")),
        }
    }

    fn to_expr(&self) -> Expr {
        let (source_key, source) = match &self.source {
            IngressSource::Cidr(cidr) => ("CidrIp", Expr::from(cidr.as_str())),
            IngressSource::Group(group) => ("SourceSecurityGroupId", group.clone()),
        };
        Expr::map([
            ("IpProtocol", Expr::from(self.protocol.as_str())),
            ("FromPort", Expr::from(self.from_port.to_string())),
            ("ToPort", Expr::from(self.to_port.to_string())),
            (source_key, source),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroupProps {
    pub description: String,
    pub vpc: Expr,
    pub ingress: Vec<IngressRule>,
    pub tags: Vec<Tag>,
}

pub fn security_group(
    t: &mut Template,
    id: &str,
    props: SecurityGroupProps,
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::SecurityGroup)
            .with("GroupDescription", props.description)
            .with("VpcId", props.vpc)
            .with(
                "SecurityGroupIngress",
                Expr::List(props.ingress.iter().map(IngressRule::to_expr).collect()),
            )
            .with("Tags", tags_expr(&props.tags)),
    )
}
