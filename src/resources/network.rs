//! Network constructs: VPC, gateway, routing and subnets.

use crate::core::error::StackResult;
use crate::core::graph::ResourceNode;
use crate::core::template::Template;
use crate::core::types::{tags_expr, Expr, NodeHandle, ResourceKind, Tag};

/// Isolated network.
pub fn vpc(t: &mut Template, id: &str, cidr_block: &str, tags: &[Tag]) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::Network)
            .with("CidrBlock", cidr_block)
            .with("Tags", tags_expr(tags)),
    )
}

pub fn internet_gateway(t: &mut Template, id: &str, tags: &[Tag]) -> StackResult<NodeHandle> {
    t.add_node(ResourceNode::new(id, ResourceKind::Gateway).with("Tags", tags_expr(tags)))
}

pub fn gateway_attachment(
    t: &mut Template,
    id: &str,
    vpc: &NodeHandle,
    gateway: &NodeHandle,
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::GatewayAttachment)
            .with("VpcId", vpc)
            .with("InternetGatewayId", gateway),
    )
}

pub fn route_table(
    t: &mut Template,
    id: &str,
    vpc: &NodeHandle,
    tags: &[Tag],
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::RouteTable)
            .with("VpcId", vpc)
            .with("Tags", tags_expr(tags)),
    )
}

/// A route through an internet gateway.
#[derive(Debug, Clone)]
pub struct RouteProps<'a> {
    pub route_table: &'a NodeHandle,
    pub gateway: &'a NodeHandle,
    pub destination_cidr: &'a str,
    /// The gateway must be attached before a route can use it; nothing in
    /// the route's attributes points at the attachment.
    pub after: Option<&'a NodeHandle>,
}

pub fn route(t: &mut Template, id: &str, props: RouteProps<'_>) -> StackResult<NodeHandle> {
    let mut node = ResourceNode::new(id, ResourceKind::Route)
        .with("GatewayId", props.gateway)
        .with("DestinationCidrBlock", props.destination_cidr)
        .with("RouteTableId", props.route_table);
    if let Some(attachment) = props.after {
        node = node.after(attachment);
    }
    t.add_node(node)
}

#[derive(Debug, Clone)]
pub struct SubnetProps {
    pub vpc: Expr,
    pub cidr_block: String,
    pub availability_zone: Expr,
    pub tags: Vec<Tag>,
}

pub fn subnet(t: &mut Template, id: &str, props: SubnetProps) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::Subnet)
            .with("VpcId", props.vpc)
            .with("CidrBlock", props.cidr_block)
            .with("AvailabilityZone", props.availability_zone)
            .with("Tags", tags_expr(&props.tags)),
    )
}

pub fn subnet_route_table_association(
    t: &mut Template,
    id: &str,
    subnet: &NodeHandle,
    route_table: &NodeHandle,
) -> StackResult<NodeHandle> {
    t.add_node(
        ResourceNode::new(id, ResourceKind::SubnetRouteTableAssociation)
            .with("SubnetId", subnet)
            .with("RouteTableId", route_table),
    )
}

/// The `index`-th availability zone of the stack's region.
pub fn availability_zone(index: usize) -> Expr {
    Expr::select(index, Expr::get_azs(Expr::region()))
}
