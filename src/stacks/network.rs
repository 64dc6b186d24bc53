//! Network topology: a VPC with an internet gateway, one public route table
//! and public subnets.

use crate::core::config::NetworkConfig;
use crate::core::emitter::Document;
use crate::core::error::StackResult;
use crate::core::naming::{APP_ENV_TAG_PARAM, APP_TAG_PARAM};
use crate::core::template::Template;
use crate::resources::network::{self, availability_zone, RouteProps, SubnetProps};
use crate::resources::{app_tags, security::ANYWHERE};
use tracing::info;

pub fn assemble(config: &NetworkConfig) -> StackResult<Template> {
    config.validate()?;
    let mut t = Template::new(&config.description);

    t.declare_string("vpcName", &config.vpc_name, "Name for this VPC")?;
    t.declare_string(APP_TAG_PARAM, &config.app_tag, "lh-app tag for this VPC")?;
    t.declare_string(
        APP_ENV_TAG_PARAM,
        &config.app_env_tag,
        "lh-app-env tag for this VPC",
    )?;
    let tags = app_tags(&t)?;

    let vpc = network::vpc(&mut t, "VPC", &config.vpc_cidr, &tags)?;
    let igw = network::internet_gateway(&mut t, "InternetGateway", &tags)?;
    let attachment = network::gateway_attachment(&mut t, "GatewayAttachment", &vpc, &igw)?;
    let route_table = network::route_table(&mut t, "PublicRouteTable", &vpc, &tags)?;
    network::route(
        &mut t,
        "RouteToInternet",
        RouteProps {
            route_table: &route_table,
            gateway: &igw,
            destination_cidr: ANYWHERE,
            after: Some(&attachment),
        },
    )?;

    for s in &config.subnets {
        let subnet = network::subnet(
            &mut t,
            &s.name,
            SubnetProps {
                vpc: vpc.to_ref(),
                cidr_block: s.cidr_block.clone(),
                availability_zone: availability_zone(s.zone_index),
                tags: tags.clone(),
            },
        )?;
        network::subnet_route_table_association(
            &mut t,
            &format!("{}RouteTableAssociation", s.name),
            &subnet,
            &route_table,
        )?;
    }

    info!(resources = t.graph.len(), "assembled network topology");
    Ok(t)
}

pub fn document(config: &NetworkConfig) -> StackResult<Document> {
    assemble(config)?.emit()
}
