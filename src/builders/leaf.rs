//! MLAG leaf with routed spine uplinks and a VTEP loopback.

use anyhow::{Context, Result};
use clap::Args;
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;

use super::{device_hostname, is_device_one, MlagPair};
use crate::config::Config;
use crate::fabric::{self, Fabric, RoutedLink};
use crate::render;
use crate::utils;

/// Port-channel carrying the MLAG peer link
const PEER_LINK_CHANNEL: u32 = 10;

#[derive(Debug, Clone, Args)]
pub struct LeafArgs {
    /// Router-id / Loopback0 address
    #[arg(long)]
    pub lo0: IpAddr,

    /// VTEP address on Loopback1
    #[arg(long)]
    pub lo1: IpAddr,

    /// Shared VTEP address, secondary on Loopback1
    #[arg(long)]
    pub lo1_sec: IpAddr,

    /// Subnet for the MLAG peer SVI
    #[arg(long)]
    pub mlag_subnet: IpNet,

    #[arg(long)]
    pub leaf_asn: u32,

    #[arg(long)]
    pub spine_asn: u32,

    /// Routed uplinks to the spines
    #[arg(long, value_delimiter = ',', default_value = "Ethernet2,Ethernet3")]
    pub routed: Vec<String>,

    /// Members of the MLAG peer link
    #[arg(long, value_delimiter = ',', default_value = "Ethernet1")]
    pub mlag_peer_links: Vec<String>,

    /// Host-facing MLAG ports, one port-channel each
    #[arg(long, value_delimiter = ',', default_value = "Ethernet4")]
    pub mlag_ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MlagPort {
    pub interface: String,
    pub channel: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafPlan {
    pub hostname: String,
    pub mlag: MlagPair,
    pub peer_link_channel: u32,
    pub mlag_peer_links: Vec<String>,
    pub mlag_ports: Vec<MlagPort>,
    pub links: Vec<RoutedLink>,
    pub lo0: IpNet,
    pub lo1: IpNet,
    pub lo1_sec: IpNet,
    pub router_id: IpAddr,
    pub leaf_asn: u32,
    pub spine_asn: u32,
}

pub async fn plan(fabric: &dyn Fabric, config: &Config, args: &LeafArgs) -> Result<LeafPlan> {
    let hostname = device_hostname(fabric, config).await?;

    let mlag = if is_device_one(&hostname)? {
        MlagPair::from_subnet(&args.mlag_subnet, 2, 1)
    } else {
        MlagPair::from_subnet(&args.mlag_subnet, 1, 2)
    }
    .with_context(|| format!("MLAG subnet {} is too small", args.mlag_subnet))?;

    let mlag_ports = args
        .mlag_ports
        .iter()
        .map(|intf| -> Result<MlagPort> {
            let channel = utils::trailing_number(intf)
                .ok_or_else(|| anyhow::anyhow!("cannot derive a port-channel number from {:?}", intf))?;
            Ok(MlagPort { interface: intf.clone(), channel })
        })
        .collect::<Result<Vec<_>>>()?;

    let target = fabric::local_target(config)?;
    let links = fabric::routed_links(fabric, &target, &args.routed).await?;
    tracing::info!("{}: {} routed uplinks discovered", hostname, links.len());

    Ok(LeafPlan {
        hostname,
        mlag,
        peer_link_channel: PEER_LINK_CHANNEL,
        mlag_peer_links: args.mlag_peer_links.clone(),
        mlag_ports,
        links,
        lo0: IpNet::from(args.lo0),
        lo1: IpNet::from(args.lo1),
        lo1_sec: IpNet::from(args.lo1_sec),
        router_id: args.lo0,
        leaf_asn: args.leaf_asn,
        spine_asn: args.spine_asn,
    })
}

pub fn render(plan: &LeafPlan) -> Result<String> {
    render::render_configlet("leaf", render::LEAF, plan)
}
