//! Compute leaf: management VRF, fixed MLAG peer link and eBGP to the spines.
//! Loopback0 comes from DNS unless given.

use anyhow::{Context, Result};
use clap::Args;
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;

use super::{device_hostname, MlagPair};
use crate::config::Config;
use crate::fabric::{self, Fabric, RoutedLink};
use crate::render;
use crate::utils;

const MLAG_SUBNET: &str = "192.168.0.0/30";
const PEER_LINK_MEMBERS: &[&str] = &["Ethernet5", "Ethernet6"];

#[derive(Debug, Clone, Args)]
pub struct ComputeLeafArgs {
    /// Address for Management1 in the mgmt VRF
    #[arg(long)]
    pub mgmt_ip: IpAddr,

    #[arg(long, default_value_t = 24)]
    pub mgmt_prefix_len: u8,

    /// Default gateway of the mgmt VRF
    #[arg(long, default_value = "192.168.1.1")]
    pub mgmt_gateway: IpAddr,

    #[arg(long)]
    pub bgp_as: u32,

    #[arg(long, default_value_t = 65001)]
    pub spine_asn: u32,

    /// Loopback1 address
    #[arg(long)]
    pub loop_1: IpAddr,

    /// Hostname; looked up from the device's inventory record when omitted
    #[arg(long)]
    pub hostname: Option<String>,

    /// Loopback0 address; resolved from the hostname when omitted
    #[arg(long)]
    pub loopback0: Option<IpAddr>,

    /// Routed uplinks to the spines
    #[arg(long, value_delimiter = ',', default_value = "Ethernet2,Ethernet3")]
    pub routed: Vec<String>,
}

/// A routed uplink with its rendered description
#[derive(Debug, Clone, Serialize)]
pub struct Uplink {
    #[serde(flatten)]
    pub link: RoutedLink,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeLeafPlan {
    pub hostname: String,
    pub mgmt_ip: IpAddr,
    pub mgmt_prefix_len: u8,
    pub mgmt_gateway: IpAddr,
    pub mlag: MlagPair,
    pub peer_link_members: Vec<String>,
    pub loopback0: IpNet,
    pub loopback1: IpNet,
    pub router_id: IpAddr,
    pub uplinks: Vec<Uplink>,
    pub bgp_as: u32,
    pub spine_asn: u32,
}

pub async fn plan(fabric: &dyn Fabric, config: &Config, args: &ComputeLeafArgs) -> Result<ComputeLeafPlan> {
    let hostname = match &args.hostname {
        Some(name) => {
            let name = name.split('.').next().unwrap_or_default().trim().to_string();
            if !utils::is_valid_hostname(&name) {
                return Err(anyhow::anyhow!("invalid hostname {:?}", name));
            }
            name
        }
        None => device_hostname(fabric, config).await?,
    };

    let mlag_subnet: IpNet = MLAG_SUBNET.parse().context("MLAG subnet")?;
    let mlag = if hostname.ends_with('1') {
        MlagPair::from_subnet(&mlag_subnet, 1, 2)?
    } else {
        MlagPair::from_subnet(&mlag_subnet, 2, 1)?
    };

    let loopback0 = match args.loopback0 {
        Some(ip) => ip,
        None => fabric
            .resolve(&hostname)
            .await
            .with_context(|| format!("no Loopback0 given and {} does not resolve", hostname))?,
    };

    let target = fabric::local_target(config)?;
    let uplinks: Vec<Uplink> = fabric::routed_links(fabric, &target, &args.routed)
        .await?
        .into_iter()
        .map(|link| Uplink {
            description: format!("{}-{}", link.neighbor_name, link.neighbor_port_label()),
            link,
        })
        .collect();
    tracing::info!("{}: loopback0 {}, {} spine uplinks", hostname, loopback0, uplinks.len());

    Ok(ComputeLeafPlan {
        hostname,
        mgmt_ip: args.mgmt_ip,
        mgmt_prefix_len: args.mgmt_prefix_len,
        mgmt_gateway: args.mgmt_gateway,
        mlag,
        peer_link_members: PEER_LINK_MEMBERS.iter().map(|s| s.to_string()).collect(),
        loopback0: IpNet::from(loopback0),
        loopback1: IpNet::from(args.loop_1),
        router_id: loopback0,
        uplinks,
        bgp_as: args.bgp_as,
        spine_asn: args.spine_asn,
    })
}

pub fn render(plan: &ComputeLeafPlan) -> Result<String> {
    render::render_configlet("compute_leaf", render::COMPUTE_LEAF, plan)
}
