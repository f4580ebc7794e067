//! Spine: every fabric port gets the next point-to-point block from the
//! supernet; leaves peer dynamically through a BGP listen range.

use anyhow::{Context, Result};
use clap::Args;
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;

use super::{AsnRange, EXEMPT_INTERFACES};
use crate::config::Config;
use crate::fabric::{self, Fabric};
use crate::ipam::{p2p_local_address, AddressPool};
use crate::render;

#[derive(Debug, Clone, Args)]
pub struct SpineArgs {
    /// Supernet the point-to-point links are carved from
    #[arg(long)]
    pub supernet: IpNet,

    /// Router-id / Loopback0 address
    #[arg(long)]
    pub lo0: IpAddr,

    #[arg(long)]
    pub asn: u32,

    /// Leaf AS numbers accepted by the listen range, e.g. 65100-65199
    #[arg(long)]
    pub leaf_asn: AsnRange,

    #[arg(long, default_value_t = 31)]
    pub p2p_prefix_len: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricPort {
    pub interface: String,
    pub block: IpNet,
    pub address: IpAddr,
    pub prefix_len: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpinePlan {
    pub supernet: IpNet,
    pub ports: Vec<FabricPort>,
    pub lo0: IpNet,
    pub router_id: IpAddr,
    pub asn: u32,
    pub leaf_asn: AsnRange,
}

pub async fn plan(fabric: &dyn Fabric, config: &Config, args: &SpineArgs) -> Result<SpinePlan> {
    let target = fabric::local_target(config)?;
    let interfaces = fabric::interface_names(fabric, &target, EXEMPT_INTERFACES).await?;
    let supernet = args.supernet.trunc();
    let ports = assign_ports(&supernet, args.p2p_prefix_len, &interfaces)?;
    tracing::info!("{} fabric ports addressed from {}", ports.len(), supernet);

    Ok(SpinePlan {
        supernet,
        ports,
        lo0: IpNet::from(args.lo0),
        router_id: args.lo0,
        asn: args.asn,
        leaf_asn: args.leaf_asn,
    })
}

/// Hand each interface, in order, the next `prefix_len` block of `supernet`
pub fn assign_ports(supernet: &IpNet, prefix_len: u8, interfaces: &[String]) -> Result<Vec<FabricPort>> {
    let mut pool = AddressPool::split(supernet, prefix_len)
        .with_context(|| format!("splitting {} into /{} links", supernet, prefix_len))?;

    interfaces
        .iter()
        .map(|intf| -> Result<FabricPort> {
            let block = pool
                .allocate(prefix_len)
                .with_context(|| format!("{} has no /{} left for {}", supernet, prefix_len, intf))?;
            Ok(FabricPort {
                interface: intf.clone(),
                address: p2p_local_address(&block)?,
                prefix_len: block.prefix_len(),
                block,
            })
        })
        .collect()
}

pub fn render(plan: &SpinePlan) -> Result<String> {
    render::render_configlet("spine", render::SPINE, plan)
}
