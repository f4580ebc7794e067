//! Remote building MLAG pair: per-floor VLANs carved from one building
//! supernet, WAN uplink, downlink port-channels per floor, telemetry.

use anyhow::{Context, Result};
use clap::Args;
use ipnet::IpNet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

use super::{is_device_one, MlagPair};
use crate::config::Config;
use crate::ipam::{
    last_address, nth_address, offset_address, p2p_local_address, p2p_peer_address, AddressPool,
};
use crate::render;
use crate::utils;

/// Uniform block size the building supernet is first split into
const SEED_PREFIX_LEN: u8 = 22;
const SWITCHES_PER_FLOOR: u32 = 2;
/// Ethernet1..46 carry floor downlinks; 47/48 are left for peer-link and WAN
const DOWNLINK_PORTS: u32 = 46;
const INGEST_PORT: u16 = 9910;
const SMASH_EXCLUDES: &[&str] = &["ale", "flexCounter", "hardware", "kni", "pulse", "strata"];
const INGEST_EXCLUDES: &[&str] = &["/Sysdb/cell/1/agent", "/Sysdb/cell/2/agent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VlanScope {
    /// One VLAN per floor, numbered base + floor
    PerFloor,
    Global,
}

struct VlanDef {
    number: u16,
    name: &'static str,
    scope: VlanScope,
    prefix_len: u8,
    dhcp: bool,
}

// Allocation order matters: every floor of one definition before the next.
const BASE_VLANS: &[VlanDef] = &[
    VlanDef { number: 100, name: "DESKTOP", scope: VlanScope::PerFloor, prefix_len: 22, dhcp: true },
    VlanDef { number: 200, name: "WIRELESS", scope: VlanScope::PerFloor, prefix_len: 25, dhcp: true },
    VlanDef { number: 300, name: "VOICE", scope: VlanScope::PerFloor, prefix_len: 24, dhcp: true },
    VlanDef { number: 470, name: "NETWORK_MGMT", scope: VlanScope::Global, prefix_len: 26, dhcp: false },
];

#[derive(Debug, Clone, Args)]
pub struct RemoteBuildingArgs {
    /// Switch hostname; its trailing digit picks the MLAG side
    #[arg(long)]
    pub hostname: String,

    /// Building supernet that VLAN, loopback and MLAG addressing is carved from
    #[arg(long)]
    pub base_net: IpNet,

    /// Number of floors to build VLANs and downlinks for
    #[arg(long, default_value_t = 1)]
    pub floors: u32,

    /// WAN point-to-point subnet
    #[arg(long)]
    pub wan_p2p: IpNet,

    /// Interface facing the WAN
    #[arg(long)]
    pub wan_intf: String,

    /// MLAG peer-link members, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub peerlink: Vec<String>,

    #[arg(long)]
    pub wan_as: u32,

    #[arg(long)]
    pub local_as: u32,

    /// PIM rendezvous point
    #[arg(long)]
    pub rp: IpAddr,

    /// DHCP server used as ip helper-address
    #[arg(long)]
    pub dhcp: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub number: u16,
    pub name: String,
    pub subnet: IpNet,
    pub prefix_len: u8,
    /// This switch's SVI address
    pub address: IpAddr,
    /// Shared virtual-router address
    pub gateway: IpAddr,
    pub dhcp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WanLink {
    pub interface: String,
    pub subnet: IpNet,
    pub prefix_len: u8,
    pub local: IpAddr,
    pub peer: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Downlink {
    pub floor: u32,
    pub interface: String,
    /// Port-channel and MLAG id
    pub channel: String,
    pub allowed_vlans: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Telemetry {
    pub ingest_grpc_url: String,
    pub ingest_key: String,
    pub smash_excludes: String,
    pub ingest_excludes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteBuildingPlan {
    pub hostname: String,
    pub base_net: IpNet,
    pub floors: u32,
    pub wan_as: u32,
    pub local_as: u32,
    pub rp: IpAddr,
    pub dhcp: IpAddr,
    pub device_one: bool,
    pub vlans: Vec<Vlan>,
    pub mlag_net: IpNet,
    pub mlag: MlagPair,
    pub loopback: IpNet,
    pub router_id: IpAddr,
    pub wan: WanLink,
    pub downlinks: Vec<Downlink>,
    pub peerlink: Vec<String>,
    pub telemetry: Telemetry,
}

pub fn plan(args: &RemoteBuildingArgs, config: &Config) -> Result<RemoteBuildingPlan> {
    let hostname = args.hostname.trim().to_uppercase();
    if !utils::is_valid_hostname(&hostname) {
        return Err(anyhow::anyhow!("invalid hostname {:?}", args.hostname));
    }
    if args.floors == 0 {
        return Err(anyhow::anyhow!("a building needs at least one floor"));
    }
    let ports_needed = args.floors.saturating_mul(SWITCHES_PER_FLOOR);
    if ports_needed > DOWNLINK_PORTS {
        return Err(anyhow::anyhow!(
            "{} floors need {} downlink ports, only {} available",
            args.floors,
            ports_needed,
            DOWNLINK_PORTS
        ));
    }
    let device_one = is_device_one(&hostname)?;
    let base_net = args.base_net.trunc();

    // MLAG takes the last /31 of the supernet, loopbacks sit just below it
    let last = last_address(&base_net);
    let mlag_net = IpNet::new(last, base_net.max_prefix_len() - 1)
        .with_context(|| format!("{} has no room for an MLAG link", base_net))?
        .trunc();
    let loopback_one = IpNet::from(offset_address(last, -4)?);
    let loopback_two = IpNet::from(offset_address(last, -3)?);
    let loopback = if device_one { loopback_one } else { loopback_two };

    let mut pool = AddressPool::split(&base_net, SEED_PREFIX_LEN)
        .with_context(|| format!("splitting {} into /{} blocks", base_net, SEED_PREFIX_LEN))?;
    for reserved in [mlag_net, loopback_one, loopback_two] {
        pool.reserve(&reserved)
            .with_context(|| format!("reserving {} in {}", reserved, base_net))?;
    }

    let mut vlans = Vec::new();
    let mut floor_vlans: BTreeMap<u32, Vec<u16>> = BTreeMap::new();
    let mut global_vlans = Vec::new();
    for def in BASE_VLANS {
        match def.scope {
            VlanScope::PerFloor => {
                for floor in 1..=args.floors {
                    let number = def.number + floor as u16;
                    let name = format!("{}_{}FLOOR", def.name, floor);
                    vlans.push(build_vlan(&mut pool, def, number, name, device_one)?);
                    floor_vlans.entry(floor).or_default().push(number);
                }
            }
            VlanScope::Global => {
                vlans.push(build_vlan(&mut pool, def, def.number, def.name.to_string(), device_one)?);
                global_vlans.push(def.number);
            }
        }
    }
    vlans.sort_by_key(|v| v.number);
    tracing::info!(
        "{}: {} VLANs carved from {}, {} blocks left free",
        hostname,
        vlans.len(),
        base_net,
        pool.len()
    );

    let mlag = if device_one {
        MlagPair::from_subnet(&mlag_net, 0, 1)?
    } else {
        MlagPair::from_subnet(&mlag_net, 1, 0)?
    };

    // The carrier holds the low end of the WAN link
    let wan = WanLink {
        interface: args.wan_intf.trim().to_string(),
        subnet: args.wan_p2p,
        prefix_len: args.wan_p2p.prefix_len(),
        local: p2p_peer_address(&args.wan_p2p).context("WAN subnet too small")?,
        peer: p2p_local_address(&args.wan_p2p).context("WAN subnet too small")?,
    };

    let mut downlinks = Vec::new();
    let mut port = 1;
    for (floor, numbers) in &floor_vlans {
        let mut allowed: Vec<u16> = numbers.iter().chain(&global_vlans).copied().collect();
        allowed.sort_unstable();
        let allowed = allowed.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        for _ in 0..SWITCHES_PER_FLOOR {
            downlinks.push(Downlink {
                floor: *floor,
                interface: format!("Ethernet{}", port),
                channel: format!("10{}", port),
                allowed_vlans: allowed.clone(),
            });
            port += 1;
        }
    }

    let mut peerlink: Vec<String> = args
        .peerlink
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    utils::sort_interfaces(&mut peerlink);

    let telemetry = Telemetry {
        ingest_grpc_url: config
            .ingest_ips
            .iter()
            .map(|ip| format!("{}:{}", ip, INGEST_PORT))
            .collect::<Vec<_>>()
            .join(","),
        ingest_key: config.ingest_key.clone(),
        smash_excludes: SMASH_EXCLUDES.join(","),
        ingest_excludes: INGEST_EXCLUDES.join(","),
    };
    if telemetry.ingest_grpc_url.is_empty() {
        tracing::warn!("No telemetry collectors configured; TerminAttr will have no ingest address");
    }

    Ok(RemoteBuildingPlan {
        hostname,
        base_net,
        floors: args.floors,
        wan_as: args.wan_as,
        local_as: args.local_as,
        rp: args.rp,
        dhcp: args.dhcp,
        device_one,
        vlans,
        mlag_net,
        mlag,
        loopback,
        router_id: loopback.addr(),
        wan,
        downlinks,
        peerlink,
        telemetry,
    })
}

fn build_vlan(
    pool: &mut AddressPool,
    def: &VlanDef,
    number: u16,
    name: String,
    device_one: bool,
) -> Result<Vlan> {
    let subnet = pool
        .allocate(def.prefix_len)
        .with_context(|| format!("no /{} left for VLAN {} ({})", def.prefix_len, number, name))?;
    tracing::debug!("VLAN {} {} -> {}", number, name, subnet);

    Ok(Vlan {
        number,
        address: nth_address(&subnet, if device_one { 2 } else { 3 })?,
        gateway: nth_address(&subnet, 1)?,
        prefix_len: subnet.prefix_len(),
        subnet,
        name,
        dhcp: def.dhcp,
    })
}

pub fn render(plan: &RemoteBuildingPlan) -> Result<String> {
    render::render_configlet("remote_building", render::REMOTE_BUILDING, plan)
}
