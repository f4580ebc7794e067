//! Queries against live switch state, behind the [`Fabric`] seam so builders
//! can be exercised without devices.

#[cfg(test)]
pub mod fake;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;

use crate::config::Config;
use crate::cvp::{CvpClient, NetElement};
use crate::eapi::types::{InterfacesStatus, IpInterfaces, LldpNeighborsDetail};
use crate::eapi::EapiClient;
use crate::ipam::offset_address;
use crate::retry::CallError;
use crate::utils;

/// A device reachable over the command API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub ztp: bool,
}

impl Target {
    pub fn from_element(element: &NetElement) -> Self {
        Self {
            host: element.ip_address.clone(),
            ztp: element.ztp_mode,
        }
    }
}

#[async_trait]
pub trait Fabric: Send + Sync {
    async fn run_cmds(&self, target: &Target, cmds: &[String]) -> Result<Vec<Value>, CallError>;

    async fn net_element(&self, system_mac: &str) -> Result<NetElement, CallError>;

    /// Forward DNS lookup, first IPv4 answer preferred
    async fn resolve(&self, hostname: &str) -> Result<IpAddr>;
}

/// Fabric backed by the real command API and provisioning service
pub struct LiveFabric {
    config: Config,
    eapi: EapiClient,
    cvp: CvpClient,
}

impl LiveFabric {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            eapi: EapiClient::new(config)?,
            cvp: CvpClient::new(config)?,
        })
    }
}

#[async_trait]
impl Fabric for LiveFabric {
    async fn run_cmds(&self, target: &Target, cmds: &[String]) -> Result<Vec<Value>, CallError> {
        let credentials = self.config.credentials(target.ztp);
        self.eapi.run_cmds(&target.host, &credentials, cmds).await
    }

    async fn net_element(&self, system_mac: &str) -> Result<NetElement, CallError> {
        self.cvp.get_net_element(system_mac).await
    }

    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, 0))
            .await
            .with_context(|| format!("DNS lookup for {} failed", hostname))?
            .map(|sa| sa.ip())
            .collect();
        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("DNS lookup for {} returned no addresses", hostname))
    }
}

/// The device this configlet is generated for
pub fn local_target(config: &Config) -> Result<Target> {
    if config.device_ip.is_empty() {
        return Err(anyhow::anyhow!("CVP_IP is not set; cannot reach the target device"));
    }
    Ok(Target {
        host: config.device_ip.clone(),
        ztp: config.ztp_state,
    })
}

/// Run a single show command and decode its JSON output
pub async fn show<T: DeserializeOwned>(fabric: &dyn Fabric, target: &Target, cmd: &str) -> Result<T> {
    let mut results = fabric
        .run_cmds(target, &[cmd.to_string()])
        .await
        .with_context(|| format!("'{}' on {}", cmd, target.host))?;
    let value = results.pop().unwrap_or(Value::Null);
    serde_json::from_value(value).with_context(|| format!("unexpected '{}' output from {}", cmd, target.host))
}

pub async fn lldp_neighbors(fabric: &dyn Fabric, target: &Target) -> Result<LldpNeighborsDetail> {
    show(fabric, target, "show lldp neighbors detail").await
}

/// Interfaces reported by `show interfaces status`, minus `exempt`, in switch order
pub async fn interface_names(fabric: &dyn Fabric, target: &Target, exempt: &[&str]) -> Result<Vec<String>> {
    let status: InterfacesStatus = show(fabric, target, "show interfaces status").await?;
    let mut names: Vec<String> = status
        .interface_statuses
        .into_keys()
        .filter(|name| !exempt.contains(&name.as_str()))
        .collect();
    utils::sort_interfaces(&mut names);
    Ok(names)
}

/// One routed uplink as seen from both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedLink {
    pub local_interface: String,
    pub local_ip: IpAddr,
    pub prefix_len: u8,
    pub neighbor_name: String,
    pub neighbor_mac: String,
    pub neighbor_interface: String,
    pub neighbor_ip: IpAddr,
}

impl RoutedLink {
    /// Neighbor port with slashes made safe for descriptions ("Ethernet1/1" -> "Ethernet1_1")
    pub fn neighbor_port_label(&self) -> String {
        self.neighbor_interface.replace('/', "_")
    }
}

struct NeighborPorts {
    mac: String,
    lldp_name: String,
    /// (index into the requested interfaces, neighbor port)
    ports: Vec<(usize, String)>,
}

/// Discover the far end of each routed interface and derive the local
/// address as the neighbor's address plus one.
///
/// Each neighbor device is queried once, with one `show ip interface` per
/// port that faces us.
pub async fn routed_links(fabric: &dyn Fabric, target: &Target, interfaces: &[String]) -> Result<Vec<RoutedLink>> {
    let lldp = lldp_neighbors(fabric, target).await?;

    let mut neighbors: Vec<NeighborPorts> = Vec::new();
    for (idx, intf) in interfaces.iter().enumerate() {
        let info = lldp
            .lldp_neighbors
            .get(intf)
            .and_then(|port| port.lldp_neighbor_info.first())
            .ok_or_else(|| anyhow::anyhow!("No LLDP neighbor on {}", intf))?;

        let mac = utils::normalize_mac(&info.chassis_id);
        let port = utils::unquote(&info.neighbor_interface_info.interface_id);
        tracing::debug!("{} -> {} {} ({})", intf, info.system_name, port, mac);

        match neighbors.iter_mut().find(|n| n.mac == mac) {
            Some(n) => n.ports.push((idx, port)),
            None => neighbors.push(NeighborPorts {
                mac,
                lldp_name: info.system_name.split('.').next().unwrap_or_default().to_string(),
                ports: vec![(idx, port)],
            }),
        }
    }

    let mut links: Vec<Option<RoutedLink>> = vec![None; interfaces.len()];
    for neighbor in &neighbors {
        let element = fabric
            .net_element(&neighbor.mac)
            .await
            .with_context(|| format!("looking up neighbor {}", neighbor.mac))?;
        let name = if element.fqdn.is_empty() {
            neighbor.lldp_name.clone()
        } else {
            element.short_name().to_string()
        };
        let peer = Target::from_element(&element);

        let cmds: Vec<String> = neighbor
            .ports
            .iter()
            .map(|(_, port)| format!("show ip interface {}", port))
            .collect();
        let results = fabric
            .run_cmds(&peer, &cmds)
            .await
            .with_context(|| format!("querying {} ({})", name, peer.host))?;

        for ((idx, port), value) in neighbor.ports.iter().zip(results) {
            let detail: IpInterfaces = serde_json::from_value(value)
                .with_context(|| format!("unexpected 'show ip interface {}' output from {}", port, name))?;
            // some releases key the reply by the canonical name rather than the one asked for
            let found = detail.interfaces.get(port).or_else(|| {
                if detail.interfaces.len() == 1 {
                    detail.interfaces.values().next()
                } else {
                    None
                }
            });
            let primary = match found {
                Some(intf) => &intf.interface_address.primary_ip,
                None => return Err(anyhow::anyhow!("{} has no address on {}", name, port)),
            };

            let neighbor_ip: IpAddr = primary
                .address
                .parse()
                .with_context(|| format!("{} reported bad address {:?} on {}", name, primary.address, port))?;
            let local_ip = offset_address(neighbor_ip, 1)?;

            links[*idx] = Some(RoutedLink {
                local_interface: interfaces[*idx].clone(),
                local_ip,
                prefix_len: primary.mask_len,
                neighbor_name: name.clone(),
                neighbor_mac: neighbor.mac.clone(),
                neighbor_interface: port.clone(),
                neighbor_ip,
            });
        }
    }

    links
        .into_iter()
        .zip(interfaces)
        .map(|(link, intf)| link.ok_or_else(|| anyhow::anyhow!("No address discovered for {}", intf)))
        .collect()
}
