//! Canned fabric for builder tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

use super::{Fabric, Target};
use crate::cvp::NetElement;
use crate::retry::CallError;

#[derive(Default)]
pub struct FakeFabric {
    responses: HashMap<(String, String), Value>,
    elements: HashMap<String, NetElement>,
    hosts: HashMap<String, IpAddr>,
    calls: Mutex<Vec<String>>,
}

impl FakeFabric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, host: &str, cmd: &str, value: Value) -> Self {
        self.responses.insert((host.to_string(), cmd.to_string()), value);
        self
    }

    pub fn with_element(mut self, mac: &str, ip: &str, fqdn: &str) -> Self {
        self.elements.insert(
            mac.to_string(),
            NetElement {
                ip_address: ip.to_string(),
                fqdn: fqdn.to_string(),
                ztp_mode: false,
                system_mac_address: mac.to_string(),
                serial_number: String::new(),
            },
        );
        self
    }

    pub fn with_host(mut self, name: &str, ip: &str) -> Self {
        if let Ok(addr) = ip.parse() {
            self.hosts.insert(name.to_string(), addr);
        }
        self
    }

    /// Leaf at `leaf_ip` with Ethernet2 to spine1 Ethernet1/1 (10.1.0.0/31)
    /// and Ethernet3 to spine2 Ethernet1/1 (10.1.0.2/31)
    pub fn two_spines(leaf_ip: &str) -> Self {
        Self::new()
            .with_response(
                leaf_ip,
                "show lldp neighbors detail",
                json!({ "lldpNeighbors": {
                    "Ethernet2": { "lldpNeighborInfo": [{
                        "systemName": "spine1.lab.local",
                        "chassisId": "001c.7300.0001",
                        "neighborInterfaceInfo": { "interfaceId": "\"Ethernet1/1\"" }
                    }]},
                    "Ethernet3": { "lldpNeighborInfo": [{
                        "systemName": "spine2.lab.local",
                        "chassisId": "001c.7300.0002",
                        "neighborInterfaceInfo": { "interfaceId": "\"Ethernet1/1\"" }
                    }]}
                }}),
            )
            .with_element("00:1c:73:00:00:01", "192.168.0.11", "spine1.lab.local")
            .with_element("00:1c:73:00:00:02", "192.168.0.12", "spine2.lab.local")
            .with_response("192.168.0.11", "show ip interface Ethernet1/1", ip_interface("Ethernet1/1", "10.1.0.0", 31))
            .with_response("192.168.0.12", "show ip interface Ethernet1/1", ip_interface("Ethernet1/1", "10.1.0.2", 31))
    }

    /// How many runCmds batches were sent to `host`
    pub fn calls_to(&self, host: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|h| *h == host).count())
            .unwrap_or_default()
    }
}

pub fn ip_interface(name: &str, address: &str, mask_len: u8) -> Value {
    json!({ "interfaces": { name: {
        "interfaceAddress": { "primaryIp": { "address": address, "maskLen": mask_len } }
    }}})
}

#[async_trait]
impl Fabric for FakeFabric {
    async fn run_cmds(&self, target: &Target, cmds: &[String]) -> Result<Vec<Value>, CallError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(target.host.clone());
        }
        cmds.iter()
            .map(|cmd| {
                self.responses
                    .get(&(target.host.clone(), cmd.clone()))
                    .cloned()
                    .ok_or_else(|| CallError::Fatal(format!("no canned reply for '{}' on {}", cmd, target.host)))
            })
            .collect()
    }

    async fn net_element(&self, system_mac: &str) -> Result<NetElement, CallError> {
        self.elements
            .get(system_mac)
            .cloned()
            .ok_or_else(|| CallError::Fatal(format!("unknown net element {}", system_mac)))
    }

    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        self.hosts
            .get(hostname)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("DNS lookup for {} returned no addresses", hostname))
    }
}
