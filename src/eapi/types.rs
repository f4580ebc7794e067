use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// --- JSON-RPC envelope ---

#[derive(Debug, Clone, Serialize)]
pub struct RunCmdsRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: RunCmdsParams,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunCmdsParams {
    pub version: u32,
    pub cmds: Vec<String>,
    pub format: String,
}

impl RunCmdsRequest {
    pub fn new(id: String, cmds: &[String]) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "runCmds".to_string(),
            params: RunCmdsParams {
                version: 1,
                cmds: cmds.to_vec(),
                format: "json".to_string(),
            },
            id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunCmdsResponse {
    #[serde(default)]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

// --- show lldp neighbors detail ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LldpNeighborsDetail {
    #[serde(default)]
    pub lldp_neighbors: HashMap<String, LldpPort>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LldpPort {
    #[serde(default)]
    pub lldp_neighbor_info: Vec<LldpNeighborInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LldpNeighborInfo {
    #[serde(default)]
    pub system_name: String,
    pub chassis_id: String,
    pub neighbor_interface_info: NeighborInterfaceInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborInterfaceInfo {
    pub interface_id: String,
}

// --- show ip interface <name> ---

#[derive(Debug, Clone, Deserialize)]
pub struct IpInterfaces {
    #[serde(default)]
    pub interfaces: HashMap<String, IpInterface>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpInterface {
    pub interface_address: InterfaceAddress,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceAddress {
    pub primary_ip: PrimaryIp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryIp {
    pub address: String,
    pub mask_len: u8,
}

// --- show interfaces status ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfacesStatus {
    #[serde(default)]
    pub interface_statuses: HashMap<String, Value>,
}
