use serde::{Deserialize, Deserializer, Serialize};

/// Inventory record returned by `getNetElementById.do`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetElement {
    pub ip_address: String,
    #[serde(default)]
    pub fqdn: String,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub ztp_mode: bool,
    #[serde(default)]
    pub system_mac_address: String,
    #[serde(default)]
    pub serial_number: String,
}

impl NetElement {
    /// Hostname without the domain part
    pub fn short_name(&self) -> &str {
        self.fqdn.split('.').next().unwrap_or_default()
    }
}

/// The provisioning API reports `ztpMode` either as a JSON bool or as "true"/"false".
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => crate::config::parse_bool(&s),
    })
}

/// Error body the provisioning API returns with a 200 status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvpErrorBody {
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}
