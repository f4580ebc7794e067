use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Username/password pair for a device command API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Config holds everything a builder run needs from its environment.
/// Loaded once in main and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub cvp_url: String,
    pub cvp_token: String,
    /// Management address of the device the configlet is built for
    pub device_ip: String,
    /// System MAC of the device the configlet is built for
    pub device_mac: String,
    /// Whether the target device is still in ZTP mode
    pub ztp_state: bool,
    pub ztp_username: String,
    pub ztp_password: String,
    pub cvp_username: String,
    pub cvp_password: String,
    pub eapi_https: bool,
    pub eapi_verify_tls: bool,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Telemetry collectors, in primary/secondary/tertiary order
    pub ingest_ips: Vec<String>,
    pub ingest_key: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        let ingest_ips = [
            "PRIMARY_DEVICE_INTF_IP",
            "SECONDARY_DEVICE_INTF_IP",
            "TERTIARY_DEVICE_INTF_IP",
        ]
        .iter()
        .map(|key| get_env(key, ""))
        .filter(|ip| !ip.is_empty())
        .collect();

        Self {
            cvp_url: get_env("CVP_URL", "http://localhost:8080"),
            cvp_token: get_env("CVP_TOKEN", ""),
            device_ip: get_env("CVP_IP", ""),
            device_mac: get_env("CVP_MAC", ""),
            ztp_state: parse_bool(&get_env("ZTP_STATE", "false")),
            ztp_username: get_env("ZTP_USERNAME", ""),
            ztp_password: get_env("ZTP_PASSWORD", ""),
            cvp_username: get_env("CVP_USERNAME", ""),
            cvp_password: get_env("CVP_PASSWORD", ""),
            eapi_https: parse_bool(&get_env("EAPI_HTTPS", "true")),
            eapi_verify_tls: parse_bool(&get_env("EAPI_VERIFY_TLS", "false")),
            request_timeout_secs: get_env("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .unwrap_or(30),
            retry_attempts: get_env("RETRY_ATTEMPTS", "3").parse().unwrap_or(3),
            retry_base_delay_ms: get_env("RETRY_BASE_DELAY_MS", "500")
                .parse()
                .unwrap_or(500),
            retry_max_delay_ms: get_env("RETRY_MAX_DELAY_MS", "5000")
                .parse()
                .unwrap_or(5000),
            ingest_ips,
            ingest_key: get_env("AERIS_INGEST_KEY", ""),
        }
    }

    /// Credentials for a device, picked by whether it is still in ZTP mode
    pub fn credentials(&self, ztp: bool) -> Credentials {
        if ztp {
            Credentials {
                username: self.ztp_username.clone(),
                password: self.ztp_password.clone(),
            }
        } else {
            Credentials {
                username: self.cvp_username.clone(),
                password: self.cvp_password.clone(),
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cvp_url: "http://localhost:8080".to_string(),
            cvp_token: String::new(),
            device_ip: String::new(),
            device_mac: String::new(),
            ztp_state: false,
            ztp_username: String::new(),
            ztp_password: String::new(),
            cvp_username: String::new(),
            cvp_password: String::new(),
            eapi_https: true,
            eapi_verify_tls: false,
            request_timeout_secs: 30,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5000,
            ingest_ips: vec![],
            ingest_key: String::new(),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
