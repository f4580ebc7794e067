//! Configlet builders. Each one turns its CLI inputs (plus live fabric state
//! where needed) into a serialisable plan, then renders the plan to text.

pub mod allocate;
pub mod compute_leaf;
pub mod leaf;
pub mod remote_building;
pub mod spine;

use anyhow::{Context, Result};
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::config::Config;
use crate::fabric::Fabric;
use crate::ipam::nth_address;
use crate::utils;

/// Interfaces never treated as fabric links
pub const EXEMPT_INTERFACES: &[&str] = &[
    "Management0",
    "Management1",
    "Management1/1",
    "Management1/2",
    "Management2/1",
    "Management2/2",
];

/// Local and peer address of an MLAG peer SVI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MlagPair {
    pub local: IpAddr,
    pub peer: IpAddr,
    pub prefix_len: u8,
}

impl MlagPair {
    /// Take host `local` of `subnet` for this switch and host `peer` for its partner
    pub fn from_subnet(subnet: &IpNet, local: u128, peer: u128) -> Result<Self> {
        Ok(Self {
            local: nth_address(subnet, local)?,
            peer: nth_address(subnet, peer)?,
            prefix_len: subnet.prefix_len(),
        })
    }
}

/// The first switch of an MLAG pair is the one whose hostname ends in an even digit.
pub fn is_device_one(hostname: &str) -> Result<bool> {
    let digit = utils::trailing_digit(hostname).ok_or_else(|| {
        anyhow::anyhow!("hostname {:?} must end in a digit to pick its MLAG side", hostname)
    })?;
    Ok(digit % 2 == 0)
}

/// Hostname of the device being built, from the provisioning service's record of `CVP_MAC`
pub async fn device_hostname(fabric: &dyn Fabric, config: &Config) -> Result<String> {
    if config.device_mac.is_empty() {
        return Err(anyhow::anyhow!("CVP_MAC is not set; cannot look up the device"));
    }
    let mac = utils::normalize_mac(&config.device_mac);
    let element = fabric
        .net_element(&mac)
        .await
        .with_context(|| format!("looking up device {}", mac))?;
    let hostname = element.short_name().to_string();
    if !utils::is_valid_hostname(&hostname) {
        return Err(anyhow::anyhow!("device {} has no usable hostname ({:?})", mac, element.fqdn));
    }
    Ok(hostname)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsnRangeParseError {
    #[error("expected an ASN or a range <first>-<last>")]
    Format,

    #[error("ASN parse error: {0}")]
    Asn(#[from] std::num::ParseIntError),

    #[error("range {0}-{1} is reversed")]
    Reversed(u32, u32),
}

/// Inclusive range of BGP AS numbers, written `65100-65199`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AsnRange {
    pub first: u32,
    pub last: u32,
}

impl FromStr for AsnRange {
    type Err = AsnRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AsnRangeParseError::Format);
        }
        let (first, last) = match s.split_once('-') {
            Some((a, b)) => (a.trim().parse()?, b.trim().parse()?),
            None => {
                let asn = s.parse()?;
                (asn, asn)
            }
        };
        if first > last {
            return Err(AsnRangeParseError::Reversed(first, last));
        }
        Ok(AsnRange { first, last })
    }
}
