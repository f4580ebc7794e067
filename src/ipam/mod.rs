//! Address arithmetic and subnet carving used by every configlet builder.

mod address;
mod pool;

pub use address::{
    last_address, nth_address, offset_address, p2p_local_address, p2p_peer_address, split,
};
pub use pool::AddressPool;

use ipnet::IpNet;
use std::net::IpAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IpamError>;

/// Errors raised while carving or addressing blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    /// No block left in the pool is large enough for the demand.
    #[error("allocation exhausted: no /{requested} left ({remaining} free blocks)")]
    AllocationExhausted { requested: u8, remaining: usize },

    #[error("invalid prefix length /{prefix_len} for {block}")]
    InvalidPrefixLength { block: IpNet, prefix_len: u8 },

    #[error("address family of {0} does not match the pool")]
    FamilyMismatch(IpNet),

    #[error("{0} is not free in the pool")]
    NotInPool(IpNet),

    #[error("index {index} is outside {block}")]
    OutOfRange { block: IpNet, index: u128 },

    #[error("{addr} offset by {delta} leaves the address family")]
    Overflow { addr: IpAddr, delta: i128 },
}
