use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::{IpamError, Result};

fn to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(a) => u32::from(a) as u128,
        IpAddr::V6(a) => u128::from(a),
    }
}

fn from_u128(family: IpAddr, value: u128) -> Option<IpAddr> {
    match family {
        IpAddr::V4(_) => u32::try_from(value).ok().map(|v| IpAddr::V4(Ipv4Addr::from(v))),
        IpAddr::V6(_) => Some(IpAddr::V6(Ipv6Addr::from(value))),
    }
}

/// Number of addresses in `block`, or None when it does not fit in a u128 (::/0).
fn block_size(block: &IpNet) -> Option<u128> {
    let host_bits = u32::from(block.max_prefix_len() - block.prefix_len());
    1u128.checked_shl(host_bits)
}

/// The nth address of `block`, counting the network address as 0.
pub fn nth_address(block: &IpNet, index: u128) -> Result<IpAddr> {
    if let Some(size) = block_size(block) {
        if index >= size {
            return Err(IpamError::OutOfRange { block: *block, index });
        }
    }
    let network = block.network();
    from_u128(network, to_u128(network) + index)
        .ok_or(IpamError::OutOfRange { block: *block, index })
}

/// Broadcast (IPv4) or last (IPv6) address of `block`.
pub fn last_address(block: &IpNet) -> IpAddr {
    block.broadcast()
}

/// `addr` moved by `delta` addresses, staying inside its family.
pub fn offset_address(addr: IpAddr, delta: i128) -> Result<IpAddr> {
    let base = to_u128(addr);
    let moved = if delta >= 0 {
        base.checked_add(delta.unsigned_abs())
    } else {
        base.checked_sub(delta.unsigned_abs())
    };
    moved
        .and_then(|v| from_u128(addr, v))
        .ok_or(IpamError::Overflow { addr, delta })
}

/// Address used on the allocating side of a point-to-point block: the
/// network address of a /31 (/127), otherwise the first usable host.
pub fn p2p_local_address(block: &IpNet) -> Result<IpAddr> {
    if block.prefix_len() + 1 == block.max_prefix_len() {
        nth_address(block, 0)
    } else {
        nth_address(block, 1)
    }
}

/// The far end of a point-to-point block, one above [`p2p_local_address`].
pub fn p2p_peer_address(block: &IpNet) -> Result<IpAddr> {
    if block.prefix_len() + 1 == block.max_prefix_len() {
        nth_address(block, 1)
    } else {
        nth_address(block, 2)
    }
}

/// Split `supernet` into every block of `prefix_len`, ascending.
pub fn split(supernet: &IpNet, prefix_len: u8) -> Result<Vec<IpNet>> {
    let supernet = supernet.trunc();
    if prefix_len < supernet.prefix_len() || prefix_len > supernet.max_prefix_len() {
        return Err(IpamError::InvalidPrefixLength { block: supernet, prefix_len });
    }
    let mut blocks: Vec<IpNet> = supernet
        .subnets(prefix_len)
        .map_err(|_| IpamError::InvalidPrefixLength { block: supernet, prefix_len })?
        .collect();
    blocks.sort_by_key(|b| (b.network(), b.prefix_len()));
    Ok(blocks)
}
