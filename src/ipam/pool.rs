use ipnet::IpNet;

use super::{split, IpamError, Result};

/// Ordered, disjoint set of still-unallocated blocks carved from one supernet.
///
/// Blocks are kept ascending by network address. Whenever a block is split
/// the pool is CIDR-merged again, so remainders coalesce back into their
/// parents and fragmentation does not pile up across demands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPool {
    blocks: Vec<IpNet>,
}

impl AddressPool {
    /// Seed a pool with `supernet` split into uniform `prefix_len` blocks.
    /// The seed blocks are left unmerged.
    pub fn split(supernet: &IpNet, prefix_len: u8) -> Result<Self> {
        Ok(Self { blocks: split(supernet, prefix_len)? })
    }

    /// Build a pool from arbitrary disjoint blocks of one family (sorted, not merged).
    pub fn from_blocks(blocks: impl IntoIterator<Item = IpNet>) -> Result<Self> {
        let mut blocks: Vec<IpNet> = blocks.into_iter().map(|b| b.trunc()).collect();
        if let Some(first) = blocks.first().copied() {
            if let Some(odd) = blocks.iter().find(|b| b.max_prefix_len() != first.max_prefix_len()) {
                return Err(IpamError::FamilyMismatch(*odd));
            }
        }
        sort_blocks(&mut blocks);
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[IpNet] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when every address of `block` is still free.
    pub fn contains(&self, block: &IpNet) -> bool {
        self.blocks.iter().any(|b| b.contains(block))
    }

    /// Take the lowest block able to hold a `/prefix_len`.
    ///
    /// An exact-size block is handed out as is. A larger one is split: its
    /// first `/prefix_len` is returned and the remainder goes back into the
    /// pool, which is then re-sorted and merged. Blocks too small for the
    /// demand are skipped but stay in the pool for later demands. On error
    /// the pool is left untouched.
    pub fn allocate(&mut self, prefix_len: u8) -> Result<IpNet> {
        let Some(first) = self.blocks.first() else {
            return Err(self.exhausted(prefix_len));
        };
        if prefix_len > first.max_prefix_len() {
            return Err(IpamError::InvalidPrefixLength { block: *first, prefix_len });
        }

        let index = self
            .blocks
            .iter()
            .position(|b| b.prefix_len() <= prefix_len)
            .ok_or_else(|| self.exhausted(prefix_len))?;

        let block = self.blocks.remove(index);
        if block.prefix_len() == prefix_len {
            tracing::debug!("allocated {} (exact fit)", block);
            return Ok(block);
        }

        let allocated = IpNet::new(block.network(), prefix_len)
            .map_err(|_| IpamError::InvalidPrefixLength { block, prefix_len })?;
        let remainder = carve(block, &allocated)?;
        tracing::debug!(
            "allocated {} from {}, returning {} blocks",
            allocated,
            block,
            remainder.len()
        );
        self.blocks.extend(remainder);
        self.merge();
        Ok(allocated)
    }

    /// Remove a specific block from the free space, splitting whichever
    /// pool block holds it.
    pub fn reserve(&mut self, block: &IpNet) -> Result<()> {
        let block = block.trunc();
        let index = self
            .blocks
            .iter()
            .position(|b| b.contains(&block))
            .ok_or(IpamError::NotInPool(block))?;

        let holder = self.blocks.remove(index);
        let remainder = carve(holder, &block)?;
        tracing::debug!("reserved {} out of {}", block, holder);
        self.blocks.extend(remainder);
        self.merge();
        Ok(())
    }

    fn merge(&mut self) {
        self.blocks = IpNet::aggregate(&self.blocks);
        sort_blocks(&mut self.blocks);
    }

    fn exhausted(&self, requested: u8) -> IpamError {
        IpamError::AllocationExhausted { requested, remaining: self.blocks.len() }
    }
}

fn sort_blocks(blocks: &mut [IpNet]) {
    blocks.sort_by_key(|b| (b.network(), b.prefix_len()));
}

/// Everything in `holder` except `target`, as the chain of sibling halves
/// met while walking down from `holder` to `target`.
///
/// Equivalent to splitting `holder` into every block of the target's size and
/// merging back all but the target, without materialising the full split.
fn carve(holder: IpNet, target: &IpNet) -> Result<Vec<IpNet>> {
    if !holder.contains(target) {
        return Err(IpamError::NotInPool(*target));
    }
    let mut remainder = Vec::new();
    let mut current = holder;
    while current.prefix_len() < target.prefix_len() {
        let next_len = current.prefix_len() + 1;
        let halves = current
            .subnets(next_len)
            .map_err(|_| IpamError::InvalidPrefixLength { block: current, prefix_len: next_len })?;
        for half in halves {
            if half.contains(target) {
                current = half;
            } else {
                remainder.push(half);
            }
        }
    }
    Ok(remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    fn nets(list: &[&str]) -> Vec<IpNet> {
        list.iter().map(|s| net(s)).collect()
    }

    fn assert_disjoint(blocks: &[IpNet]) {
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                assert!(!a.contains(b) && !b.contains(a), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn test_exact_fit_leaves_rest_unmerged() {
        let mut pool = AddressPool::split(&net("10.0.0.0/22"), 24).unwrap();
        assert_eq!(
            pool.blocks(),
            nets(&["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]).as_slice()
        );

        assert_eq!(pool.allocate(24).unwrap(), net("10.0.0.0/24"));
        assert_eq!(
            pool.blocks(),
            nets(&["10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]).as_slice()
        );
    }

    #[test]
    fn test_split_returns_merged_remainder() {
        let mut pool = AddressPool::split(&net("10.0.0.0/24"), 24).unwrap();
        assert_eq!(pool.allocate(26).unwrap(), net("10.0.0.0/26"));
        assert_eq!(pool.blocks(), nets(&["10.0.0.64/26", "10.0.0.128/25"]).as_slice());
    }

    #[test]
    fn test_too_large_demand_is_exhausted() {
        let mut pool = AddressPool::from_blocks(nets(&["10.0.0.0/25"])).unwrap();
        assert_eq!(
            pool.allocate(24),
            Err(IpamError::AllocationExhausted { requested: 24, remaining: 1 })
        );
        assert_eq!(pool.blocks(), nets(&["10.0.0.0/25"]).as_slice());
    }

    #[test]
    fn test_empty_pool_is_exhausted() {
        let mut pool = AddressPool::default();
        assert!(matches!(pool.allocate(24), Err(IpamError::AllocationExhausted { .. })));
    }

    #[test]
    fn test_small_block_is_skipped_not_lost() {
        let mut pool =
            AddressPool::from_blocks(nets(&["10.0.0.128/25", "10.0.1.0/24"])).unwrap();
        assert_eq!(pool.allocate(24).unwrap(), net("10.0.1.0/24"));
        assert_eq!(pool.blocks(), nets(&["10.0.0.128/25"]).as_slice());
        assert_eq!(pool.allocate(25).unwrap(), net("10.0.0.128/25"));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_siblings_merge_back_into_parent() {
        let mut pool = AddressPool::from_blocks(nets(&[
            "10.0.0.0/26",
            "10.0.0.64/26",
            "10.0.1.0/24",
        ]))
        .unwrap();
        // Both /26s are too small and get skipped; splitting the /24 triggers
        // a merge that folds them into their /25 parent.
        assert_eq!(pool.allocate(25).unwrap(), net("10.0.1.0/25"));
        assert_eq!(pool.blocks(), nets(&["10.0.0.0/25", "10.0.1.128/25"]).as_slice());

        let mut pool = AddressPool::from_blocks(nets(&["10.0.0.0/24"])).unwrap();
        assert_eq!(pool.allocate(26).unwrap(), net("10.0.0.0/26"));
        pool.reserve(&net("10.0.0.64/26")).unwrap();
        assert_eq!(pool.blocks(), nets(&["10.0.0.128/25"]).as_slice());
    }

    #[test]
    fn test_reserve_carves_holder() {
        let mut pool = AddressPool::split(&net("10.10.0.0/20"), 22).unwrap();
        pool.reserve(&net("10.10.15.254/31")).unwrap();
        assert!(!pool.contains(&net("10.10.15.254/31")));
        assert!(pool.contains(&net("10.10.15.252/31")));
        assert_eq!(pool.blocks()[0], net("10.10.0.0/21"));

        assert_eq!(
            pool.reserve(&net("10.10.15.255/32")),
            Err(IpamError::NotInPool(net("10.10.15.255/32")))
        );
    }

    #[test]
    fn test_demands_preserve_address_space() {
        let supernet = net("10.20.0.0/19");
        let mut pool = AddressPool::split(&supernet, 22).unwrap();
        let demands = [22u8, 25, 24, 26, 22, 30, 31, 27, 24, 25, 32, 23, 26];

        let mut allocated = Vec::new();
        for len in demands {
            let block = pool.allocate(len).unwrap();
            assert_eq!(block.prefix_len(), len);
            assert!(!pool.contains(&block));
            allocated.push(block);
        }

        let mut everything: Vec<IpNet> = allocated.clone();
        everything.extend_from_slice(pool.blocks());
        assert_disjoint(&everything);
        assert_eq!(IpNet::aggregate(&everything), vec![supernet]);
        assert!(pool.blocks().windows(2).all(|w| w[0].network() < w[1].network()));
    }

    #[test]
    fn test_first_fit_is_lowest_address() {
        let mut pool = AddressPool::split(&net("192.168.0.0/24"), 26).unwrap();
        assert_eq!(pool.allocate(28).unwrap(), net("192.168.0.0/28"));
        assert_eq!(pool.allocate(28).unwrap(), net("192.168.0.16/28"));
        assert_eq!(pool.allocate(26).unwrap(), net("192.168.0.64/26"));
        assert_eq!(pool.allocate(27).unwrap(), net("192.168.0.32/27"));
    }

    #[test]
    fn test_ipv6_pool() {
        let mut pool = AddressPool::split(&net("2001:db8::/48"), 48).unwrap();
        assert_eq!(pool.allocate(64).unwrap(), net("2001:db8::/64"));
        assert_eq!(pool.allocate(127).unwrap(), net("2001:db8:0:1::/127"));
        assert!(matches!(
            pool.allocate(129),
            Err(IpamError::InvalidPrefixLength { prefix_len: 129, .. })
        ));
    }

    #[test]
    fn test_from_blocks_rejects_mixed_families() {
        let err = AddressPool::from_blocks(nets(&["10.0.0.0/24", "2001:db8::/64"])).unwrap_err();
        assert_eq!(err, IpamError::FamilyMismatch(net("2001:db8::/64")));
    }
}
