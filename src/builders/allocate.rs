//! Run the subnet allocator by hand: split a supernet and satisfy a list of
//! prefix-length demands in order.

use anyhow::{Context, Result};
use clap::Args;
use ipnet::IpNet;
use serde::Serialize;

use crate::ipam::AddressPool;

#[derive(Debug, Clone, Args)]
pub struct AllocateArgs {
    /// Supernet to carve
    pub supernet: IpNet,

    /// Prefix length the supernet is first split into
    #[arg(long)]
    pub split_at: u8,

    /// Prefix lengths to allocate, in order
    #[arg(required = true)]
    pub demands: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub requested: u8,
    pub block: IpNet,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocatePlan {
    pub supernet: IpNet,
    pub allocations: Vec<Allocation>,
    pub free: Vec<IpNet>,
}

pub fn plan(args: &AllocateArgs) -> Result<AllocatePlan> {
    let mut pool = AddressPool::split(&args.supernet, args.split_at)
        .with_context(|| format!("splitting {} at /{}", args.supernet, args.split_at))?;

    let allocations = args
        .demands
        .iter()
        .enumerate()
        .map(|(i, &requested)| -> Result<Allocation> {
            let block = pool
                .allocate(requested)
                .with_context(|| format!("demand #{} (/{})", i + 1, requested))?;
            Ok(Allocation { requested, block })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AllocatePlan {
        supernet: args.supernet,
        allocations,
        free: pool.blocks().to_vec(),
    })
}

pub fn render(plan: &AllocatePlan) -> String {
    let mut out = String::new();
    for a in &plan.allocations {
        out.push_str(&format!("/{:<3} {}\n", a.requested, a.block));
    }
    let free: Vec<String> = plan.free.iter().map(|b| b.to_string()).collect();
    out.push_str(&format!("free {}\n", free.join(" ")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_allocate_plan() {
        let args = AllocateArgs { supernet: net("10.0.0.0/24"), split_at: 24, demands: vec![26] };
        let plan = plan(&args).unwrap();
        assert_eq!(plan.allocations, vec![Allocation { requested: 26, block: net("10.0.0.0/26") }]);
        assert_eq!(plan.free, vec![net("10.0.0.64/26"), net("10.0.0.128/25")]);
        assert_eq!(render(&plan), "/26  10.0.0.0/26\nfree 10.0.0.64/26 10.0.0.128/25\n");
    }

    #[test]
    fn test_allocate_reports_failing_demand() {
        let args = AllocateArgs { supernet: net("10.0.0.0/25"), split_at: 25, demands: vec![26, 24] };
        let err = plan(&args).unwrap_err();
        assert_eq!(err.to_string(), "demand #2 (/24)");
    }
}
