mod builders;
mod config;
mod cvp;
mod eapi;
mod fabric;
mod ipam;
mod render;
mod retry;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use builders::{allocate, compute_leaf, leaf, remote_building, spine};
use config::Config;
use fabric::LiveFabric;

#[derive(Parser, Debug)]
#[command(version, about = "Generate switch configlets from live fabric state", long_about = None)]
struct Cli {
    /// Print the computed plan as JSON instead of configlet text
    #[arg(long, global = true)]
    plan: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// MLAG pair for a remote building, VLANs carved per floor
    RemoteBuilding(remote_building::RemoteBuildingArgs),

    /// MLAG leaf with routed spine uplinks
    Leaf(leaf::LeafArgs),

    /// Compute leaf with management VRF
    ComputeLeaf(compute_leaf::ComputeLeafArgs),

    /// Spine with point-to-point fabric links
    Spine(spine::SpineArgs),

    /// Carve a supernet by hand
    Allocate(allocate::AllocateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the configlet, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "configlet_builder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load();

    match &cli.command {
        Command::RemoteBuilding(args) => {
            let plan = remote_building::plan(args, &cfg)?;
            emit(&plan, cli.plan, remote_building::render)
        }
        Command::Leaf(args) => {
            let fabric = LiveFabric::new(&cfg)?;
            let plan = leaf::plan(&fabric, &cfg, args).await?;
            emit(&plan, cli.plan, leaf::render)
        }
        Command::ComputeLeaf(args) => {
            let fabric = LiveFabric::new(&cfg)?;
            let plan = compute_leaf::plan(&fabric, &cfg, args).await?;
            emit(&plan, cli.plan, compute_leaf::render)
        }
        Command::Spine(args) => {
            let fabric = LiveFabric::new(&cfg)?;
            let plan = spine::plan(&fabric, &cfg, args).await?;
            emit(&plan, cli.plan, spine::render)
        }
        Command::Allocate(args) => {
            let plan = allocate::plan(args)?;
            emit(&plan, cli.plan, |p| Ok(allocate::render(p)))
        }
    }
}

fn emit<P, F>(plan: &P, as_json: bool, render: F) -> Result<()>
where
    P: Serialize,
    F: FnOnce(&P) -> Result<String>,
{
    let text = if as_json {
        serde_json::to_string_pretty(plan)?
    } else {
        render(plan)?
    };
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_spine_args() {
        let cli = Cli::parse_from([
            "configlet-builder",
            "--plan",
            "spine",
            "--supernet",
            "10.1.0.0/24",
            "--lo0",
            "10.0.250.1",
            "--asn",
            "65001",
            "--leaf-asn",
            "65100-65199",
        ]);
        assert!(cli.plan);
        match cli.command {
            Command::Spine(args) => {
                assert_eq!(args.p2p_prefix_len, 31);
                assert_eq!(args.leaf_asn.first, 65100);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_leaf_defaults() {
        let cli = Cli::parse_from([
            "configlet-builder",
            "leaf",
            "--lo0",
            "10.0.250.11",
            "--lo1",
            "10.0.251.11",
            "--lo1-sec",
            "10.0.251.1",
            "--mlag-subnet",
            "10.255.255.0/30",
            "--leaf-asn",
            "65101",
            "--spine-asn",
            "65001",
        ]);
        match cli.command {
            Command::Leaf(args) => {
                assert_eq!(args.routed, vec!["Ethernet2", "Ethernet3"]);
                assert_eq!(args.mlag_peer_links, vec!["Ethernet1"]);
                assert_eq!(args.mlag_ports, vec!["Ethernet4"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_allocate() {
        let cli = Cli::parse_from(["configlet-builder", "allocate", "10.0.0.0/22", "--split-at", "24", "24", "26"]);
        match cli.command {
            Command::Allocate(args) => {
                assert_eq!(args.split_at, 24);
                assert_eq!(args.demands, vec![24, 26]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
