//! Command-line front end for the VPN fleet.

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// Deploy, inspect and tear down short-lived WireGuard endpoints.
#[derive(Parser, Debug)]
#[command(name = "wgfleet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the instances visible to the signed-in user
    List(commands::list::ListArgs),
    /// Show deployable regions
    Regions(commands::regions::RegionsArgs),
    /// Deploy an endpoint in a region, or fetch the existing one
    Deploy(commands::deploy::DeployArgs),
    /// Write the client config for a listed instance
    ShowConfig(commands::show_config::ShowConfigArgs),
    /// Terminate one or more instances in a single request
    Terminate(commands::terminate::TerminateArgs),
    /// Prepare a region so endpoints can be deployed there
    RegionOnline(commands::region::RegionArgs),
    /// Remove a region's images and snapshots
    RegionRetire(commands::region::RegionArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::List(args) => commands::list::run(args).await,
            Commands::Regions(args) => commands::regions::run(args).await,
            Commands::Deploy(args) => commands::deploy::run(args).await,
            Commands::ShowConfig(args) => commands::show_config::run(args).await,
            Commands::Terminate(args) => commands::terminate::run(args).await,
            Commands::RegionOnline(args) => commands::region::online(args).await,
            Commands::RegionRetire(args) => commands::region::retire(args).await,
        }
    }
}
