use clap::Args;

use crate::Result;
use crate::config::AppConfig;

/// Region lifecycle arguments
#[derive(Args, Debug)]
pub struct RegionArgs {
    /// Region id, e.g. `eu-west-3`
    pub region: String,
}

pub async fn online(args: RegionArgs) -> Result<()> {
    let coordinator = AppConfig::from_env()?.connect()?;
    let region = coordinator
        .bring_region_online(&args.region.as_str().into())
        .await?;
    println!("Region {region} is online.");
    Ok(())
}

pub async fn retire(args: RegionArgs) -> Result<()> {
    let coordinator = AppConfig::from_env()?.connect()?;
    let region = coordinator
        .retire_region(&args.region.as_str().into())
        .await?;
    println!("Region {region} has been cleaned up.");
    Ok(())
}
