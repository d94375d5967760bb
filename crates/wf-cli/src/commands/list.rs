use clap::Args;

use wf_core::types::VpnInstance;

use crate::Result;
use crate::config::AppConfig;

/// List instances
#[derive(Args, Debug)]
pub struct ListArgs {}

pub async fn run(_args: ListArgs) -> Result<()> {
    let coordinator = AppConfig::from_env()?.connect()?;
    let instances = coordinator.refresh().await?;

    if instances.is_empty() {
        println!("No running instances.");
        return Ok(());
    }

    println!(
        "{:<28} {:<16} {:<22} {:<16} STATUS",
        "OWNER", "REGION", "INSTANCE", "IPV4"
    );
    for inst in &instances {
        println!("{}", row(inst));
    }
    Ok(())
}

fn row(inst: &VpnInstance) -> String {
    let owner = inst.email.as_deref().unwrap_or(inst.owner.as_str());
    let region = inst.region.as_ref().map_or("-", |r| r.as_str());
    format!(
        "{:<28} {:<16} {:<22} {:<16} {}",
        owner,
        region,
        inst.id.as_str(),
        inst.public_ipv4,
        inst.status
    )
}
