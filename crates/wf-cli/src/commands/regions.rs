use clap::Args;

use wf_core::regions::{self, Region};

use crate::Result;
use crate::config::AppConfig;

/// Show regions
#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Show regions that are currently online instead of the catalog
    #[arg(long)]
    pub live: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RegionsArgs) -> Result<()> {
    let listed = if args.live {
        let coordinator = AppConfig::from_env()?.connect()?;
        match coordinator.live_regions().await? {
            Some(live) => live,
            None => {
                println!("Live regions are not visible to this account.");
                return Ok(());
            }
        }
    } else {
        regions::supported()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        print!("{}", table(&listed));
    }
    Ok(())
}

fn table(regions: &[Region]) -> String {
    regions
        .iter()
        .map(|r| format!("{:<16} {}\n", r.id.as_str(), r.name))
        .collect()
}
