use clap::Args;

use crate::Result;
use crate::config::AppConfig;
use crate::output::{self, ArtifactArgs};

/// Write the config for a listed instance
#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    /// Instance id as shown by `list`
    pub instance: String,

    #[command(flatten)]
    pub artifact: ArtifactArgs,
}

pub async fn run(args: ShowConfigArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let coordinator = config.connect()?;

    coordinator.refresh().await?;
    let artifact = coordinator
        .show_config_for(&args.instance.as_str().into())
        .await?;

    let path = output::emit(&artifact, &args.artifact, &config.config_file)?;
    println!("Client config written to {}", path.display());
    Ok(())
}
