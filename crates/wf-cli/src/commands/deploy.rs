use clap::Args;

use crate::Result;
use crate::config::AppConfig;
use crate::output::{self, ArtifactArgs};

/// Deploy an endpoint
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Region id, e.g. `us-west-1`
    pub region: String,

    #[command(flatten)]
    pub artifact: ArtifactArgs,
}

pub async fn run(args: DeployArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let coordinator = config.connect()?;

    let deployment = coordinator.deploy(&args.region.as_str().into()).await?;
    if deployment.is_new {
        println!(
            "Deployed a new endpoint in {} at {}",
            deployment.region, deployment.public_ipv4
        );
    } else {
        println!(
            "Reusing your endpoint in {} at {}",
            deployment.region, deployment.public_ipv4
        );
    }

    let artifact = match coordinator.current_artifact() {
        Some(artifact) => artifact,
        None => deployment.artifact()?,
    };
    let path = output::emit(&artifact, &args.artifact, &config.config_file)?;
    println!("Client config written to {}", path.display());
    Ok(())
}
