use std::str::FromStr;

use clap::Args;

use wf_core::selection::Toggle;
use wf_core::types::{InstanceId, OwnerId, RegionId};

use crate::config::AppConfig;
use crate::{Error, Result};

/// Terminate instances
#[derive(Args, Debug)]
pub struct TerminateArgs {
    /// Targets as `owner/region/instance`
    #[arg(required = true)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub owner: OwnerId,
    pub region: RegionId,
    pub instance: InstanceId,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(region), Some(instance), None)
                if ![owner, region, instance].iter().any(|p| p.is_empty()) =>
            {
                Ok(Self {
                    owner: owner.into(),
                    region: region.into(),
                    instance: instance.into(),
                })
            }
            _ => Err(Error::InvalidTarget(s.to_string())),
        }
    }
}

pub async fn run(args: TerminateArgs) -> Result<()> {
    let coordinator = AppConfig::from_env()?.connect()?;

    for t in &args.targets {
        coordinator
            .targets()
            .toggle(Toggle::Add, &t.owner, Some(&t.region), &t.instance);
    }

    let terminated = coordinator.terminate().await?;
    if terminated.is_empty() {
        println!("Nothing was terminated.");
    }
    for id in &terminated {
        println!("Terminated {id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_region_instance() {
        let t: Target = "u1/us-east-1/i-1".parse().unwrap();
        assert_eq!(t.owner.as_str(), "u1");
        assert_eq!(t.region.as_str(), "us-east-1");
        assert_eq!(t.instance.as_str(), "i-1");
    }

    #[test]
    fn rejects_malformed_targets() {
        for bad in ["i-1", "u1/us-east-1", "u1//i-1", "u1/us-east-1/i-1/x", ""] {
            assert!(
                matches!(bad.parse::<Target>(), Err(Error::InvalidTarget(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
