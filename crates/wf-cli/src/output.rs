//! Where a generated client config ends up: a file, an optional SVG QR code,
//! and a QR code drawn in the terminal.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;
use wf_core::wireguard::ConfigArtifact;

use crate::Result;

#[derive(Args, Debug, Clone, Default)]
pub struct ArtifactArgs {
    /// Write the config here instead of `WGFLEET_CONFIG_FILE`
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Also write the QR code as an SVG image
    #[arg(long)]
    pub svg: Option<PathBuf>,

    /// Do not print the QR code to the terminal
    #[arg(long)]
    pub no_qr: bool,
}

/// Write `artifact` to every requested sink. Returns the config file path.
pub fn emit(artifact: &ConfigArtifact, args: &ArtifactArgs, default_path: &Path) -> Result<PathBuf> {
    let path = args.out.clone().unwrap_or_else(|| default_path.to_path_buf());
    std::fs::write(&path, artifact.text())?;
    info!(path = %path.display(), "wrote client config");

    if let Some(svg_path) = &args.svg {
        std::fs::write(svg_path, artifact.to_svg()?)?;
        info!(path = %svg_path.display(), "wrote QR code");
    }

    if !args.no_qr {
        println!("{}", artifact.to_terminal()?);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const KEY: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";

    fn artifact() -> ConfigArtifact {
        ConfigArtifact::generate(KEY, KEY, Ipv4Addr::new(1, 2, 3, 4)).unwrap()
    }

    #[test]
    fn writes_config_to_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("wireguard.conf");
        let args = ArtifactArgs {
            no_qr: true,
            ..Default::default()
        };

        let written = emit(&artifact(), &args, &default).unwrap();
        assert_eq!(written, default);
        assert_eq!(std::fs::read_to_string(&default).unwrap(), artifact().text());
    }

    #[test]
    fn out_and_svg_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let args = ArtifactArgs {
            out: Some(dir.path().join("laptop.conf")),
            svg: Some(dir.path().join("laptop.svg")),
            no_qr: true,
        };

        emit(&artifact(), &args, &dir.path().join("unused.conf")).unwrap();

        assert!(!dir.path().join("unused.conf").exists());
        assert!(dir.path().join("laptop.conf").exists());
        let svg = std::fs::read_to_string(dir.path().join("laptop.svg")).unwrap();
        assert!(svg.contains("<svg"));
    }
}
