//! WireGuard client config synthesis and its QR encoding.
//!
//! The same text is offered as a file and encoded into the QR image, so the
//! rendering must be byte-for-byte stable: fixed field order, `\n` line
//! endings, trailing newline.

use std::fmt::Write as _;
use std::net::Ipv4Addr;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use qrcode::QrCode;
use qrcode::render::{svg, unicode};

use crate::{Error, Result};

/// Server listen port.
pub const LISTEN_PORT: u16 = 51820;

/// Default file name offered for download.
pub const CONFIG_FILE_NAME: &str = "wireguard.conf";

const CLIENT_ADDRESS: &str = "10.0.0.2/24, fd42:42:42::2/64";
const CLIENT_DNS: &str = "1.1.1.1, 2606:4700:4700::1111";
const ALLOWED_IPS: &str = "0.0.0.0/0, ::/0";
const PERSISTENT_KEEPALIVE_SECS: u16 = 25;

const QR_MIN_SIZE: u32 = 250;

/// Render the client config for one endpoint.
pub fn synthesize(client_private_key: &str, server_public_key: &str, endpoint: Ipv4Addr) -> String {
    let mut conf = String::with_capacity(320);
    // Writing into a String cannot fail.
    let _ = write!(
        conf,
        "[Interface]\n\
         PrivateKey = {client_private_key}\n\
         Address = {CLIENT_ADDRESS}\n\
         DNS = {CLIENT_DNS}\n\
         \n\
         [Peer]\n\
         PublicKey = {server_public_key}\n\
         Endpoint = {endpoint}:{LISTEN_PORT}\n\
         AllowedIPs = {ALLOWED_IPS}\n\
         PersistentKeepalive = {PERSISTENT_KEEPALIVE_SECS}\n"
    );
    conf
}

/// True if `key` is a base64-encoded 32-byte Curve25519 key.
pub fn is_well_formed_key(key: &str) -> bool {
    BASE64
        .decode(key.trim())
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

/// Config text plus everything derived from it. Equal text always yields
/// equal renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    text: String,
}

impl ConfigArtifact {
    /// Wrap already-rendered config text, rejecting text too large for a QR code.
    pub fn new(text: String) -> Result<Self> {
        encode(&text)?;
        Ok(Self { text })
    }

    /// Synthesize and wrap in one step.
    pub fn generate(client_private_key: &str, server_public_key: &str, endpoint: Ipv4Addr) -> Result<Self> {
        Self::new(synthesize(client_private_key, server_public_key, endpoint))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// SVG document of the QR code, at least 250×250.
    pub fn to_svg(&self) -> Result<String> {
        Ok(encode(&self.text)?
            .render::<svg::Color<'_>>()
            .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
            .build())
    }

    /// QR code drawn with Unicode half blocks for a terminal.
    pub fn to_terminal(&self) -> Result<String> {
        Ok(encode(&self.text)?
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build())
    }
}

fn encode(text: &str) -> Result<QrCode> {
    QrCode::new(text.as_bytes()).map_err(|e| Error::Qr(e.to_string()))
}
