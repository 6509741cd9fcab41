//! Signing key loading
//!
//! The key is read from one environment variable and parsed into a local
//! signer. Error messages never contain key material.

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use tracing::info;

use crate::error::{Error, Result};

/// Load the signing identity from the named environment variable
pub fn load_signer_from_env(var: &str) -> Result<PrivateKeySigner> {
    let raw = std::env::var(var).map_err(|_| Error::MissingEnvVar(var.to_string()))?;
    let signer = parse_signer(&raw)?;
    info!("Loaded signer {} from ${}", signer.address(), var);
    Ok(signer)
}

/// Parse a hex secret key, with or without `0x`
pub fn parse_signer(raw: &str) -> Result<PrivateKeySigner> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if hex.len() != 64 {
        return Err(Error::InvalidKey(format!(
            "expected 32 bytes of hex, got {} characters",
            hex.len()
        )));
    }

    let bytes: B256 = hex
        .parse()
        .map_err(|_| Error::InvalidKey("key is not valid hex".to_string()))?;

    PrivateKeySigner::from_bytes(&bytes)
        .map_err(|_| Error::InvalidKey("key is not a valid secp256k1 scalar".to_string()))
}
