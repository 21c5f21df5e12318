//! Source credentials loading and validation.

use crate::error::TransferError;
use serde::Deserialize;
use std::path::Path;

/// Raw shape of the credentials file; every key optional so validation can
/// name the missing one instead of surfacing a serde error.
#[derive(Deserialize)]
struct RawCredentials {
    access_key: Option<String>,
    secret_key: Option<String>,
    region: Option<String>,
}

/// Validated source-account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    /// Region override; the source client falls back to `us-east-1`.
    pub region: Option<String>,
}

/// Loads and validates credentials from a JSON file.
///
/// Fails before any network call when the file is unreadable, not JSON, or
/// missing `access_key`/`secret_key`.
pub fn load_credentials(path: &Path) -> Result<Credentials, TransferError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TransferError::Credentials(format!("could not read {}: {}", path.display(), e))
    })?;
    let raw: RawCredentials = serde_json::from_str(&content).map_err(|e| {
        TransferError::Credentials(format!("could not parse {}: {}", path.display(), e))
    })?;

    let access_key = require(raw.access_key, "access_key")?;
    let secret_key = require(raw.secret_key, "secret_key")?;

    Ok(Credentials {
        access_key,
        secret_key,
        region: raw.region,
    })
}

fn require(value: Option<String>, name: &str) -> Result<String, TransferError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransferError::Credentials(format!(
            "missing required credential key: {}",
            name
        ))),
    }
}
