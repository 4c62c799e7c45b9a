//! On-disk shot lists.
//!
//! Files carry a `version` field. Older layouts are upgraded in memory
//! before decoding; newer ones are refused.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shotline_core::{Result, Shot, ShotlineError};
use std::path::Path;

/// Layout written by [`ShotListFile::to_json`].
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotListFile {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    pub shots: Vec<Shot>,
    /// Crate version of the writer, informational only.
    pub app_version: String,
}

impl ShotListFile {
    pub fn new(name: impl Into<String>, shots: Vec<Shot>) -> Self {
        Self {
            version: CURRENT_VERSION,
            name: name.into(),
            shots,
            app_version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            ShotlineError::Serialization(format!("Failed to serialize shot list: {}", e))
        })
    }

    /// Decode, upgrading pre-versioned layouts. A missing `version` is
    /// read as 0.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|e| ShotlineError::Serialization(format!("malformed shot list: {}", e)))?;

        let found = value
            .get("version")
            .and_then(Value::as_u64)
            .map_or(0, |v| v.min(u32::MAX as u64) as u32);
        if found > CURRENT_VERSION {
            return Err(ShotlineError::Serialization(format!(
                "shot list layout {} is not supported (up to {})",
                found, CURRENT_VERSION
            )));
        }

        let value = upgrade(value, found)?;
        serde_json::from_value(value)
            .map_err(|e| ShotlineError::Serialization(format!("bad shot list fields: {}", e)))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read(path)?)
    }
}

/// Rewrite `value` one layout at a time until it reaches [`CURRENT_VERSION`].
fn upgrade(mut value: Value, mut at: u32) -> Result<Value> {
    while at < CURRENT_VERSION {
        value = match at {
            0 => wrap_legacy(value),
            other => {
                return Err(ShotlineError::Serialization(format!(
                    "cannot upgrade shot list layout {}",
                    other
                )))
            }
        };
        at += 1;
    }
    Ok(value)
}

/// Layout 0 was either a bare shot array or an object without `version`.
fn wrap_legacy(value: Value) -> Value {
    match value {
        Value::Array(shots) => json!({
            "version": 1,
            "name": "",
            "shots": shots,
            "app_version": "0.0.0",
        }),
        Value::Object(mut fields) => {
            fields.insert("version".into(), json!(1));
            fields
                .entry("app_version")
                .or_insert_with(|| json!("0.0.0"));
            Value::Object(fields)
        }
        other => other,
    }
}
