//! Timeline file format and serialization utilities

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::Timeline;

/// On-disk encoding, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    /// `.msgpack` / `.mp` are MessagePack, everything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("msgpack" | "mp") => Self::MessagePack,
            _ => Self::Json,
        }
    }
}

/// A timeline together with the identity the core leaves out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFile {
    pub id: Uuid,

    pub name: String,

    pub created_at: DateTime<Utc>,

    /// Records in playback order
    pub records: Timeline,

    /// Version of macroreel that wrote the file
    #[serde(default)]
    pub app_version: String,
}

impl TimelineFile {
    pub fn new(name: impl Into<String>, records: Timeline) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            records,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Serialize to MessagePack bytes (named fields, so defaults still apply on read)
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_slice(bytes: &[u8], encoding: Encoding) -> Result<Self> {
        let file = match encoding {
            Encoding::Json => serde_json::from_slice(bytes)?,
            Encoding::MessagePack => rmp_serde::from_slice(bytes)?,
        };
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let bytes = match Encoding::from_path(path) {
            Encoding::Json => self.to_json()?,
            Encoding::MessagePack => self.to_msgpack()?,
        };

        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write timeline file: {:?}", path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read timeline file: {:?}", path))?;

        Self::from_slice(&bytes, Encoding::from_path(path))
            .with_context(|| format!("Failed to parse timeline file: {:?}", path))
    }
}
