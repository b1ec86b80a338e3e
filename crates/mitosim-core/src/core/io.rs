//! Persistence of resolved configurations and per-block coordinate snapshots.
//!
//! A [`ResolvedConfig`] is the frozen snapshot captured after the configuration
//! pass: the ordered action parameter records plus the final shared-state
//! contents. It is used for deterministic run naming and for reproducibility
//! dumps, and is never mutated once captured.

use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("snapshot serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

/// One configured action: its (possibly renamed) identity and parameter record.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub name: String,
    pub params: toml::Value,
}

/// The frozen result of a successful configuration pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub actions: Vec<ActionRecord>,
    pub shared: BTreeMap<String, toml::Value>,
}

const FOLDER_NAME_MAX_LEN: usize = 120;

impl ResolvedConfig {
    /// A deterministic folder name derived from the action sequence and its
    /// scalar parameters. Long names are truncated and suffixed with a content
    /// hash so distinct configurations never collide.
    pub fn folder_name(&self) -> String {
        let mut parts = Vec::new();
        for record in &self.actions {
            let mut piece = record.name.clone();
            if let toml::Value::Table(table) = &record.params {
                for (key, value) in table {
                    let rendered = match value {
                        toml::Value::Integer(v) => v.to_string(),
                        toml::Value::Float(v) => format!("{v}"),
                        toml::Value::Boolean(v) => v.to_string(),
                        toml::Value::String(v) => v.clone(),
                        _ => continue,
                    };
                    piece.push_str(&format!("_{key}-{rendered}"));
                }
            }
            parts.push(piece);
        }
        let full = sanitize(&parts.join("_"));

        if full.len() <= FOLDER_NAME_MAX_LEN {
            full
        } else {
            let digest = fnv1a64(full.as_bytes());
            let mut cut = FOLDER_NAME_MAX_LEN - 17;
            while !full.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}_{digest:016x}", &full[..cut])
        }
    }

    /// Serializes the full resolved configuration to `<dir>/config.toml`,
    /// creating the directory if needed. Returns the file path.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, IoError> {
        fs::create_dir_all(dir)?;
        let path = dir.join("config.toml");
        let rendered = toml::to_string_pretty(self)?;
        fs::write(&path, rendered)?;
        Ok(path)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Writes per-block coordinate snapshots as CSV files keyed by block index.
#[derive(Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IoError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_block(&self, block: usize, coords: &[Point3<f64>]) -> Result<PathBuf, IoError> {
        let path = self.dir.join(format!("block_{block:09}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["x", "y", "z"])?;
        for p in coords {
            writer.write_record([p.x.to_string(), p.y.to_string(), p.z.to_string()])?;
        }
        writer.flush()?;
        Ok(path)
    }
}
