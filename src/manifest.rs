//! Dex metadata manifest
//!
//! One line per produced container, module then group order:
//!
//! ```text
//! dex classes.dex 10482 blake3:5e0c...
//! dex assets/secondary-program-dex-jars/secondary-1_1.dex.jar 8211 blake3:91a7...
//! video assets/video/video-1_1.dex.jar 3012 blake3:0f4d...
//! ```
//!
//! Paths are relative to the output directory and never contain spaces.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::dex::{DexOutputKind, MergeResult};
use crate::error::fs::{manifest_mismatch, write_failed};
use crate::error::{Result, file_read_failed};
use crate::hash::{FileDigest, digest_file, verify_hash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub module: String,
    pub path: String,
    pub size: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Digest every planned container below `out_dir`
    ///
    /// Directory outputs contribute their regular files, sorted by name; a
    /// directory that was never created contributes nothing.
    ///
    /// # Errors
    ///
    /// Fails if a planned file is missing or unreadable.
    pub fn collect(result: &MergeResult, out_dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for (module, output) in result.outputs() {
            let files = match output.kind {
                DexOutputKind::Primary | DexOutputKind::Secondary => vec![output.path.clone()],
                DexOutputKind::Directory => list_dir(out_dir, &output.path)?,
            };
            for path in files {
                let FileDigest { size, hash } = digest_file(&out_dir.join(&path))?;
                entries.push(ManifestEntry {
                    module: module.to_string(),
                    path,
                    size,
                    hash,
                });
            }
        }
        debug!(entries = entries.len(), "Collected dex manifest");
        Ok(Self { entries })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            let _ = writeln!(out, "{} {} {} {}", e.module, e.path, e.size, e.hash);
        }
        out
    }

    /// Write the rendered manifest to `path`
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::FileWriteFailed`] if the file
    /// cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .map_err(|e| write_failed(path.display().to_string(), e.to_string()))
    }

    /// Parse rendered manifest text; blank lines are ignored
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::ManifestMismatch`] for a line
    /// that does not have four fields or whose size is not a number.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [module, path, size, hash] = fields.as_slice() else {
                return Err(manifest_mismatch(format!(
                    "line {} has {} fields, expected 4",
                    n + 1,
                    fields.len()
                )));
            };
            let size = size
                .parse()
                .map_err(|_| manifest_mismatch(format!("line {}: bad size '{size}'", n + 1)))?;
            entries.push(ManifestEntry {
                module: (*module).to_string(),
                path: (*path).to_string(),
                size,
                hash: (*hash).to_string(),
            });
        }
        Ok(Self { entries })
    }

    /// Module name to its container paths, in manifest order
    pub fn by_module(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in &self.entries {
            map.entry(e.module.clone()).or_default().push(e.path.clone());
        }
        map
    }

    /// Check every entry against the file under `out_dir`
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::ManifestMismatch`] naming the
    /// first file whose size or digest differs.
    pub fn verify(&self, out_dir: &Path) -> Result<()> {
        for e in &self.entries {
            let actual = digest_file(&out_dir.join(&e.path))?;
            if actual.size != e.size {
                return Err(manifest_mismatch(format!(
                    "{} is {} bytes, manifest says {}",
                    e.path, actual.size, e.size
                )));
            }
            if !verify_hash(&e.hash, &actual.hash) {
                return Err(manifest_mismatch(format!("{} has digest {}", e.path, actual.hash)));
            }
        }
        Ok(())
    }
}

fn list_dir(out_dir: &Path, rel: &str) -> Result<Vec<String>> {
    let dir = out_dir.join(rel);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let read = fs::read_dir(&dir).map_err(|e| file_read_failed(dir.display().to_string(), e.to_string()))?;
    let mut names = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| file_read_failed(dir.display().to_string(), e.to_string()))?;
        if entry.file_type().is_ok_and(|t| t.is_file()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names.into_iter().map(|name| format!("{rel}/{name}")).collect())
}
