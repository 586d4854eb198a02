//! State file I/O.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::resource::FileDeclaration;

/// Read a declaration from a JSON state file.
pub fn load(path: &Path) -> Result<FileDeclaration> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file '{}'", path.display()))
}

/// Write a declaration as pretty JSON.
pub fn save(path: &Path, decl: &FileDeclaration) -> Result<()> {
    let mut json = serde_json::to_string_pretty(decl)?;
    json.push('\n');
    fs::write(path, json)
        .with_context(|| format!("failed to write state file '{}'", path.display()))
}
