use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::record::ResultCollection;

/// Sorted JSON object keyed by lowercase name, 4-space indent, UTF-8 unescaped.
pub fn render(collection: &ResultCollection) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    collection
        .sorted()
        .serialize(&mut ser)
        .context("Failed to serialize results")?;
    Ok(buf)
}

pub fn save(path: &Path, bytes: &[u8]) -> Result<()> {
    debug!("Saving JSON data to {}", path.display());
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Data successfully saved");
    Ok(())
}
