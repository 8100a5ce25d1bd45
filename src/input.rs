use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::record::LookupRequest;

/// Accepted input shapes: grouped names, or the legacy flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputFile {
    Grouped(Vec<NameGroup>),
    Flat(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct NameGroup {
    names: Vec<String>,
    additional_names: Vec<String>,
}

/// Read and flatten the input file into one request per candidate name.
///
/// Duplicates are kept; spelling variants of one name are expected to resolve
/// to the same record.
pub fn load_requests(path: &Path) -> Result<Vec<LookupRequest>> {
    if !path.is_file() {
        bail!("The file {} does not exist.", path.display());
    }

    debug!("Loading JSON file from {}", path.display());
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let requests = parse_requests(&raw)
        .with_context(|| format!("{} is not a valid name list", path.display()))?;
    debug!("Loaded {} names from JSON file", requests.len());

    Ok(requests)
}

fn parse_requests(raw: &str) -> Result<Vec<LookupRequest>> {
    let names: Vec<String> = match serde_json::from_str::<InputFile>(raw)? {
        InputFile::Grouped(groups) => groups
            .into_iter()
            .flat_map(|g| g.names.into_iter().chain(g.additional_names))
            .collect(),
        InputFile::Flat(names) => names,
    };

    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .map(LookupRequest::new)
        .collect())
}
