use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GlobalJson {
    sdk: Option<GlobalJsonSdk>,
}

#[derive(Debug, Deserialize)]
struct GlobalJsonSdk {
    version: Option<String>,
}

/// SDK version (`major.minor`) pinned by the nearest `global.json` at or
/// above `dir`.
///
/// Only the nearest file counts: if it is unreadable or has no usable
/// version, `None` is returned without looking further up.
pub fn read_sdk_version(dir: &Path) -> Option<String> {
    let path = dir
        .ancestors()
        .map(|ancestor| ancestor.join("global.json"))
        .find(|candidate| candidate.is_file())?;
    debug!("Reading SDK version from {}", path.display());

    let content = std::fs::read_to_string(&path).ok()?;
    let global_json: GlobalJson = serde_json::from_str(&content).ok()?;
    let version = global_json.sdk?.version?;

    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    Some(format!("{}.{}", major, minor))
}
