use std::{env, path::Path};

use tracing::debug;

use crate::{ConflabError, Result};

const SERVICE_VAR: &str = "CONFLAB_SERVICE";

/// Finds the service name that roots the remote key space.
///
/// Tried in order: the explicit name, `CONFLAB_SERVICE`, `[package].name`
/// in `<root>/Cargo.toml` and `name` in `<root>/package.json`.
///
/// # Errors
/// * `ConflabError::MissingServiceName` - If none of the sources has a name
pub async fn discover_service_name(explicit: Option<&str>, root: &Path) -> Result<String> {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }

    if let Some(name) = env::var(SERVICE_VAR).ok().filter(|name| !name.is_empty()) {
        return Ok(name);
    }

    if let Some(name) = cargo_package_name(&root.join("Cargo.toml")).await {
        debug!(service = %name, "Using service name from Cargo.toml");
        return Ok(name);
    }

    if let Some(name) = npm_package_name(&root.join("package.json")).await {
        debug!(service = %name, "Using service name from package.json");
        return Ok(name);
    }

    Err(ConflabError::MissingServiceName)
}

async fn cargo_package_name(path: &Path) -> Option<String> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let manifest: toml::Table = toml::from_str(&content).ok()?;

    manifest
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_owned)
}

async fn npm_package_name(path: &Path) -> Option<String> {
    let content = tokio::fs::read(path).await.ok()?;
    let manifest: serde_json::Value = serde_json::from_slice(&content).ok()?;

    manifest.get("name")?.as_str().map(str::to_owned)
}
