//! Sites file reading and output directory preparation.

use crate::env::resolve_env_vars;
use crate::schema::SitesFile;
use anyhow::{bail, Context, Result};
use restabot_core::mime::IMAGE_EXTENSIONS;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Read and parse a sites file, substituting `${VAR}` references.
pub async fn load_sites_file(path: &Path) -> Result<SitesFile> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read sites file: {}", path.display()))?;

    let sites = parse_sites(&raw)
        .with_context(|| format!("Failed to parse sites YAML at: {}", path.display()))?;

    info!(path = %path.display(), restaurants = sites.restaurants.len(), "Loaded sites file");
    Ok(sites)
}

/// Parse sites YAML from a string. Env vars are resolved before typing so a
/// missing variable is reported with its YAML path.
pub fn parse_sites(raw: &str) -> Result<SitesFile> {
    let value: serde_yaml::Value = serde_yaml::from_str(raw).context("Invalid YAML")?;
    let value = resolve_env_vars(&value)?;
    let sites: SitesFile =
        serde_yaml::from_value(value).context("Sites file does not match the expected schema")?;
    Ok(sites)
}

/// Create `dir` if it does not exist and return its canonical path.
///
/// Fails when the path exists but is not a directory.
pub async fn ensure_output_dir(dir: &Path) -> Result<PathBuf> {
    match fs::metadata(dir).await {
        Ok(meta) if !meta.is_dir() => bail!("{} is not a directory", dir.display()),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %dir.display(), "Creating output directory");
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to inspect directory: {}", dir.display()));
        }
    }
    fs::canonicalize(dir)
        .await
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))
}

/// Save `<dir>/<id>.<extension>`, removing images of the same id with other
/// extensions first so later stages cannot pick up a stale file.
pub async fn write_image(dir: &Path, id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
    for ext in IMAGE_EXTENSIONS.iter().copied().filter(|e| *e != extension) {
        let stale = dir.join(format!("{id}.{ext}"));
        match fs::remove_file(&stale).await {
            Ok(()) => debug!(path = %stale.display(), "Removed stale image"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove stale image: {}", stale.display()));
            }
        }
    }
    let path = dir.join(format!("{id}.{extension}"));
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
