//! `restabot-config`: restaurant list and runtime settings.
//!
//! Provides:
//! - Typed sites file schema (`restaurants: [{id, name, url}]`)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Validation with user-friendly paths
//! - Runtime settings read from the environment and `.env`

pub mod env;
pub mod io;
pub mod schema;
pub mod settings;
pub mod validation;

pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{ensure_output_dir, load_sites_file, parse_sites, write_image};
pub use schema::SitesFile;
pub use settings::{load_env_file, Settings};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use restabot_core::Restaurant;
use std::path::Path;

/// Load, substitute env vars, and validate a sites file.
///
/// This is the main entry point used by every stage.
pub async fn load_restaurants(path: &Path) -> Result<Vec<Restaurant>> {
    let sites = load_sites_file(path).await?;

    let report = validate(&sites);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Sites file warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Sites file error");
    }
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!(
            "{} is invalid:\n  {}",
            path.display(),
            details.join("\n  ")
        );
    }

    Ok(sites.restaurants)
}
