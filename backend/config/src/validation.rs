//! Sites file validation with user-friendly error messages.

use crate::schema::SitesFile;
use once_cell::sync::Lazy;
use regex::Regex;
use restabot_core::SourceRef;
use std::collections::HashSet;
use thiserror::Error;

/// Restaurant ids become artifact file names.
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// A validation finding with field path and message.
#[derive(Debug, Error)]
#[error("Sites validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the sites file and return a report of all errors and warnings.
pub fn validate(sites: &SitesFile) -> ValidationReport {
    let mut report = ValidationReport::default();

    if sites.restaurants.is_empty() {
        report.warn("restaurants", "No restaurants configured; the pipeline has nothing to do");
    }

    let mut seen = HashSet::new();
    for (i, r) in sites.restaurants.iter().enumerate() {
        let path = format!("restaurants[{i}]");

        if r.id.trim().is_empty() {
            report.error(format!("{path}.id"), "Restaurant id cannot be empty");
        } else if !ID_PATTERN.is_match(&r.id) {
            report.error(
                format!("{path}.id"),
                format!("'{}' may only contain letters, digits, '-' and '_'", r.id),
            );
        } else if !seen.insert(r.id.as_str()) {
            report.error(format!("{path}.id"), format!("Duplicate restaurant id '{}'", r.id));
        }

        if r.name.trim().is_empty() {
            report.error(format!("{path}.name"), "Restaurant name cannot be empty");
        }

        match r.source() {
            SourceRef::Web(_) => {}
            SourceRef::Slack { channel } if channel.is_empty() => {
                report.error(format!("{path}.url"), "slack:// source needs a channel id");
            }
            SourceRef::Slack { .. } => {}
            SourceRef::Unsupported(url) => {
                report.error(
                    format!("{path}.url"),
                    format!("Unsupported source '{url}'; expected http(s):// or slack://"),
                );
            }
        }
    }

    report
}
