//! `restabot doctor`: environment, browser and restaurant list checks.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use restabot_config::{collect_referenced_vars, load_restaurants, Settings};
use restabot_core::SourceRef;

use crate::backends;
use crate::terminal_output::{check_line, note_error, note_success, CheckStatus};

/// Environment variables and whether the pipeline can run without them.
const ENV_CHECKS: &[(&str, bool)] = &[
    ("GEMINI_API_KEY", false),
    ("SLACK_BOT_TOKEN", true),
    ("SLACK_CHANNEL_ID", true),
    ("CHROME_PATH", true),
];

pub async fn run(settings: &Settings, sites: Option<&Path>) -> Result<ExitCode> {
    println!("\n🔍 Running restabot doctor...\n");

    let mut all_good = check_env_vars(&|key| std::env::var(key).ok());
    all_good &= check_browser(settings);
    if let Some(sites) = sites {
        all_good &= check_sites(settings, sites).await;
    }

    println!();
    if all_good {
        note_success("All checks passed.");
        Ok(ExitCode::SUCCESS)
    } else {
        note_error("Some checks failed. Please fix the errors above.");
        Ok(ExitCode::FAILURE)
    }
}

fn is_set(lookup: &dyn Fn(&str) -> Option<String>, var: &str) -> bool {
    lookup(var).is_some_and(|v| !v.trim().is_empty())
}

fn env_lines(lookup: &dyn Fn(&str) -> Option<String>) -> (Vec<String>, bool) {
    let mut all_good = true;
    let lines = ENV_CHECKS
        .iter()
        .map(|&(var, optional)| {
            if is_set(lookup, var) {
                check_line(CheckStatus::Pass, &format!("{var} is set"))
            } else if optional {
                check_line(CheckStatus::Optional, &format!("{var} is missing (optional)"))
            } else {
                all_good = false;
                check_line(CheckStatus::Fail, &format!("{var} is missing (REQUIRED)"))
            }
        })
        .collect();
    (lines, all_good)
}

fn check_env_vars(lookup: &dyn Fn(&str) -> Option<String>) -> bool {
    println!("Checking environment variables:");
    let (lines, all_good) = env_lines(lookup);
    for line in lines {
        println!("{line}");
    }
    all_good
}

fn check_browser(settings: &Settings) -> bool {
    println!("Checking browser:");
    match backends::launcher(settings) {
        Ok(launcher) if launcher.executable().is_absolute() && !launcher.executable().exists() => {
            println!(
                "{}",
                check_line(
                    CheckStatus::Fail,
                    &format!("{} does not exist", launcher.executable().display())
                )
            );
            false
        }
        Ok(launcher) => {
            println!(
                "{}",
                check_line(CheckStatus::Pass, &format!("Using {}", launcher.executable().display()))
            );
            true
        }
        Err(e) => {
            println!("{}", check_line(CheckStatus::Fail, &format!("{e:#}")));
            false
        }
    }
}

/// Variables referenced as `${VAR}` in the raw sites file.
async fn referenced_vars(path: &Path) -> Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&raw).with_context(|| format!("Invalid YAML in {}", path.display()))?;
    Ok(collect_referenced_vars(&value))
}

async fn check_sites(settings: &Settings, path: &Path) -> bool {
    println!("Checking restaurant list {}:", path.display());
    let mut all_good = true;

    match referenced_vars(path).await {
        Ok(vars) => {
            for var in vars {
                if std::env::var(&var).is_ok_and(|v| !v.is_empty()) {
                    println!("{}", check_line(CheckStatus::Pass, &format!("{var} is set")));
                } else {
                    println!("{}", check_line(CheckStatus::Fail, &format!("{var} is referenced but missing")));
                    all_good = false;
                }
            }
        }
        Err(e) => {
            println!("{}", check_line(CheckStatus::Fail, &format!("{e:#}")));
            return false;
        }
    }

    match load_restaurants(path).await {
        Ok(restaurants) => {
            let slack = restaurants.iter().filter(|r| r.source().is_slack()).count();
            let web = restaurants.iter().filter(|r| r.source().is_web()).count();
            println!(
                "{}",
                check_line(
                    CheckStatus::Pass,
                    &format!("{} restaurants ({web} web, {slack} slack)", restaurants.len())
                )
            );
            for r in &restaurants {
                if let SourceRef::Unsupported(url) = r.source() {
                    println!("{}", check_line(CheckStatus::Optional, &format!("{}: unsupported source {url}", r.id)));
                }
            }
            if slack > 0 && settings.slack_bot_token.is_none() {
                println!(
                    "{}",
                    check_line(
                        CheckStatus::Fail,
                        "slack:// restaurants need SLACK_BOT_TOKEN"
                    )
                );
                all_good = false;
            }
        }
        Err(e) => {
            println!("{}", check_line(CheckStatus::Fail, &format!("{e:#}")));
            all_good = false;
        }
    }
    all_good
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn missing_gemini_key_fails() {
        let (lines, ok) = env_lines(&lookup(&[("SLACK_BOT_TOKEN", "xoxb-1")]));
        assert!(!ok);
        assert!(lines[0].contains("🔴 GEMINI_API_KEY is missing (REQUIRED)"));
        assert!(lines[1].contains("🟢 SLACK_BOT_TOKEN is set"));
        assert!(lines[2].contains("🟡 SLACK_CHANNEL_ID is missing (optional)"));
    }

    #[test]
    fn optional_vars_do_not_fail() {
        let (_, ok) = env_lines(&lookup(&[("GEMINI_API_KEY", "AIza-1")]));
        assert!(ok);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let (_, ok) = env_lines(&lookup(&[("GEMINI_API_KEY", "  ")]));
        assert!(!ok);
    }

    #[tokio::test]
    async fn lists_referenced_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.yaml");
        std::fs::write(
            &path,
            "restaurants:\n  - id: bistro\n    name: Bistro\n    url: slack://${MENU_CHANNEL}\n",
        )
        .unwrap();
        assert_eq!(referenced_vars(&path).await.unwrap(), ["MENU_CHANNEL"]);
    }
}
