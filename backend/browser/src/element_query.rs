//! Element Queries
//!
//! DOM lookups evaluated inside the page. Used to dismiss cookie consent
//! banners before a screenshot is taken.

use anyhow::Result;
use tracing::{debug, info};

use crate::page_control::PageControl;

/// Button captions that accept a consent dialog, tried in order.
pub const COOKIE_ACCEPT_LABELS: &[&str] = &["Přijmout", "Consent", "Accept"];

pub struct ElementQuery;

impl ElementQuery {
    /// Clicks the first visible button whose text contains one of `labels`.
    ///
    /// Returns the label that matched, or `None` when the page has no banner.
    pub async fn click_button_with_text(page: &PageControl<'_>, labels: &[&str]) -> Result<Option<String>> {
        let script = click_button_script(labels)?;
        let value = page.evaluate(&script).await?;
        let clicked = value.as_str().map(str::to_string);
        match &clicked {
            Some(label) => info!(label = %label, "Clicked consent button"),
            None => debug!("No consent button found"),
        }
        Ok(clicked)
    }

    pub async fn accept_cookies(page: &PageControl<'_>) -> Result<Option<String>> {
        Self::click_button_with_text(page, COOKIE_ACCEPT_LABELS).await
    }
}

/// JS expression that clicks the first matching button and yields its label or `null`.
pub fn click_button_script(labels: &[&str]) -> Result<String> {
    let labels = serde_json::to_string(labels)?;
    Ok(format!(
        r#"(() => {{
  const labels = {labels};
  const buttons = Array.from(document.querySelectorAll('button'));
  for (const label of labels) {{
    for (const el of buttons) {{
      const text = (el.innerText || '').trim();
      if (text.includes(label) && el.getClientRects().length > 0) {{
        el.click();
        return label;
      }}
    }}
  }}
  return null;
}})()"#
    ))
}
