//! Summary stage: one Czech Markdown digest of today's menus.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use restabot_core::{
    DailyMenu, DailySummary, GenerateRequest, GenerativeModel, OcrTaskOutput, Part, Restaurant,
    RestabotError, SummaryTaskOutput,
};
use restabot_logging::redact_sensitive_data;

pub const NO_MENUS_TEXT: &str = "No menus available for analysis.";

/// One restaurant's menus as shown to the model.
#[derive(Debug, Serialize)]
struct MenuDocument<'a> {
    name: &'a str,
    menus: &'a [DailyMenu],
}

pub fn daily_summary_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "reasoning": { "type": "STRING" },
            "text": { "type": "STRING" },
        },
        "required": ["reasoning", "text"],
        "propertyOrdering": ["reasoning", "text"],
    })
}

/// The summary prompt for `date` with `menus` already rendered as YAML.
pub fn summary_prompt(date: NaiveDate, menus: &str) -> String {
    let day_of_week = date.format("%A");
    format!(
        "Please analyze the following restaurant menus and create a listing.\n\
- Select only menus for {date} ({day_of_week}). If the menu applies to the whole current week, include it. \
If the menu has no date info, include it.\n\
- Create a listing written in Czech language\n\
- Do not omit any dishes (ignore drinks), but correct spelling and duplicates\n\
- Arrange the information in common format: \
<dish name and description, capitalized first letter, but not all caps> – <price> Kč. \
Omit the price if it is unknown.\n\
- Prefix vegetarian dishes with 🌿 emoji.\n\
- Prefix non-vegetarian dishes with a suitable emoji for given dish. Be creative!\n\
- Use Markdown format: headings, bullet points, etc.\n\
Use `reasoning` field for planning and step-by-step reasoning. \
The input is in YAML format and was automatically extracted by OCR; it can contain errors.\n\n\
Restaurant menus:\n\n\
{menus}"
    )
}

/// Render each restaurant's menus as its own YAML document, blank-line separated.
fn render_menus(restaurants: &[Restaurant], ocr: &OcrTaskOutput) -> Result<Option<String>> {
    let names: HashMap<&str, &str> = restaurants
        .iter()
        .map(|r| (r.id.as_str(), r.name.as_str()))
        .collect();

    let mut documents = Vec::new();
    for result in &ocr.results {
        let Some(name) = names.get(result.id.as_str()) else {
            warn!(id = %result.id, "OCR result for unknown restaurant, skipping");
            continue;
        };
        let doc = MenuDocument {
            name: *name,
            menus: &result.data.daily_menus,
        };
        documents.push(serde_yaml::to_string(&doc).context("Failed to render menus as YAML")?);
    }

    if documents.is_empty() {
        return Ok(None);
    }
    Ok(Some(documents.join("\n\n")))
}

async fn generate_summary(model: &dyn GenerativeModel, prompt: String) -> Result<DailySummary> {
    let request = GenerateRequest::new(vec![Part::text(prompt)]).with_schema(daily_summary_schema());
    let response = model.generate(&request).await?;
    let summary: DailySummary = serde_json::from_str(&response.text)
        .map_err(|e| RestabotError::UnexpectedResponse(format!("summary is not valid JSON: {e}")))?;
    info!(tokens = response.tokens_used, "Summary generated");
    Ok(summary)
}

/// Summarize the menus of `ocr.date`.
///
/// Never fails: a model error is reported in the summary text itself.
pub async fn summary_task(
    model: &dyn GenerativeModel,
    restaurants: &[Restaurant],
    ocr: &OcrTaskOutput,
) -> SummaryTaskOutput {
    let summary = match render_menus(restaurants, ocr) {
        Ok(None) => {
            info!("No menus to summarize");
            DailySummary::text_only(NO_MENUS_TEXT)
        }
        Ok(Some(menus)) => match generate_summary(model, summary_prompt(ocr.date, &menus)).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %redact_sensitive_data(&format!("{e:#}")), "Failed to generate summary");
                DailySummary::text_only(format!("Error generating summary: {e}"))
            }
        },
        Err(e) => {
            error!(error = %redact_sensitive_data(&format!("{e:#}")), "Failed to prepare menus");
            DailySummary::text_only(format!("Error generating summary: {e}"))
        }
    };
    debug!(reasoning = %summary.reasoning, "Summary reasoning");

    SummaryTaskOutput {
        summary,
        date: ocr.date,
    }
}

/// Read an OCR artifact written by the OCR stage.
pub async fn read_ocr_output(path: &Path) -> Result<OcrTaskOutput> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read OCR output: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid OCR output: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockModel;
    use restabot_core::{Dish, ErrorResult, OcrResult, ParsedMenu};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    fn restaurants() -> Vec<Restaurant> {
        vec![
            Restaurant::new("kocour", "U Kocoura", "https://kocour.example"),
            Restaurant::new("lipa", "Pod Lipou", "https://lipa.example"),
        ]
    }

    fn menu(dish: &str, price: Option<&str>) -> ParsedMenu {
        ParsedMenu {
            daily_menus: vec![DailyMenu {
                date: Some("2025-06-04".into()),
                day_of_week: Some("středa".into()),
                whole_week: false,
                dishes: vec![Dish {
                    name: dish.into(),
                    description: None,
                    price: price.map(Into::into),
                    category: None,
                }],
            }],
        }
    }

    fn ocr(results: Vec<OcrResult>) -> OcrTaskOutput {
        OcrTaskOutput {
            results,
            errors: vec![ErrorResult::new("broken", "no image found for broken")],
            date: date(),
        }
    }

    #[test]
    fn prompt_names_date_and_weekday() {
        let prompt = summary_prompt(date(), "name: X\n");
        assert!(prompt.contains("Select only menus for 2025-06-04 (Wednesday)."));
        assert!(prompt.contains("– <price> Kč"));
        assert!(prompt.ends_with("Restaurant menus:\n\nname: X\n"));
    }

    #[test]
    fn menus_render_as_yaml_documents() {
        let output = ocr(vec![
            OcrResult { id: "kocour".into(), data: menu("Svíčková", Some("159")) },
            OcrResult { id: "lipa".into(), data: menu("Smažený sýr", None) },
        ]);
        let rendered = render_menus(&restaurants(), &output).unwrap().unwrap();
        let docs: Vec<&str> = rendered.split("\n\n").collect();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].starts_with("name: U Kocoura\nmenus:\n"));
        assert!(docs[0].contains("Svíčková"));
        assert!(docs[1].trim_start().starts_with("name: Pod Lipou"));
        assert!(!docs[1].contains("price"));
    }

    #[tokio::test]
    async fn no_menus_skips_the_model() {
        let model = MockModel::with_response("unused");
        let output = summary_task(&model, &restaurants(), &ocr(vec![])).await;
        assert_eq!(output.summary.text, NO_MENUS_TEXT);
        assert_eq!(output.date, date());
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_skipped() {
        let model = MockModel::with_response("unused");
        let output = ocr(vec![OcrResult { id: "gone".into(), data: menu("Řízek", None) }]);
        let summary = summary_task(&model, &restaurants(), &output).await;
        assert_eq!(summary.summary.text, NO_MENUS_TEXT);
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn returns_model_summary() {
        let model = MockModel::with_response(
            r###"{"reasoning":"only Wednesday","text":"## U Kocoura\n- 🐄 Svíčková – 159 Kč"}"###,
        );
        let output = ocr(vec![OcrResult { id: "kocour".into(), data: menu("Svíčková", Some("159")) }]);
        let summary = summary_task(&model, &restaurants(), &output).await;

        assert_eq!(summary.summary.reasoning, "only Wednesday");
        assert!(summary.summary.text.contains("Svíčková – 159 Kč"));

        let request = &model.requests()[0];
        assert!(request.prompt_text().contains("name: U Kocoura"));
        assert_eq!(request.response_schema.as_ref().unwrap()["required"][1], "text");
    }

    #[tokio::test]
    async fn model_failure_becomes_summary_text() {
        let model = MockModel::new(|_| anyhow::bail!("quota exceeded"));
        let output = ocr(vec![OcrResult { id: "kocour".into(), data: menu("Svíčková", None) }]);
        let summary = summary_task(&model, &restaurants(), &output).await;
        assert_eq!(summary.summary.text, "Error generating summary: quota exceeded");
    }

    #[tokio::test]
    async fn reads_ocr_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.json");
        let output = ocr(vec![OcrResult { id: "kocour".into(), data: menu("Svíčková", None) }]);
        std::fs::write(&path, serde_json::to_string_pretty(&output).unwrap()).unwrap();

        assert_eq!(read_ocr_output(&path).await.unwrap(), output);
        assert!(read_ocr_output(&dir.path().join("missing.json")).await.is_err());
    }
}
