//! Urgency scoring through the hosted text model.
//!
//! Scoring never fails the report workflow: any network or parse problem
//! yields [`UrgencyResult::fallback`].

use anyhow::{anyhow, Result};
use log::{log, Level};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{clients::TextModel, schema::db::UrgencyLevel};

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyInput {
    pub issue_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_analysis: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct UrgencyResult {
    pub score: i32,
    pub level: UrgencyLevel,
    pub analysis: String,
}

impl UrgencyResult {
    pub fn fallback() -> Self {
        UrgencyResult {
            score: 5,
            level: UrgencyLevel::Medium,
            analysis: "Fallback urgency due to AI error.".to_string(),
        }
    }
}

pub fn build_prompt(input: &UrgencyInput) -> String {
    let location = if input.location.trim().is_empty() {
        "Unknown"
    } else {
        input.location.trim()
    };
    let mut prompt = format!(
        "
You are an AI Municipal Officer in India.

Assess urgency for this civic issue.

Issue: {}
Location: {}
Image Analysis: {}
",
        input.issue_type, location, input.image_analysis
    );
    if !input.description.trim().is_empty() && input.description != input.image_analysis {
        prompt.push_str(&format!("Citizen Description: {}\n", input.description.trim()));
    }
    prompt.push_str(
        r#"
Rules:
- Life threatening → score 8–10 → Critical
- Major disruption → score 6–7 → High
- Moderate issue → score 4–5 → Medium
- Minor issue → score 1–3 → Low

Respond ONLY in valid JSON:
{
  "score": number,
  "level": "Low" | "Medium" | "High" | "Critical",
  "analysis": "short explanation"
}
"#,
    );
    prompt
}

#[derive(Deserialize)]
struct Reply {
    score: f64,
    level: String,
    #[serde(default)]
    analysis: Option<String>,
}

/// Strip a surrounding markdown code fence, if the model added one.
fn unfence(text: &str) -> &str {
    let text = text.trim();
    match text.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => text,
    }
}

pub fn parse_reply(text: &str) -> Result<UrgencyResult> {
    let reply: Reply = serde_json::from_str(unfence(text))?;
    if !reply.score.is_finite() {
        return Err(anyhow!("score is not a number"));
    }
    let level: UrgencyLevel = reply.level.parse().map_err(|e: String| anyhow!(e))?;
    Ok(UrgencyResult {
        score: (reply.score.round() as i32).clamp(1, 10),
        level,
        analysis: reply.analysis.unwrap_or_default(),
    })
}

pub async fn calculate_urgency(model: &dyn TextModel, input: &UrgencyInput) -> UrgencyResult {
    let prompt = build_prompt(input);
    match model.generate(&prompt).await.and_then(|text| parse_reply(&text)) {
        Ok(result) => {
            log!(
                Level::Debug,
                "urgency for {}: {} ({})",
                input.issue_type,
                result.score,
                result.level.as_str()
            );
            result
        }
        Err(err) => {
            log!(Level::Warn, "Urgency AI failed: {err}");
            UrgencyResult::fallback()
        }
    }
}
