use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One bounding box reported by the detection service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Detection {
    #[serde(default, alias = "class", alias = "name", deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in image pixels.
    #[serde(default, alias = "box", deserialize_with = "null_as_default")]
    pub bbox: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AiSummary {
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub why_it_matters: Option<String>,
    #[serde(default)]
    pub severity_level: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateInfo {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub id: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub report_count: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetectionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub primary_issue: Option<String>,
    #[serde(default)]
    pub ai: Option<AiSummary>,
    #[serde(default)]
    pub duplicate: Option<DuplicateInfo>,
}

impl DetectionResponse {
    pub fn issue_type(&self) -> String {
        self.primary_issue
            .as_deref()
            .map(str::trim)
            .filter(|issue| !issue.is_empty())
            .unwrap_or("Civic Issue")
            .to_string()
    }

    pub fn description(&self) -> Option<&str> {
        self.ai
            .as_ref()
            .and_then(|ai| ai.description_en.as_deref())
            .filter(|d| !d.trim().is_empty())
    }

    pub fn why_it_matters(&self) -> Option<&str> {
        self.ai.as_ref().and_then(|ai| ai.why_it_matters.as_deref())
    }

    pub fn severity_level(&self) -> &str {
        self.ai
            .as_ref()
            .and_then(|ai| ai.severity_level.as_deref())
            .unwrap_or("Low")
    }
}

pub const ISSUE_CATEGORIES: [&str; 9] = [
    "Pothole",
    "Garbage Accumulation",
    "Broken Streetlight",
    "Water Logging",
    "Damaged Road",
    "Open Drain",
    "Fallen Tree",
    "Construction Debris",
    "Other",
];

/// Classification returned by the authenticated analysis service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueAnalysis {
    pub issue_type: String,
    pub severity_score: f64,
    pub analysis: String,
    pub confidence: f64,
}

impl IssueAnalysis {
    /// Snap the category onto the known list and clamp numeric fields.
    pub fn normalized(mut self) -> Self {
        self.issue_type = ISSUE_CATEGORIES
            .iter()
            .find(|c| c.eq_ignore_ascii_case(self.issue_type.trim()))
            .unwrap_or(&"Other")
            .to_string();
        self.severity_score = self.severity_score.clamp(1.0, 10.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}
