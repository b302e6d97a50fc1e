use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Role::Citizen),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Lifecycle of a report. Only administrators move a report between these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Open,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }

    /// Label shown to citizens tracking their reports.
    pub fn track_label(&self) -> &'static str {
        match self {
            IssueStatus::Open => "Pending",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Resolved => "Resolved",
        }
    }

    /// Label shown on the administrator dashboard.
    pub fn admin_label(&self) -> &'static str {
        match self {
            IssueStatus::Open => "Issue Raised",
            IssueStatus::InProgress => "Authorities Contacted",
            IssueStatus::Resolved => "Issue Resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status `{s}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "Low",
            UrgencyLevel::Medium => "Medium",
            UrgencyLevel::High => "High",
            UrgencyLevel::Critical => "Critical",
        }
    }

    /// Band a 1-10 score the same way the scoring prompt does.
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=3 => UrgencyLevel::Low,
            4..=5 => UrgencyLevel::Medium,
            6..=7 => UrgencyLevel::High,
            _ => UrgencyLevel::Critical,
        }
    }
}

impl FromStr for UrgencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(UrgencyLevel::Low),
            "medium" => Ok(UrgencyLevel::Medium),
            "high" => Ok(UrgencyLevel::High),
            "critical" => Ok(UrgencyLevel::Critical),
            other => Err(format!("unknown urgency level `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i32,
    pub issue_type: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub urgency: UrgencyLevel,
    pub urgency_score: i32,
    pub ai_analysis: String,
    pub status: IssueStatus,
    pub votes: i32,
    pub reporter_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// Address if one was recorded, else the raw coordinates.
    pub fn display_location(&self) -> String {
        match self.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ if self.latitude != 0.0 && self.longitude != 0.0 => {
                format!("{}, {}", self.latitude, self.longitude)
            }
            _ => "Location not available".to_string(),
        }
    }
}

/// Report fields as gathered by the submission workflow, before normalization.
#[derive(Clone, Debug, Default)]
pub struct NewReport {
    pub issue_type: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub urgency: Option<UrgencyLevel>,
    pub urgency_score: Option<f64>,
    pub ai_analysis: Option<String>,
    pub votes: Option<i32>,
    pub reporter_email: Option<String>,
}

/// A report ready to be written: every field has a store-safe value.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedReport {
    pub issue_type: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub urgency: UrgencyLevel,
    pub urgency_score: i32,
    pub ai_analysis: String,
    pub status: IssueStatus,
    pub votes: i32,
    pub reporter_email: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

impl NewReport {
    pub fn normalize(self) -> NormalizedReport {
        let urgency_score = match self.urgency_score {
            Some(score) if score.is_finite() => score.round() as i32,
            _ => 1,
        };
        NormalizedReport {
            issue_type: non_blank(self.issue_type).unwrap_or_else(|| "Civic Issue".to_string()),
            description: non_blank(self.description)
                .unwrap_or_else(|| "No description provided".to_string()),
            latitude: finite_or(self.latitude, 0.0),
            longitude: finite_or(self.longitude, 0.0),
            address: non_blank(self.address),
            urgency: self
                .urgency
                .unwrap_or_else(|| UrgencyLevel::from_score(urgency_score)),
            urgency_score,
            ai_analysis: self.ai_analysis.unwrap_or_default(),
            status: IssueStatus::Open,
            votes: self.votes.filter(|v| *v > 0).unwrap_or(1),
            reporter_email: non_blank(self.reporter_email).unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

pub struct ID {
    pub id: i32, // SERIAL value
}

#[derive(Debug, FromRow)]
pub struct ReportRow {
    pub id: i32,
    pub issue_type: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub urgency: String,
    pub urgency_score: i32,
    pub ai_analysis: String,
    pub status: String,
    pub votes: i32,
    pub reporter_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = String;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: row.id,
            issue_type: row.issue_type,
            description: row.description,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            urgency: row.urgency.parse()?,
            urgency_score: row.urgency_score,
            ai_analysis: row.ai_analysis,
            status: row.status.parse()?,
            votes: row.votes,
            reporter_email: row.reporter_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = String;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}
