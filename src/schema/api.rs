use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    navigation::Page,
    schema::{
        db::{IssueStatus, Profile, Report, UrgencyLevel},
        detect::{Detection, DuplicateInfo},
    },
};

#[derive(Deserialize, Debug, ToSchema)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub profile: Profile,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct FetchParams {
    pub status: Option<IssueStatus>,
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct NavigateParams {
    pub from: Option<Page>,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct GeocodeParams {
    pub latitude: f64,
    pub longitude: f64,
}

/// `multipart/form-data` body carrying only a photo.
#[derive(Debug, ToSchema)]
pub struct PhotoForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// A photo with an optional capture location.
#[derive(Debug, ToSchema)]
pub struct LocatedPhotoForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Fields of a citizen's report submission.
#[derive(Debug, ToSchema)]
pub struct ReportForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AddressResponse {
    pub address: Option<String>,
}

/// A report as rendered by the tracking and admin views.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub location: String,
    pub status_label: String,
    pub admin_status_label: String,
}

impl From<Report> for ReportView {
    fn from(report: Report) -> Self {
        ReportView {
            location: report.display_location(),
            status_label: report.status.track_label().to_string(),
            admin_status_label: report.status.admin_label().to_string(),
            report,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub report: ReportView,
    pub detections: Vec<Detection>,
    pub duplicate: Option<DuplicateInfo>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResponse {
    pub duplicate: Option<DuplicateInfo>,
    pub votes: i32,
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub critical_high: usize,
    pub duplicates: usize,
}

impl StatsResponse {
    pub fn tally(reports: &[Report]) -> Self {
        let mut stats = StatsResponse {
            total: reports.len(),
            ..Default::default()
        };
        for report in reports {
            match report.status {
                IssueStatus::Open => stats.pending += 1,
                IssueStatus::InProgress => stats.in_progress += 1,
                IssueStatus::Resolved => stats.resolved += 1,
            }
            if matches!(report.urgency, UrgencyLevel::Critical | UrgencyLevel::High) {
                stats.critical_high += 1;
            }
            if report.votes > 1 {
                stats.duplicates += 1;
            }
        }
        stats
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct VersionResponse {
    pub build_date: String,
    pub date: String,
    pub revision: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(status: IssueStatus, urgency: UrgencyLevel, votes: i32) -> Report {
        let now = Utc::now();
        Report {
            id: 1,
            issue_type: "Pothole".into(),
            description: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            address: None,
            urgency,
            urgency_score: 5,
            ai_analysis: String::new(),
            status,
            votes,
            reporter_email: "a@x.org".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tallies_dashboard_counters() {
        let stats = StatsResponse::tally(&[
            report(IssueStatus::Open, UrgencyLevel::Critical, 1),
            report(IssueStatus::Open, UrgencyLevel::Low, 3),
            report(IssueStatus::InProgress, UrgencyLevel::High, 1),
            report(IssueStatus::Resolved, UrgencyLevel::Medium, 2),
        ]);
        assert_eq!(
            stats,
            StatsResponse {
                total: 4,
                pending: 2,
                in_progress: 1,
                resolved: 1,
                critical_high: 2,
                duplicates: 2,
            }
        );
    }

    #[test]
    fn view_carries_labels_and_location() {
        let view = ReportView::from(report(IssueStatus::InProgress, UrgencyLevel::High, 1));
        assert_eq!(view.status_label, "In Progress");
        assert_eq!(view.admin_status_label, "Authorities Contacted");
        assert_eq!(view.location, "Location not available");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["issueType"], "Pothole");
    }
}
