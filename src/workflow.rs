//! The citizen "report an issue" flow: detect, locate, score, check for
//! duplicates, then persist. Nothing is written until every earlier step has
//! produced its result.

use log::{log, Level};

use crate::{
    clients::{Detector, ImageUpload, Services},
    feed::{ChangeFeed, ChangeKind},
    schema::{
        db::{GeoPoint, NewReport, Report},
        detect::{Detection, DuplicateInfo},
    },
    store::{ReportStore, StoreError},
    urgency::{calculate_urgency, UrgencyInput},
};

#[derive(Debug)]
pub struct Submission {
    pub image: ImageUpload,
    pub description: Option<String>,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub reporter_email: Option<String>,
}

#[derive(Debug)]
pub struct SubmittedReport {
    pub report: Report,
    pub detections: Vec<Detection>,
    pub duplicate: Option<DuplicateInfo>,
}

#[derive(Debug, PartialEq)]
pub struct DuplicateCheck {
    pub duplicate: Option<DuplicateInfo>,
    pub votes: i32,
}

impl DuplicateCheck {
    fn fresh() -> Self {
        DuplicateCheck {
            duplicate: None,
            votes: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("AI detection failed")]
    Detection(#[source] anyhow::Error),
    #[error("Failed to submit issue")]
    Store(#[from] StoreError),
}

/// Ask the detector whether this photo at this spot is already reported.
pub async fn check_duplicate(
    detector: &dyn Detector,
    image: &ImageUpload,
    location: GeoPoint,
) -> anyhow::Result<DuplicateCheck> {
    let response = detector.detect(image, Some(location)).await?;
    Ok(match response.duplicate {
        Some(duplicate) => DuplicateCheck {
            votes: duplicate.report_count.max(1),
            duplicate: Some(duplicate),
        },
        None => DuplicateCheck::fresh(),
    })
}

/// Best-effort address for a point; `None` when no geocoder is configured or
/// the lookup fails.
pub async fn resolve_address(services: &Services, location: GeoPoint) -> Option<String> {
    let geocoder = services.geocoder.as_ref()?;
    match geocoder.reverse(location).await {
        Ok(address) => address,
        Err(e) => {
            log!(Level::Warn, "Reverse geocoding failed: {e}");
            None
        }
    }
}

pub async fn submit_report(
    store: &dyn ReportStore,
    services: &Services,
    feed: &ChangeFeed,
    submission: Submission,
) -> Result<SubmittedReport, WorkflowError> {
    let Submission {
        image,
        description,
        location,
        address,
        reporter_email,
    } = submission;

    let detection = services
        .detector
        .detect(&image, None)
        .await
        .map_err(WorkflowError::Detection)?;
    let issue_type = detection.issue_type();
    let ai_description = detection.description().unwrap_or_default().to_string();
    log!(
        Level::Debug,
        "detected {issue_type} with {} boxes",
        detection.detections.len()
    );

    let address = match address {
        Some(address) => Some(address),
        None => resolve_address(services, location).await,
    };

    let urgency = calculate_urgency(
        services.text_model.as_ref(),
        &UrgencyInput {
            issue_type: issue_type.clone(),
            location: address
                .clone()
                .unwrap_or_else(|| format!("{}, {}", location.latitude, location.longitude)),
            description: description.clone().unwrap_or_else(|| ai_description.clone()),
            image_analysis: ai_description.clone(),
        },
    )
    .await;

    let duplicate = match check_duplicate(services.detector.as_ref(), &image, location).await {
        Ok(check) => check,
        Err(e) => {
            log!(Level::Warn, "Duplicate check failed: {e}");
            DuplicateCheck::fresh()
        }
    };

    let report = store
        .insert_report(NewReport {
            issue_type: Some(issue_type),
            description: description.or(Some(ai_description)),
            latitude: Some(location.latitude),
            longitude: Some(location.longitude),
            address,
            urgency: Some(urgency.level),
            urgency_score: Some(f64::from(urgency.score)),
            ai_analysis: detection.why_it_matters().map(str::to_string),
            votes: Some(duplicate.votes),
            reporter_email,
        })
        .await?;
    log!(
        Level::Info,
        "report {} filed: {} ({} / {})",
        report.id,
        report.issue_type,
        report.urgency.as_str(),
        report.urgency_score
    );
    feed.publish(ChangeKind::Created, report.clone());

    Ok(SubmittedReport {
        report,
        detections: detection.detections,
        duplicate: duplicate.duplicate,
    })
}
