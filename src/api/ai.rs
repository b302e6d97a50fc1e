use actix_multipart::Multipart;
use actix_web::{
    get, post,
    web::{Data, Json, Query},
    HttpResponse, Responder,
};
use log::{log, Level};

use crate::{
    api::upload::read_upload,
    app::AppState,
    auth::{FirebaseAuth, User},
    schema::{
        api::{AddressResponse, DuplicateResponse, GeocodeParams, LocatedPhotoForm, PhotoForm},
        db::GeoPoint,
        detect::{DetectionResponse, IssueAnalysis},
    },
    urgency::{calculate_urgency, UrgencyInput, UrgencyResult},
    workflow::{check_duplicate as run_duplicate_check, resolve_address},
};

#[utoipa::path(
    post,
    path = "/api/detect",
    request_body(content = LocatedPhotoForm, content_type = "multipart/form-data", description = "`image`, optional `latitude`/`longitude`"),
    responses(
        (status = 200, description = "Detections for overlays and the primary issue", body = DetectionResponse),
        (status = 502, description = "AI detection failed")
    ),
    security(("firebase" = []))
)]
#[post("/detect", wrap = "FirebaseAuth::enabled()")]
pub async fn detect_issue(state: Data<AppState>, payload: Multipart, _user: User) -> impl Responder {
    log!(Level::Info, "POST /api/detect");

    let mut form = match read_upload(payload).await {
        Ok(form) => form,
        Err(res) => return res,
    };
    let location = match form.location() {
        Ok(location) => location,
        Err(res) => return res,
    };
    let image = match form.require_image() {
        Ok(image) => image,
        Err(res) => return res,
    };
    match state.services.detector.detect(&image, location).await {
        Ok(detection) => HttpResponse::Ok().json(detection),
        Err(e) => {
            log!(Level::Warn, "Detection failed: {e}");
            HttpResponse::BadGateway().body("AI detection failed")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body(content = PhotoForm, content_type = "multipart/form-data", description = "`image`"),
    responses(
        (status = 200, description = "Issue classification", body = IssueAnalysis),
        (status = 502, description = "AI analysis failed")
    ),
    security(("firebase" = []))
)]
#[post("/analyze", wrap = "FirebaseAuth::enabled()")]
pub async fn analyze_issue(state: Data<AppState>, payload: Multipart, user: User) -> impl Responder {
    log!(Level::Info, "POST /api/analyze");

    let mut form = match read_upload(payload).await {
        Ok(form) => form,
        Err(res) => return res,
    };
    let image = match form.require_image() {
        Ok(image) => image,
        Err(res) => return res,
    };
    match state.services.analyzer.analyze(&image, &user.token).await {
        Ok(analysis) => HttpResponse::Ok().json(analysis),
        Err(e) => {
            log!(Level::Warn, "Analysis failed: {e}");
            HttpResponse::BadGateway().body("AI analysis failed")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/urgency",
    request_body = UrgencyInput,
    responses((status = 200, description = "Urgency score, or the fixed fallback", body = UrgencyResult)),
    security(("firebase" = []))
)]
#[post("/urgency", wrap = "FirebaseAuth::enabled()")]
pub async fn score_urgency(
    state: Data<AppState>,
    body: Json<UrgencyInput>,
    _user: User,
) -> impl Responder {
    log!(Level::Info, "POST /api/urgency");
    if body.issue_type.trim().is_empty() {
        return HttpResponse::BadRequest().body("issueType is required");
    }
    HttpResponse::Ok().json(calculate_urgency(state.services.text_model.as_ref(), &body).await)
}

#[utoipa::path(
    post,
    path = "/api/duplicates",
    request_body(content = LocatedPhotoForm, content_type = "multipart/form-data", description = "`image`, `latitude`, `longitude`"),
    responses(
        (status = 200, description = "Existing report, if any, and the vote count to use", body = DuplicateResponse),
        (status = 502, description = "Duplicate check failed")
    ),
    security(("firebase" = []))
)]
#[post("/duplicates", wrap = "FirebaseAuth::enabled()")]
pub async fn check_duplicate(
    state: Data<AppState>,
    payload: Multipart,
    _user: User,
) -> impl Responder {
    log!(Level::Info, "POST /api/duplicates");

    let mut form = match read_upload(payload).await {
        Ok(form) => form,
        Err(res) => return res,
    };
    let location: GeoPoint = match form.location() {
        Ok(Some(location)) => location,
        Ok(None) => return HttpResponse::BadRequest().body("A location is required"),
        Err(res) => return res,
    };
    let image = match form.require_image() {
        Ok(image) => image,
        Err(res) => return res,
    };
    match run_duplicate_check(state.services.detector.as_ref(), &image, location).await {
        Ok(check) => HttpResponse::Ok().json(DuplicateResponse {
            duplicate: check.duplicate,
            votes: check.votes,
        }),
        Err(e) => {
            log!(Level::Warn, "Duplicate check failed: {e}");
            HttpResponse::BadGateway().body("Duplicate check failed")
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/geocode",
    params(GeocodeParams),
    responses((status = 200, description = "Formatted address, if one was found", body = AddressResponse)),
    security(("firebase" = []))
)]
#[get("/geocode", wrap = "FirebaseAuth::enabled()")]
pub async fn reverse_geocode(
    state: Data<AppState>,
    params: Query<GeocodeParams>,
    _user: User,
) -> impl Responder {
    if !(params.latitude.abs() <= 90.0 && params.longitude.abs() <= 180.0) {
        return HttpResponse::BadRequest().body("Invalid coordinates");
    }
    let address = resolve_address(
        &state.services,
        GeoPoint {
            latitude: params.latitude,
            longitude: params.longitude,
        },
    )
    .await;
    HttpResponse::Ok().json(AddressResponse { address })
}
