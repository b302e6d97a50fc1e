use actix_multipart::Multipart;
use actix_web::{
    get, post, put,
    web::{Data, Json, Path, Query},
    HttpResponse, Responder,
};
use log::{log, Level};

use crate::{
    api::{db::log_store, upload::read_upload},
    app::AppState,
    auth::{FirebaseAuth, User},
    feed::ChangeKind,
    schema::{
        api::{
            FetchParams, ReportForm, ReportView, StatsResponse, StatusUpdate, SubmissionResponse,
            VersionResponse,
        },
        db::{IssueStatus, Role},
    },
    store::ReportFilter,
    workflow::{self, Submission, WorkflowError},
};

/// Citizens see their own reports, administrators see everything.
pub(crate) async fn viewer_filter(
    state: &AppState,
    user: &User,
) -> Result<(ReportFilter, Role), HttpResponse> {
    let role = match log_store(state.store.get_profile(&user.uid).await)? {
        Some(profile) => profile.role,
        None => Role::Citizen,
    };
    let filter = match role {
        Role::Admin => ReportFilter::default(),
        Role::Citizen => {
            ReportFilter::for_reporter(user.email.clone().unwrap_or_else(|| "unknown".into()))
        }
    };
    Ok((filter, role))
}

#[utoipa::path(
    post,
    path = "/api/reports",
    request_body(content = ReportForm, content_type = "multipart/form-data", description = "`image`, optional `description`, `latitude`, `longitude`, optional `address`"),
    responses(
        (status = 200, description = "Report stored", body = SubmissionResponse),
        (status = 400, description = "Please complete all steps"),
        (status = 403, description = "Administrators cannot report issues"),
        (status = 502, description = "AI detection failed")
    ),
    security(("firebase" = []))
)]
#[post("/reports", wrap = "FirebaseAuth::enabled()")]
pub async fn submit_report(state: Data<AppState>, payload: Multipart, user: User) -> impl Responder {
    log!(Level::Info, "POST /api/reports");

    match log_store(state.store.get_profile(&user.uid).await) {
        Ok(Some(profile)) if profile.role == Role::Admin => {
            return HttpResponse::Forbidden()
                .body("Administrators cannot report issues. Only citizens can report.");
        }
        Ok(_) => {}
        Err(res) => return res,
    }

    let mut form = match read_upload(payload).await {
        Ok(form) => form,
        Err(res) => return res,
    };
    let location = match form.location() {
        Ok(Some(location)) => location,
        Ok(None) => return HttpResponse::BadRequest().body("Please complete all steps"),
        Err(res) => return res,
    };
    if form.image.is_none() {
        return HttpResponse::BadRequest().body("Please complete all steps");
    }
    let image = match form.require_image() {
        Ok(image) => image,
        Err(res) => return res,
    };

    let submission = Submission {
        image,
        description: form.text("description").map(str::to_string),
        location,
        address: form.text("address").map(str::to_string),
        reporter_email: user.email.clone(),
    };

    match workflow::submit_report(state.store.as_ref(), &state.services, &state.feed, submission)
        .await
    {
        Ok(submitted) => HttpResponse::Ok().json(SubmissionResponse {
            report: submitted.report.into(),
            detections: submitted.detections,
            duplicate: submitted.duplicate,
        }),
        Err(err @ WorkflowError::Detection(_)) => {
            log!(Level::Warn, "Submission halted: {err:#}");
            HttpResponse::BadGateway().body(err.to_string())
        }
        Err(err @ WorkflowError::Store(_)) => {
            log!(Level::Error, "Submission could not be stored: {err:#}");
            HttpResponse::InternalServerError().body(err.to_string())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/reports",
    params(FetchParams),
    responses((status = 200, description = "Reports visible to the caller, newest first", body = [ReportView])),
    security(("firebase" = []))
)]
#[get("/reports", wrap = "FirebaseAuth::enabled()")]
pub async fn get_reports(
    state: Data<AppState>,
    params: Query<FetchParams>,
    user: User,
) -> impl Responder {
    let (mut filter, _) = match viewer_filter(&state, &user).await {
        Ok(filter) => filter,
        Err(res) => return res,
    };
    filter.status = params.status;
    filter.search = params.q.clone();
    filter.limit = params.limit;

    match log_store(state.store.list_reports(&filter).await) {
        Ok(reports) => HttpResponse::Ok().json(
            reports
                .into_iter()
                .map(ReportView::from)
                .collect::<Vec<_>>(),
        ),
        Err(res) => res,
    }
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(("id" = i32, Path, description = "Report id")),
    responses(
        (status = 200, description = "The report", body = ReportView),
        (status = 404, description = "Report could not be found")
    ),
    security(("firebase" = []))
)]
#[get("/reports/{id}", wrap = "FirebaseAuth::enabled()")]
pub async fn get_report(state: Data<AppState>, path: Path<(String,)>, user: User) -> impl Responder {
    let (id,) = path.into_inner();
    let id: i32 = match id.parse() {
        Ok(id) => id,
        Err(_e) => {
            log!(Level::Warn, "Invalid id");
            return HttpResponse::BadRequest().body("Invalid id");
        }
    };
    let (filter, _) = match viewer_filter(&state, &user).await {
        Ok(filter) => filter,
        Err(res) => return res,
    };

    match log_store(state.store.get_report(id).await) {
        Ok(Some(report)) if filter.matches(&report) => {
            HttpResponse::Ok().json(ReportView::from(report))
        }
        Ok(_) => HttpResponse::NotFound().body("Report could not be found"),
        Err(res) => res,
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/reports/{id}/status",
    params(("id" = i32, Path, description = "Report id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = ReportView),
        (status = 400, description = "Not one of open, in_progress, resolved"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Report could not be found")
    ),
    security(("firebase" = []))
)]
#[put("/admin/reports/{id}/status", wrap = "FirebaseAuth::admin_only()")]
pub async fn update_report_status(
    state: Data<AppState>,
    path: Path<(String,)>,
    body: Json<StatusUpdate>,
    user: User,
) -> impl Responder {
    let (id,) = path.into_inner();
    log!(Level::Info, "PUT /api/admin/reports/{id}/status by {}", user.uid);
    let id: i32 = match id.parse() {
        Ok(id) => id,
        Err(_e) => return HttpResponse::BadRequest().body("Invalid id"),
    };
    let status: IssueStatus = match body.status.parse() {
        Ok(status) => status,
        Err(e) => return HttpResponse::BadRequest().body(e),
    };

    match log_store(state.store.update_status(id, status).await) {
        Ok(report) => {
            state.feed.publish(ChangeKind::Updated, report.clone());
            HttpResponse::Ok().json(ReportView::from(report))
        }
        Err(res) => res,
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = StatsResponse)),
    security(("firebase" = []))
)]
#[get("/admin/stats", wrap = "FirebaseAuth::admin_only()")]
pub async fn get_admin_stats(state: Data<AppState>) -> impl Responder {
    match log_store(state.store.list_reports(&ReportFilter::default()).await) {
        Ok(reports) => HttpResponse::Ok().json(StatsResponse::tally(&reports)),
        Err(res) => res,
    }
}

#[utoipa::path(
    get,
    path = "/api/version",
    responses((status = 200, description = "Build information", body = VersionResponse))
)]
#[get("/version")]
pub async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(VersionResponse {
        build_date: env!("VERGEN_BUILD_TIMESTAMP").to_string(),
        date: env!("VERGEN_GIT_COMMIT_TIMESTAMP").to_string(),
        revision: env!("VERGEN_GIT_SHA").to_string(),
    })
}
