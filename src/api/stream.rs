use std::time::Duration;

use actix_web::{
    get,
    http::header,
    web::{Bytes, Data, Query},
    HttpResponse, Responder,
};
use async_stream::stream;
use log::{log, Level};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    api::endpoints::viewer_filter,
    app::AppState,
    auth::{FirebaseAuth, User},
    feed::sse_frame,
    schema::api::{FetchParams, ReportView},
};

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Stream the caller's view of the report list as Server-Sent Events.
///
/// The first `snapshot` event carries the whole filtered list; each later
/// `change` event carries one created or updated report. A subscriber that
/// falls behind the feed is sent a fresh snapshot instead of the missed
/// changes.
#[utoipa::path(
    get,
    path = "/api/reports/stream",
    params(FetchParams),
    responses((status = 200, description = "text/event-stream of snapshot and change events")),
    security(("firebase" = []))
)]
#[get("/reports/stream", wrap = "FirebaseAuth::enabled()")]
pub async fn stream_reports(
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

    // Subscribe before the first snapshot so no change slips between the two.
    let mut rx = state.feed.subscribe();
    let uid = user.uid.clone();
    let stream = stream! {
        yield Ok::<Bytes, actix_web::Error>(Bytes::from_static(b"retry: 2000\n\n"));
        let mut send_snapshot = true;
        loop {
            if send_snapshot {
                send_snapshot = false;
                match state.store.list_reports(&filter).await {
                    Ok(reports) => {
                        let views: Vec<ReportView> = reports.into_iter().map(ReportView::from).collect();
                        yield Ok(Bytes::from(sse_frame("snapshot", None, &views)));
                    }
                    Err(e) => {
                        log!(Level::Warn, "Snapshot for {uid} failed: {e}");
                        yield Ok(Bytes::from(format!("event: error\ndata: {}\n\n", e)));
                        break;
                    }
                }
            }

            match actix_web::rt::time::timeout(KEEP_ALIVE, rx.recv()).await {
                Ok(Ok(event)) => {
                    if filter.matches(&event.report) {
                        let id = event.report.id;
                        let payload = serde_json::json!({
                            "kind": event.kind,
                            "report": ReportView::from(event.report),
                        });
                        yield Ok(Bytes::from(sse_frame("change", Some(id), &payload)));
                    }
                }
                Ok(Err(RecvError::Lagged(missed))) => {
                    log!(Level::Debug, "Subscriber {uid} lagged by {missed} events");
                    send_snapshot = true;
                }
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {
                    yield Ok(Bytes::from_static(b": keep-alive\n\n"));
                }
            }
        }
    };

    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .streaming(stream)
}
