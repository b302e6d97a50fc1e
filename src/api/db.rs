use actix_web::HttpResponse;
use log::{log, Level};

use crate::store::StoreError;

pub fn store_error_response(error: StoreError) -> HttpResponse {
    match error {
        StoreError::ReportNotFound(id) => {
            log!(Level::Debug, "Report {id} not found");
            HttpResponse::NotFound().body("Report could not be found")
        }
        StoreError::ProfileExists(uid) => {
            log!(Level::Debug, "Profile for {uid} already exists");
            HttpResponse::Conflict().body("Profile already exists")
        }
        StoreError::Corrupt(e) => {
            log!(Level::Error, "Corrupt record in store: {e}");
            HttpResponse::InternalServerError().body("Internal DB Error")
        }
        StoreError::Database(e) => {
            log!(Level::Warn, "DB Query failed: {e}");
            HttpResponse::InternalServerError().body("Internal DB Error")
        }
    }
}

pub fn log_store<T>(result: Result<T, StoreError>) -> Result<T, HttpResponse> {
    result.map_err(store_error_response)
}
