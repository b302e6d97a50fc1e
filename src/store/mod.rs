//! Report and profile persistence.
//!
//! Both backends normalize a report on insert and list newest first, so the
//! rest of the service never needs to know which one it is talking to.

use async_trait::async_trait;

use crate::schema::db::{IssueStatus, NewProfile, NewReport, Profile, Report};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("report {0} does not exist")]
    ReportNotFound(i32),
    #[error("a profile already exists for {0}")]
    ProfileExists(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Which reports a listing should return.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportFilter {
    pub reporter_email: Option<String>,
    pub status: Option<IssueStatus>,
    /// Case-insensitive substring over issue type and street address.
    /// Coordinates are not searched.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

impl ReportFilter {
    pub fn for_reporter(email: impl Into<String>) -> Self {
        ReportFilter {
            reporter_email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Lowercased `LIKE` pattern for the search term, with `\`, `%` and `_`
    /// escaped so they match literally.
    pub fn search_pattern(&self) -> Option<String> {
        let q = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty())?;
        let mut pattern = String::with_capacity(q.len() + 2);
        pattern.push('%');
        for c in q.to_lowercase().chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Some(pattern)
    }

    pub fn matches(&self, report: &Report) -> bool {
        if let Some(email) = &self.reporter_email {
            if &report.reporter_email != email {
                return false;
            }
        }
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                report.issue_type.to_lowercase().contains(&q)
                    || report
                        .address
                        .as_deref()
                        .is_some_and(|address| address.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError>;

    async fn get_report(&self, id: i32) -> Result<Option<Report>, StoreError>;

    /// Newest first; ties broken by descending id.
    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError>;

    async fn update_status(&self, id: i32, status: IssueStatus) -> Result<Report, StoreError>;

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;
}
