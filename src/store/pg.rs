use async_trait::async_trait;
use log::{log, Level};
use sqlx::{postgres::PgPoolOptions, query_as, Pool, Postgres};

use crate::{
    schema::db::{
        IssueStatus, NewProfile, NewReport, Profile, ProfileRow, Report, ReportRow,
    },
    store::{ReportFilter, ReportStore, StoreError},
};

const REPORT_COLUMNS: &str = "id, issue_type, description, latitude, longitude, address, urgency,
    urgency_score, ai_analysis, status, votes, reporter_email, created_at, updated_at";

pub struct PgStore {
    db: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new().connect(url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;
        log!(Level::Info, "Successfully connected to database");
        Ok(PgStore { db })
    }
}

fn to_report(row: ReportRow) -> Result<Report, StoreError> {
    Report::try_from(row).map_err(StoreError::Corrupt)
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let report = report.normalize();
        let row: ReportRow = query_as(&format!(
            "INSERT INTO reports (issue_type, description, latitude, longitude, address, urgency,
                urgency_score, ai_analysis, status, votes, reporter_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {REPORT_COLUMNS}"
        ))
        .bind(&report.issue_type)
        .bind(&report.description)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&report.address)
        .bind(report.urgency.as_str())
        .bind(report.urgency_score)
        .bind(&report.ai_analysis)
        .bind(report.status.as_str())
        .bind(report.votes)
        .bind(&report.reporter_email)
        .fetch_one(&self.db)
        .await?;
        log!(Level::Trace, "created report {}", row.id);
        to_report(row)
    }

    async fn get_report(&self, id: i32) -> Result<Option<Report>, StoreError> {
        let row: Option<ReportRow> =
            query_as(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        row.map(to_report).transpose()
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError> {
        let search = filter.search_pattern();
        let rows: Vec<ReportRow> = query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
            WHERE ($1::text IS NULL OR reporter_email = $1)
            AND ($2::text IS NULL OR status = $2)
            AND ($3::text IS NULL
                OR LOWER(issue_type) LIKE $3 ESCAPE '\\'
                OR LOWER(address) LIKE $3 ESCAPE '\\')
            ORDER BY created_at DESC, id DESC
            LIMIT $4"
        ))
        .bind(&filter.reporter_email)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(search)
        .bind(filter.limit.map(i64::from))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(to_report).collect()
    }

    async fn update_status(&self, id: i32, status: IssueStatus) -> Result<Report, StoreError> {
        let row: Option<ReportRow> = query_as(&format!(
            "UPDATE reports SET status = $2, updated_at = NOW() WHERE id = $1
            RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;
        match row {
            Some(row) => to_report(row),
            None => Err(StoreError::ReportNotFound(id)),
        }
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let row: Option<ProfileRow> = query_as(
            "INSERT INTO profiles (id, email, name, role) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, email, name, role, created_at",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(profile.role.as_str())
        .fetch_optional(&self.db)
        .await?;
        match row {
            Some(row) => Profile::try_from(row).map_err(StoreError::Corrupt),
            None => Err(StoreError::ProfileExists(profile.id)),
        }
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> =
            query_as("SELECT id, email, name, role, created_at FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        row.map(|row| Profile::try_from(row).map_err(StoreError::Corrupt))
            .transpose()
    }
}
