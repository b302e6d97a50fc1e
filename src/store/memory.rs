use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use chrono::Utc;
use log::{log, Level};

use crate::{
    schema::db::{IssueStatus, NewProfile, NewReport, Profile, Report},
    store::{ReportFilter, ReportStore, StoreError},
};

#[derive(Default)]
struct Tables {
    reports: Vec<Report>,
    profiles: HashMap<String, Profile>,
    next_id: i32,
}

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let report = report.normalize();
        let mut tables = self.write();
        tables.next_id += 1;
        let now = Utc::now();
        let stored = Report {
            id: tables.next_id,
            issue_type: report.issue_type,
            description: report.description,
            latitude: report.latitude,
            longitude: report.longitude,
            address: report.address,
            urgency: report.urgency,
            urgency_score: report.urgency_score,
            ai_analysis: report.ai_analysis,
            status: report.status,
            votes: report.votes,
            reporter_email: report.reporter_email,
            created_at: now,
            updated_at: now,
        };
        tables.reports.push(stored.clone());
        log!(Level::Trace, "created report {}", stored.id);
        Ok(stored)
    }

    async fn get_report(&self, id: i32) -> Result<Option<Report>, StoreError> {
        Ok(self.read().reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError> {
        let mut reports: Vec<Report> = self
            .read()
            .reports
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            reports.truncate(limit as usize);
        }
        Ok(reports)
    }

    async fn update_status(&self, id: i32, status: IssueStatus) -> Result<Report, StoreError> {
        let mut tables = self.write();
        let report = tables
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::ReportNotFound(id))?;
        report.status = status;
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut tables = self.write();
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::ProfileExists(profile.id));
        }
        let stored = Profile {
            id: profile.id.clone(),
            email: profile.email,
            name: profile.name,
            role: profile.role,
            created_at: Utc::now(),
        };
        tables.profiles.insert(profile.id, stored.clone());
        Ok(stored)
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.read().profiles.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::db::{Role, UrgencyLevel};

    fn new_report(email: &str, issue: &str) -> NewReport {
        NewReport {
            issue_type: Some(issue.into()),
            latitude: Some(12.97),
            longitude: Some(77.59),
            urgency: Some(UrgencyLevel::Medium),
            urgency_score: Some(5.0),
            reporter_email: Some(email.into()),
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn lists_newest_first_per_reporter() {
        let store = MemoryStore::new();
        store.insert_report(new_report("a@x.org", "Pothole")).await.unwrap();
        store.insert_report(new_report("b@x.org", "Open Drain")).await.unwrap();
        store.insert_report(new_report("a@x.org", "Fallen Tree")).await.unwrap();

        let mine = store
            .list_reports(&ReportFilter::for_reporter("a@x.org"))
            .await
            .unwrap();
        let issues: Vec<_> = mine.iter().map(|r| r.issue_type.as_str()).collect();
        assert_eq!(issues, vec!["Fallen Tree", "Pothole"]);

        let all = store.list_reports(&ReportFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, 3);
    }

    #[actix_web::test]
    async fn search_and_status_filters() {
        let store = MemoryStore::new();
        let pothole = store.insert_report(new_report("a@x.org", "Pothole")).await.unwrap();
        store
            .insert_report(NewReport {
                address: Some("SV Road, Bandra".into()),
                ..new_report("a@x.org", "Open Drain")
            })
            .await
            .unwrap();
        store
            .update_status(pothole.id, IssueStatus::Resolved)
            .await
            .unwrap();

        let filter = ReportFilter {
            search: Some("POT".into()),
            ..Default::default()
        };
        assert_eq!(store.list_reports(&filter).await.unwrap().len(), 1);

        let by_address = ReportFilter {
            search: Some("sv road".into()),
            ..Default::default()
        };
        assert_eq!(store.list_reports(&by_address).await.unwrap().len(), 1);

        // Coordinates and the "not available" placeholder are not searchable.
        for q in ["77.59", "not available"] {
            let filter = ReportFilter {
                search: Some(q.into()),
                ..Default::default()
            };
            assert!(store.list_reports(&filter).await.unwrap().is_empty(), "{q}");
        }

        let open = ReportFilter {
            status: Some(IssueStatus::Open),
            ..Default::default()
        };
        let open = store.list_reports(&open).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].issue_type, "Open Drain");
    }

    #[actix_web::test]
    async fn status_update_on_missing_report() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_status(42, IssueStatus::Resolved).await,
            Err(StoreError::ReportNotFound(42))
        ));
    }

    #[actix_web::test]
    async fn profiles_are_created_once() {
        let store = MemoryStore::new();
        let profile = NewProfile {
            id: "uid-1".into(),
            email: "a@x.org".into(),
            name: "Asha".into(),
            role: Role::Citizen,
        };
        store.create_profile(profile.clone()).await.unwrap();
        assert!(matches!(
            store.create_profile(profile).await,
            Err(StoreError::ProfileExists(_))
        ));
        assert_eq!(
            store.get_profile("uid-1").await.unwrap().unwrap().role,
            Role::Citizen
        );
    }
}
