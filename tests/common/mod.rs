#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use actix_web::{http::header, test::TestRequest, web::Data};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use nagarnetra_backend::{
    app::AppState,
    auth::AuthSettings,
    clients::{
        form::MultipartForm, Detector, Geocoder, ImageUpload, IssueAnalyzer, Services, TextModel,
    },
    identity::{IdentityError, IdentityProvider, Session},
    schema::{
        db::{GeoPoint, NewProfile, Role},
        detect::{DetectionResponse, IssueAnalysis},
    },
    store::{MemoryStore, ReportStore},
};

#[derive(Default)]
pub struct FakeDetector {
    /// Reply to a plain classification call; `Err` simulates an HTTP failure.
    pub plain: Mutex<Option<Result<DetectionResponse, String>>>,
    /// Reply to a call carrying a location (the duplicate check).
    pub located: Mutex<Option<Result<DetectionResponse, String>>>,
    pub calls: Mutex<Vec<Option<GeoPoint>>>,
}

impl FakeDetector {
    pub fn answering(plain: Result<DetectionResponse, String>) -> Self {
        let detector = FakeDetector::default();
        *detector.plain.lock().unwrap() = Some(plain);
        detector
    }

    pub fn with_located(self, located: Result<DetectionResponse, String>) -> Self {
        *self.located.lock().unwrap() = Some(located);
        self
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn detect(
        &self,
        _image: &ImageUpload,
        location: Option<GeoPoint>,
    ) -> Result<DetectionResponse> {
        self.calls.lock().unwrap().push(location);
        let reply = match location {
            Some(_) => self.located.lock().unwrap().clone(),
            None => None,
        };
        let reply = reply.or_else(|| self.plain.lock().unwrap().clone());
        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(status)) => Err(anyhow!("detection service returned {status}")),
            None => Err(anyhow!("no reply configured")),
        }
    }
}

pub struct FakeAnalyzer;

#[async_trait]
impl IssueAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _image: &ImageUpload, bearer_token: &str) -> Result<IssueAnalysis> {
        if bearer_token.is_empty() {
            return Err(anyhow!("401"));
        }
        Ok(IssueAnalysis {
            issue_type: "Pothole".into(),
            severity_score: 7.0,
            analysis: "Deep pothole".into(),
            confidence: 0.9,
        })
    }
}

pub struct FakeTextModel(pub Result<String, String>);

#[async_trait]
impl TextModel for FakeTextModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.0.clone().map_err(|e| anyhow!(e))
    }
}

pub struct FakeGeocoder;

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>> {
        Ok(Some(format!("Near {:.2}, {:.2}", point.latitude, point.longitude)))
    }
}

#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), uid.clone()));
        Ok(session(&uid, email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        match self.accounts.lock().unwrap().get(email) {
            Some((stored, uid)) if stored == password => Ok(session(uid, email)),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

fn session(uid: &str, email: &str) -> Session {
    Session {
        uid: uid.to_string(),
        email: email.to_string(),
        id_token: token_issued_at(uid, email, chrono::Utc::now().timestamp()),
        refresh_token: "refresh".into(),
        expires_in: 3600,
    }
}

pub fn detection(issue: &str) -> DetectionResponse {
    serde_json::from_value(serde_json::json!({
        "detections": [{"label": issue.to_lowercase(), "confidence": 0.88, "bbox": [10, 20, 110, 140]}],
        "primary_issue": issue,
        "ai": {
            "description_en": format!("A {} on the road", issue.to_lowercase()),
            "why_it_matters": "Vehicles swerve into oncoming traffic",
            "severity_level": "High"
        }
    }))
    .unwrap()
}

pub fn duplicate_of(issue: &str, report_count: i32) -> DetectionResponse {
    let mut response = detection(issue);
    response.duplicate = serde_json::from_value(
        serde_json::json!({"id": "existing-1", "reportCount": report_count}),
    )
    .unwrap();
    response
}

pub struct Harness {
    pub data: Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub detector: Arc<FakeDetector>,
}

pub fn harness(detector: FakeDetector, urgency_reply: Result<&str, &str>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let detector = Arc::new(detector);
    let services = Services {
        detector: detector.clone(),
        analyzer: Arc::new(FakeAnalyzer),
        text_model: Arc::new(FakeTextModel(
            urgency_reply.map(str::to_string).map_err(str::to_string),
        )),
        geocoder: None,
        identity: Arc::new(FakeIdentity::default()),
    };
    let auth = AuthSettings {
        verify: false,
        project_id: "civic-test".into(),
        jwks_url: "http://127.0.0.1:9/jwks".into(),
    };
    let data = Data::new(AppState::new(store.clone(), services, auth));
    Harness {
        data,
        store,
        detector,
    }
}

impl Harness {
    pub async fn add_profile(&self, uid: &str, email: &str, role: Role) {
        self.store
            .create_profile(NewProfile {
                id: uid.into(),
                email: email.into(),
                name: "Test User".into(),
                role,
            })
            .await
            .unwrap();
    }
}

fn encode(value: serde_json::Value) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap())
}

/// Unsigned ID token; accepted because test harnesses skip signature checks.
pub fn token_issued_at(uid: &str, email: &str, iat: i64) -> String {
    format!(
        "{}.{}.{}",
        encode(serde_json::json!({"alg": "RS256", "kid": "test"})),
        encode(serde_json::json!({
            "sub": uid,
            "email": email,
            "iat": iat,
            "exp": chrono::Utc::now().timestamp() + 3600,
            "aud": "civic-test",
            "iss": "https://securetoken.google.com/civic-test",
        })),
        general_purpose::URL_SAFE_NO_PAD.encode(b"unsigned"),
    )
}

pub fn token(uid: &str, email: &str) -> String {
    token_issued_at(uid, email, chrono::Utc::now().timestamp() - 10)
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub fn image_form() -> MultipartForm {
    MultipartForm::new().file("image", "road.jpg", "image/jpeg", b"\xff\xd8\xff\xe0fakejpeg")
}

pub fn multipart_post(uri: &str, form: MultipartForm) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, form.content_type()))
        .set_payload(form.into_body())
}
