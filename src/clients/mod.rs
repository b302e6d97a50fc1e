//! Outgoing calls to the hosted AI, mapping and identity services.
//!
//! Each service sits behind a trait so the workflow can be driven without the
//! network. None of the HTTP implementations retry; a failed call is reported
//! to the caller as-is.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    identity::IdentityProvider,
    schema::{
        db::GeoPoint,
        detect::{DetectionResponse, IssueAnalysis},
    },
};

pub mod analyze;
pub mod detect;
pub mod form;
pub mod gemini;
pub mod geocode;

pub use analyze::HttpIssueAnalyzer;
pub use detect::HttpDetector;
pub use gemini::GeminiTextModel;
pub use geocode::GoogleGeocoder;

/// An uploaded photo, held in memory for the duration of one request.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

#[async_trait]
pub trait Detector: Send + Sync {
    /// Classify the photo. With a location attached the service also looks
    /// for an existing report of the same problem.
    async fn detect(
        &self,
        image: &ImageUpload,
        location: Option<GeoPoint>,
    ) -> anyhow::Result<DetectionResponse>;
}

#[async_trait]
pub trait IssueAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImageUpload, bearer_token: &str)
        -> anyhow::Result<IssueAnalysis>;
}

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, point: GeoPoint) -> anyhow::Result<Option<String>>;
}

#[derive(Clone)]
pub struct Services {
    pub detector: Arc<dyn Detector>,
    pub analyzer: Arc<dyn IssueAnalyzer>,
    pub text_model: Arc<dyn TextModel>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub identity: Arc<dyn IdentityProvider>,
}
