use anyhow::{anyhow, Result};
use async_trait::async_trait;
use isahc::{AsyncReadResponseExt, HttpClient, Request};

use crate::{
    clients::{detect::image_form, ImageUpload, IssueAnalyzer},
    schema::detect::IssueAnalysis,
};

/// Client for the authenticated `/analyze-issue` classifier.
pub struct HttpIssueAnalyzer {
    client: HttpClient,
    base_url: String,
}

impl HttpIssueAnalyzer {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(HttpIssueAnalyzer {
            client: HttpClient::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IssueAnalyzer for HttpIssueAnalyzer {
    async fn analyze(&self, image: &ImageUpload, bearer_token: &str) -> Result<IssueAnalysis> {
        let form = image_form(image);
        let request = Request::post(format!("{}/analyze-issue", self.base_url))
            .header("Authorization", format!("Bearer {}", bearer_token))
            .header("Content-Type", form.content_type())
            .body(form.into_body())?;
        let mut response = self.client.send_async(request).await?;
        if !response.status().is_success() {
            return Err(anyhow!("analysis service returned {}", response.status()));
        }
        let analysis: IssueAnalysis = response.json().await?;
        Ok(analysis.normalized())
    }
}
