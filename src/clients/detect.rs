use anyhow::{anyhow, Result};
use async_trait::async_trait;
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use log::{log, Level};

use crate::{
    clients::{form::MultipartForm, Detector, ImageUpload},
    schema::{db::GeoPoint, detect::DetectionResponse},
};

pub struct HttpDetector {
    client: HttpClient,
    base_url: String,
}

impl HttpDetector {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(HttpDetector {
            client: HttpClient::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

pub(crate) fn image_form(image: &ImageUpload) -> MultipartForm {
    MultipartForm::new().file("image", &image.filename, &image.content_type, &image.bytes)
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(
        &self,
        image: &ImageUpload,
        location: Option<GeoPoint>,
    ) -> Result<DetectionResponse> {
        let mut form = image_form(image);
        if let Some(point) = location {
            form = form
                .text("latitude", &point.latitude.to_string())
                .text("longitude", &point.longitude.to_string());
        }
        log!(
            Level::Debug,
            "POST {}/detect ({} bytes, located: {})",
            self.base_url,
            image.bytes.len(),
            location.is_some()
        );
        let request = Request::post(format!("{}/detect", self.base_url))
            .header("Content-Type", form.content_type())
            .body(form.into_body())?;
        let mut response = self.client.send_async(request).await?;
        if !response.status().is_success() {
            return Err(anyhow!("detection service returned {}", response.status()));
        }
        Ok(response.json().await?)
    }
}
