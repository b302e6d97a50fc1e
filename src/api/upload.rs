use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures::StreamExt;
use log::{log, Level};

use crate::{clients::ImageUpload, schema::db::GeoPoint};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_FIELD_BYTES: usize = 64 * 1024;

/// A parsed `multipart/form-data` upload: at most one image plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<ImageUpload>,
    fields: HashMap<String, String>,
}

pub async fn read_upload(mut payload: Multipart) -> Result<UploadForm, HttpResponse> {
    let mut form = UploadForm::default();
    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                log!(Level::Debug, "Malformed multipart body: {e}");
                return Err(HttpResponse::BadRequest().body("Malformed upload"));
            }
        };
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let limit = if name == "image" {
            MAX_IMAGE_BYTES
        } else {
            MAX_FIELD_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    log!(Level::Debug, "Upload interrupted: {e}");
                    return Err(HttpResponse::BadRequest().body("Malformed upload"));
                }
            };
            if bytes.len() + chunk.len() > limit {
                return Err(HttpResponse::PayloadTooLarge().body(format!("{name} is too large")));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name == "image" {
            form.image = Some(ImageUpload {
                filename: filename.unwrap_or_else(|| "upload".to_string()),
                content_type,
                bytes,
            });
        } else {
            match String::from_utf8(bytes) {
                Ok(value) => {
                    form.fields.insert(name, value);
                }
                Err(_) => {
                    return Err(HttpResponse::BadRequest().body(format!("{name} is not text")));
                }
            }
        }
    }
    Ok(form)
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn coordinate(&self, name: &str, range: f64) -> Result<Option<f64>, HttpResponse> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v.abs() <= range => Ok(Some(v)),
                _ => Err(HttpResponse::BadRequest().body(format!("Invalid {name}"))),
            },
        }
    }

    /// Both coordinates or neither.
    pub fn location(&self) -> Result<Option<GeoPoint>, HttpResponse> {
        match (
            self.coordinate("latitude", 90.0)?,
            self.coordinate("longitude", 180.0)?,
        ) {
            (Some(latitude), Some(longitude)) => Ok(Some(GeoPoint {
                latitude,
                longitude,
            })),
            (None, None) => Ok(None),
            _ => Err(HttpResponse::BadRequest().body("Both latitude and longitude are required")),
        }
    }

    /// The uploaded image, rejecting missing or non-image files.
    pub fn require_image(&mut self) -> Result<ImageUpload, HttpResponse> {
        match self.image.take() {
            Some(image) if image.is_image() && !image.bytes.is_empty() => Ok(image),
            Some(_) => Err(HttpResponse::BadRequest().body("Uploaded file is not an image")),
            None => Err(HttpResponse::BadRequest().body("No image uploaded")),
        }
    }
}
