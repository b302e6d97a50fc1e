use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// `None` keeps reports in process memory.
    pub database_url: Option<String>,
    pub security_enabled: bool,
    pub firebase_project_id: String,
    pub firebase_api_key: String,
    pub jwks_url: String,
    pub detect_url: String,
    pub ai_backend_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub maps_api_key: Option<String>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} not set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match optional("PORT") {
            Some(port) => port.parse().context("PORT is not a valid port number")?,
            None => 3000,
        };
        let detect_url = optional("DETECT_URL").unwrap_or_else(|| "http://127.0.0.1:8000".into());
        Ok(Config {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: optional("DATABASE_URL"),
            security_enabled: *crate::auth::SECURITY_ENABLED,
            firebase_project_id: required("FIREBASE_PROJECT_ID")?,
            firebase_api_key: required("FIREBASE_API_KEY")?,
            jwks_url: optional("FIREBASE_JWKS_URL").unwrap_or_else(|| DEFAULT_JWKS_URL.into()),
            ai_backend_url: optional("AI_BACKEND_URL").unwrap_or_else(|| detect_url.clone()),
            detect_url,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".into()),
            maps_api_key: optional("GOOGLE_MAPS_API_KEY"),
        })
    }
}
