//! Email/password accounts, held by the hosted identity service.

use anyhow::anyhow;
use async_trait::async_trait;
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use log::{log, Level};
use serde::{Deserialize, Serialize};

const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts";

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("An account with this email already exists.")]
    EmailExists,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("{0}")]
    Rejected(String),
    #[error("identity service unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TokenReply {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize, Debug)]
struct ErrorReply {
    error: ErrorBody,
}

/// Map the identity service's error codes onto the ones callers act on.
fn classify_error(code: &str) -> IdentityError {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let head = code.split(':').next().unwrap_or(code).trim();
    match head {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        _ => IdentityError::Rejected(code.to_string()),
    }
}

pub struct FirebaseIdentity {
    client: HttpClient,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        Ok(FirebaseIdentity {
            client: HttpClient::new()?,
            api_key: api_key.to_string(),
        })
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let body = serde_json::to_vec(&PasswordRequest {
            email,
            password,
            return_secure_token: true,
        })
        .map_err(anyhow::Error::from)?;
        let request = Request::post(format!("{IDENTITY_URL}:{action}?key={}", self.api_key))
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(anyhow::Error::from)?;
        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(anyhow::Error::from)?;

        if !response.status().is_success() {
            let status = response.status();
            return match response.json::<ErrorReply>().await {
                Ok(reply) => {
                    log!(Level::Debug, "{action} rejected: {}", reply.error.message);
                    Err(classify_error(&reply.error.message))
                }
                Err(_) => Err(anyhow!("identity service returned {status}").into()),
            };
        }

        let reply: TokenReply = response.json().await.map_err(anyhow::Error::from)?;
        Ok(Session {
            uid: reply.local_id,
            email: reply.email,
            id_token: reply.id_token,
            refresh_token: reply.refresh_token,
            expires_in: reply.expires_in.parse().unwrap_or(3600),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert!(matches!(classify_error("EMAIL_EXISTS"), IdentityError::EmailExists));
        assert!(matches!(
            classify_error("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        match classify_error("WEAK_PASSWORD : Password should be at least 6 characters") {
            IdentityError::Rejected(msg) => assert!(msg.starts_with("WEAK_PASSWORD")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
