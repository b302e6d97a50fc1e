use crate::{app::AppState, schema::db::Role};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
    FromRequest, HttpMessage, HttpResponse,
};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    lock::Mutex,
};
use isahc::AsyncReadResponseExt;
use lazy_static::lazy_static;
use log::{log, Level};
use openssl::{
    bn::BigNum,
    hash::MessageDigest,
    pkey::{PKey, Public},
    rsa::Rsa,
    sign::Verifier,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    env,
    rc::Rc,
    sync::{Arc, RwLock},
    task::{Context, Poll},
};

lazy_static! {
    static ref JWT_CACHE: Arc<Mutex<HashMap<String, PKey<Public>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    pub static ref SECURITY_ENABLED: bool = env::var("SECURITY_ENABLED")
        .map(|x| x.parse::<bool>().unwrap_or(true))
        .unwrap_or(true);
}

#[derive(Clone, Debug)]
pub struct AuthSettings {
    /// When false, token signatures and issuers are not checked.
    pub verify: bool,
    pub project_id: String,
    pub jwks_url: String,
}

impl AuthSettings {
    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

/// Per-user cutoffs: tokens issued strictly before the cutoff second are
/// refused. A token minted in the logout second itself stays valid, so an
/// immediate re-login is not locked out.
#[derive(Default)]
pub struct Revocations {
    cutoffs: RwLock<HashMap<String, i64>>,
}

impl Revocations {
    pub fn revoke(&self, uid: &str, at: i64) {
        let mut cutoffs = self.cutoffs.write().unwrap_or_else(|p| p.into_inner());
        cutoffs.insert(uid.to_string(), at);
    }

    pub fn is_revoked(&self, uid: &str, issued_at: i64) -> bool {
        let cutoffs = self.cutoffs.read().unwrap_or_else(|p| p.into_inner());
        cutoffs.get(uid).is_some_and(|cutoff| issued_at < *cutoff)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: String,
}

/// Claims of a verified ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "sub")]
    pub uid: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub iss: String,
    #[serde(skip)]
    pub token: String,
}

impl FromRequest for User {
    type Error = actix_web::error::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        // Populated by the `FirebaseAuth` middleware.
        ready(
            req.extensions()
                .get::<User>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("")),
        )
    }
}

struct TokenPieces {
    header: TokenHeader,
    header_64: String,
    user: User,
    user_64: String,
    signature: Vec<u8>,
}

fn get_token_pieces(token: &str) -> Result<TokenPieces> {
    let mut it = token.split('.');
    let token_header_base64 = it.next().ok_or(anyhow!("!header"))?;
    let token_header = general_purpose::URL_SAFE_NO_PAD.decode(token_header_base64)?;
    let token_header: TokenHeader = serde_json::from_slice(&token_header)?;
    let token_payload_base64 = it.next().ok_or(anyhow!("!body"))?;
    let token_payload = general_purpose::URL_SAFE_NO_PAD.decode(token_payload_base64)?;
    let mut token_payload: User = serde_json::from_slice(&token_payload)?;
    token_payload.token = token.to_string();
    let token_signature = it.next().ok_or(anyhow!("signature"))?;
    let token_signature = general_purpose::URL_SAFE_NO_PAD.decode(token_signature)?;
    Ok(TokenPieces {
        header: token_header,
        header_64: token_header_base64.to_owned(),
        user: token_payload,
        user_64: token_payload_base64.to_owned(),
        signature: token_signature,
    })
}

fn check_claims(user: &User, settings: &AuthSettings, now: i64) -> Result<()> {
    if user.exp < now {
        return Err(anyhow!("token expired"));
    }
    if user.uid.is_empty() {
        return Err(anyhow!("token has no subject"));
    }
    if settings.verify {
        if user.aud != settings.project_id {
            return Err(anyhow!("token audience {} is not ours", user.aud));
        }
        if user.iss != settings.issuer() {
            return Err(anyhow!("token issuer {} is not ours", user.iss));
        }
    }
    Ok(())
}

async fn verify_signature(pieces: &TokenPieces, settings: &AuthSettings) -> Result<bool> {
    if pieces.header.alg != "RS256" {
        return Ok(false);
    }

    let mut cache = JWT_CACHE.lock().await;
    if !cache.contains_key(pieces.header.kid.as_str()) {
        update_cache(&mut cache, &settings.jwks_url).await?;
    }
    let pkey = match cache.get(pieces.header.kid.as_str()) {
        Some(p) => p,
        None => return Ok(false),
    };

    let mut verifier = Verifier::new(MessageDigest::sha256(), pkey)?;
    verifier.update(pieces.header_64.as_bytes())?;
    verifier.update(b".")?;
    verifier.update(pieces.user_64.as_bytes())?;
    Ok(verifier.verify(&pieces.signature).unwrap_or(false))
}

/// Decode, verify and check revocation for a bearer token.
pub async fn authenticate(token: &str, state: &AppState) -> Result<User> {
    let pieces = get_token_pieces(token)?;
    check_claims(&pieces.user, &state.auth, chrono::Utc::now().timestamp())?;
    if state.auth.verify {
        if !verify_signature(&pieces, &state.auth).await? {
            return Err(anyhow!("bad signature"));
        }
    } else {
        log!(Level::Trace, "signature check skipped for {}", pieces.user.uid);
    }
    if state.revocations.is_revoked(&pieces.user.uid, pieces.user.iat) {
        return Err(anyhow!("token revoked"));
    }
    Ok(pieces.user)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Requirement {
    Optional,
    Signed,
    Admin,
}

#[doc(hidden)]
pub struct FirebaseAuthService<S> {
    service: Rc<S>,
    requirement: Requirement,
}

impl<S> Service<ServiceRequest> for FirebaseAuthService<S>
where
    S: Service<
            ServiceRequest,
            Response = ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        > + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let requirement = self.requirement;
        Box::pin(async move {
            let state = match req.app_data::<Data<AppState>>() {
                Some(state) => state.clone(),
                None => {
                    log!(Level::Error, "AppState missing from auth middleware");
                    return Ok(req.into_response(HttpResponse::InternalServerError().finish()));
                }
            };

            let token = match req.headers().get("Authorization").map(|x| x.to_str()) {
                Some(Ok(x)) => Some(x.trim_start_matches("Bearer ").to_string()),
                _ => None,
            };

            let user = match token {
                Some(token) => match authenticate(&token, &state).await {
                    Ok(user) => Some(user),
                    Err(e) => {
                        log!(Level::Debug, "Rejected token: {e}");
                        return Ok(req.into_response(HttpResponse::Unauthorized().finish()));
                    }
                },
                None if requirement == Requirement::Optional => None,
                None => return Ok(req.into_response(HttpResponse::Unauthorized().finish())),
            };

            if requirement == Requirement::Admin {
                // `user` is always present past this point for Admin.
                let uid = user.as_ref().map(|u| u.uid.clone()).unwrap_or_default();
                match state.store.get_profile(&uid).await {
                    Ok(Some(profile)) if profile.role == Role::Admin => {}
                    Ok(_) => {
                        log!(Level::Debug, "Forbidden: {uid} is not an admin");
                        return Ok(req.into_response(
                            HttpResponse::Forbidden()
                                .body("Access denied. Admin privileges required."),
                        ));
                    }
                    Err(e) => {
                        log!(Level::Error, "Profile lookup failed: {e}");
                        return Ok(req.into_response(HttpResponse::InternalServerError().finish()));
                    }
                }
            }

            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }
            service.call(req).await
        })
    }
}

#[derive(Clone, Debug)]
pub struct FirebaseAuth {
    requirement: Requirement,
}

impl FirebaseAuth {
    /// Any signed-in user.
    pub fn enabled() -> Self {
        Self {
            requirement: Requirement::Signed,
        }
    }

    pub fn admin_only() -> Self {
        Self {
            requirement: Requirement::Admin,
        }
    }

    /// Attach the user when a token is sent, but let anonymous requests through.
    pub fn optional() -> Self {
        Self {
            requirement: Requirement::Optional,
        }
    }
}

impl<S> Transform<S, ServiceRequest> for FirebaseAuth
where
    S: Service<
            ServiceRequest,
            Response = ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        > + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Transform = FirebaseAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(FirebaseAuthService {
            service: Rc::new(service),
            requirement: self.requirement,
        }))
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct CertKey {
    kid: String,
    kty: String,
    alg: String,
    r#use: String,
    n: String,
    e: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct CertData {
    keys: Vec<CertKey>,
}

fn to_bignum(component: &str) -> Result<BigNum> {
    Ok(BigNum::from_slice(
        &general_purpose::URL_SAFE_NO_PAD.decode(component.as_bytes())?,
    )?)
}

/// Replace the cache with exactly the published key set, dropping retired kids.
fn replace_keys(cache: &mut HashMap<String, PKey<Public>>, cert_data: CertData) -> Result<()> {
    let mut fresh = HashMap::with_capacity(cert_data.keys.len());
    for key in cert_data.keys {
        let rsa = Rsa::from_public_components(to_bignum(&key.n)?, to_bignum(&key.e)?)?;
        fresh.insert(key.kid, PKey::from_rsa(rsa)?);
    }
    *cache = fresh;
    Ok(())
}

pub async fn update_cache(cache: &mut HashMap<String, PKey<Public>>, jwks_url: &str) -> Result<()> {
    let cert_data: CertData = isahc::get_async(jwks_url).await?.json().await?;
    replace_keys(cache, cert_data)?;
    log!(Level::Debug, "JWKS cache holds {} keys", cache.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: serde_json::Value) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap())
    }

    fn settings(verify: bool) -> AuthSettings {
        AuthSettings {
            verify,
            project_id: "civic-demo".into(),
            jwks_url: "http://127.0.0.1:9/jwks".into(),
        }
    }

    fn token(exp: i64, aud: &str) -> String {
        format!(
            "{}.{}.{}",
            encode(serde_json::json!({"alg": "RS256", "kid": "k1"})),
            encode(serde_json::json!({
                "sub": "uid-7",
                "email": "asha@example.org",
                "iat": 1_700_000_000,
                "exp": exp,
                "aud": aud,
                "iss": "https://securetoken.google.com/civic-demo",
            })),
            general_purpose::URL_SAFE_NO_PAD.encode(b"sig"),
        )
    }

    #[test]
    fn splits_token() {
        let pieces = get_token_pieces(&token(i64::MAX, "civic-demo")).unwrap();
        assert_eq!(pieces.header.kid, "k1");
        assert_eq!(pieces.user.uid, "uid-7");
        assert_eq!(pieces.user.email.as_deref(), Some("asha@example.org"));
        assert_eq!(pieces.signature, b"sig");
        assert!(get_token_pieces("not-a-token").is_err());
    }

    #[test]
    fn claims_are_checked() {
        let now = 1_700_000_100;
        let good = get_token_pieces(&token(now + 60, "civic-demo")).unwrap().user;
        assert!(check_claims(&good, &settings(true), now).is_ok());

        let expired = get_token_pieces(&token(now - 1, "civic-demo")).unwrap().user;
        assert!(check_claims(&expired, &settings(false), now).is_err());

        let foreign = get_token_pieces(&token(now + 60, "other-project")).unwrap().user;
        assert!(check_claims(&foreign, &settings(true), now).is_err());
        assert!(check_claims(&foreign, &settings(false), now).is_ok());
    }

    fn published(kid: &str, rsa: &Rsa<openssl::pkey::Private>) -> CertKey {
        CertKey {
            kid: kid.into(),
            kty: "RSA".into(),
            alg: "RS256".into(),
            r#use: "sig".into(),
            n: general_purpose::URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
            e: general_purpose::URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
        }
    }

    #[test]
    fn key_refresh_drops_retired_kids() {
        let old = Rsa::generate(2048).unwrap();
        let new = Rsa::generate(2048).unwrap();
        let mut cache = HashMap::new();
        replace_keys(
            &mut cache,
            CertData {
                keys: vec![published("retired", &old), published("current", &new)],
            },
        )
        .unwrap();
        assert_eq!(cache.len(), 2);

        replace_keys(
            &mut cache,
            CertData {
                keys: vec![published("current", &new), published("next", &old)],
            },
        )
        .unwrap();
        assert!(!cache.contains_key("retired"));
        assert!(cache.contains_key("current"));
        assert!(cache.contains_key("next"));
        assert_eq!(
            cache["current"].rsa().unwrap().n().to_vec(),
            new.n().to_vec()
        );
    }

    #[test]
    fn revocation_cuts_off_older_tokens() {
        let revocations = Revocations::default();
        assert!(!revocations.is_revoked("uid-7", 100));
        revocations.revoke("uid-7", 150);
        assert!(revocations.is_revoked("uid-7", 100));
        assert!(revocations.is_revoked("uid-7", 149));
        assert!(!revocations.is_revoked("uid-7", 150));
        assert!(!revocations.is_revoked("uid-7", 151));
        assert!(!revocations.is_revoked("uid-8", 100));
    }
}
