use actix_web::{
    get, post,
    web::{Data, Json, Path, Query},
    HttpResponse, Responder,
};
use log::{log, Level};

use crate::{
    api::db::log_store,
    app::AppState,
    auth::{FirebaseAuth, User},
    identity::IdentityError,
    navigation::{navigate, Navigation, Page},
    schema::{
        api::{Credentials, NavigateParams, SessionResponse, SignUp},
        db::{NewProfile, Profile, Role},
    },
    utils::{is_valid_email, is_valid_name, is_valid_password},
};

fn identity_error_response(err: IdentityError) -> HttpResponse {
    match err {
        IdentityError::EmailExists => HttpResponse::Conflict().body(err.to_string()),
        IdentityError::InvalidCredentials => HttpResponse::Unauthorized().body(err.to_string()),
        IdentityError::Rejected(_) => HttpResponse::BadRequest().body(err.to_string()),
        IdentityError::Unavailable(e) => {
            log!(Level::Error, "Identity service call failed: {e}");
            HttpResponse::BadGateway().body("Authentication service unavailable")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUp,
    responses(
        (status = 200, description = "Account and citizen profile created", body = SessionResponse),
        (status = 400, description = "Invalid name, email or password"),
        (status = 409, description = "Email already registered")
    )
)]
#[post("/auth/signup")]
pub async fn signup(state: Data<AppState>, body: Json<SignUp>) -> impl Responder {
    log!(Level::Info, "POST /api/auth/signup");

    let SignUp {
        name,
        email,
        password,
    } = body.into_inner();
    let email = email.trim().to_lowercase();
    if !is_valid_name(&name) {
        return HttpResponse::BadRequest().body("Name is required.");
    }
    if !is_valid_email(&email) {
        return HttpResponse::BadRequest().body("Invalid email address.");
    }
    if !is_valid_password(&password) {
        return HttpResponse::BadRequest().body("Password must be at least 6 characters.");
    }

    let session = match state.services.identity.sign_up(&email, &password).await {
        Ok(session) => session,
        Err(err) => return identity_error_response(err),
    };

    // Every self-registered account is a citizen; admins are provisioned out of band.
    let profile = match log_store(
        state
            .store
            .create_profile(NewProfile {
                id: session.uid.clone(),
                email: session.email.clone(),
                name: name.trim().to_string(),
                role: Role::Citizen,
            })
            .await,
    ) {
        Ok(profile) => profile,
        Err(res) => return res,
    };
    log!(Level::Trace, "created profile {}", profile.id);

    HttpResponse::Ok().json(SessionResponse {
        id_token: session.id_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
        profile,
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Wrong email or password"),
        (status = 404, description = "Account has no profile")
    )
)]
#[post("/auth/login")]
pub async fn login(state: Data<AppState>, body: Json<Credentials>) -> impl Responder {
    log!(Level::Info, "POST /api/auth/login");

    let email = body.email.trim().to_lowercase();
    let session = match state.services.identity.sign_in(&email, &body.password).await {
        Ok(session) => session,
        Err(err) => return identity_error_response(err),
    };
    match log_store(state.store.get_profile(&session.uid).await) {
        Ok(Some(profile)) => HttpResponse::Ok().json(SessionResponse {
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            profile,
        }),
        Ok(None) => HttpResponse::NotFound().body("Profile not found"),
        Err(res) => res,
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Existing tokens revoked")),
    security(("firebase" = []))
)]
#[post("/auth/logout", wrap = "FirebaseAuth::enabled()")]
pub async fn logout(state: Data<AppState>, user: User) -> impl Responder {
    log!(Level::Info, "POST /api/auth/logout");
    state
        .revocations
        .revoke(&user.uid, chrono::Utc::now().timestamp());
    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Caller's profile", body = Profile),
        (status = 404, description = "No profile for this account")
    ),
    security(("firebase" = []))
)]
#[get("/users/me", wrap = "FirebaseAuth::enabled()")]
pub async fn get_me(state: Data<AppState>, user: User) -> impl Responder {
    match log_store(state.store.get_profile(&user.uid).await) {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => HttpResponse::NotFound().body("Profile not found"),
        Err(res) => res,
    }
}

#[utoipa::path(
    get,
    path = "/api/navigate/{page}",
    params(("page" = Page, Path, description = "Target page"), NavigateParams),
    responses(
        (status = 200, description = "Navigation allowed", body = Navigation),
        (status = 403, description = "Navigation denied; viewer stays on `from`", body = Navigation)
    )
)]
#[get("/navigate/{page}", wrap = "FirebaseAuth::optional()")]
pub async fn navigate_to(
    state: Data<AppState>,
    path: Path<(String,)>,
    params: Query<NavigateParams>,
    user: Option<User>,
) -> impl Responder {
    let (page,) = path.into_inner();
    let target: Page = match page.parse() {
        Ok(page) => page,
        Err(e) => return HttpResponse::NotFound().body(e),
    };
    let role = match user {
        Some(user) => match log_store(state.store.get_profile(&user.uid).await) {
            Ok(profile) => profile.map(|p| p.role),
            Err(res) => return res,
        },
        None => None,
    };
    let navigation = navigate(params.from.unwrap_or_default(), target, role);
    if navigation.allowed {
        HttpResponse::Ok().json(navigation)
    } else {
        HttpResponse::Forbidden().json(navigation)
    }
}
