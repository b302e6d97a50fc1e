use std::sync::Arc;

use actix_web::web::{self, scope, Data};
use log::{log, Level};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{ai::*, endpoints::*, session::*, stream::*},
    auth::{AuthSettings, Revocations, SECURITY_ENABLED},
    clients::{
        GeminiTextModel, Geocoder, GoogleGeocoder, HttpDetector, HttpIssueAnalyzer, Services,
    },
    config::Config,
    feed::ChangeFeed,
    identity::FirebaseIdentity,
    navigation::{Navigation, Notification, NotificationKind, Page},
    schema::{api, db, detect},
    store::{MemoryStore, PgStore, ReportStore},
    urgency::{UrgencyInput, UrgencyResult},
};

pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub services: Services,
    pub feed: ChangeFeed,
    pub auth: AuthSettings,
    pub revocations: Revocations,
}

impl AppState {
    pub fn new(store: Arc<dyn ReportStore>, services: Services, auth: AuthSettings) -> Self {
        AppState {
            store,
            services,
            feed: ChangeFeed::default(),
            auth,
            revocations: Revocations::default(),
        }
    }
}

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    let cors = if *SECURITY_ENABLED {
        actix_cors::Cors::default()
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .allow_any_method()
            .max_age(3600)
    } else {
        actix_cors::Cors::permissive()
    };

    #[derive(OpenApi)]
    #[openapi(
        paths(
            analyze_issue,
            check_duplicate,
            detect_issue,
            get_admin_stats,
            get_me,
            get_report,
            get_reports,
            get_version,
            login,
            logout,
            navigate_to,
            reverse_geocode,
            score_urgency,
            signup,
            stream_reports,
            submit_report,
            update_report_status
        ),
        components(schemas(
            api::AddressResponse,
            api::Credentials,
            api::DuplicateResponse,
            api::LocatedPhotoForm,
            api::PhotoForm,
            api::ReportForm,
            api::ReportView,
            api::SessionResponse,
            api::SignUp,
            api::StatsResponse,
            api::StatusUpdate,
            api::SubmissionResponse,
            api::VersionResponse,
            db::GeoPoint,
            db::IssueStatus,
            db::Profile,
            db::Report,
            db::Role,
            db::UrgencyLevel,
            detect::AiSummary,
            detect::Detection,
            detect::DetectionResponse,
            detect::DuplicateInfo,
            detect::IssueAnalysis,
            Navigation,
            Notification,
            NotificationKind,
            Page,
            UrgencyInput,
            UrgencyResult
        )),
        modifiers(&SecurityAddon),
        tags(
            (name = "Nagarnetra", description = "Civic issue reporting API")
        ),
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let components = openapi.components.get_or_insert_with(Default::default);
            components.add_security_scheme(
                "firebase",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }

    let openapi = ApiDoc::openapi();

    cfg.service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", openapi))
        .service(
            scope("/api")
                .wrap(cors)
                .service(signup)
                .service(login)
                .service(logout)
                .service(get_me)
                .service(navigate_to)
                .service(detect_issue)
                .service(analyze_issue)
                .service(score_urgency)
                .service(check_duplicate)
                .service(reverse_geocode)
                .service(submit_report)
                .service(stream_reports)
                .service(get_reports)
                .service(get_report)
                .service(update_report_status)
                .service(get_admin_stats)
                .service(get_version),
        );
}

pub async fn get_app_data(config: &Config) -> anyhow::Result<Data<AppState>> {
    let store: Arc<dyn ReportStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            log!(Level::Warn, "DATABASE_URL not set, reports are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let geocoder = match &config.maps_api_key {
        Some(key) => Some(Arc::new(GoogleGeocoder::new(key)?) as Arc<dyn Geocoder>),
        None => None,
    };
    let services = Services {
        detector: Arc::new(HttpDetector::new(&config.detect_url)?),
        analyzer: Arc::new(HttpIssueAnalyzer::new(&config.ai_backend_url)?),
        text_model: Arc::new(GeminiTextModel::new(
            &config.gemini_api_key,
            &config.gemini_model,
        )?),
        geocoder,
        identity: Arc::new(FirebaseIdentity::new(&config.firebase_api_key)?),
    };
    let auth = AuthSettings {
        verify: config.security_enabled,
        project_id: config.firebase_project_id.clone(),
        jwks_url: config.jwks_url.clone(),
    };
    if !auth.verify {
        log!(Level::Warn, "SECURITY_ENABLED=false, token signatures are not verified");
    }
    Ok(Data::new(AppState::new(store, services, auth)))
}
