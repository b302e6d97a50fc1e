mod common;

use actix_web::{http::StatusCode, test, App};
use nagarnetra_backend::{
    app::configure_app,
    schema::db::Role,
    store::ReportStore,
};
use serde_json::{json, Value};

use common::*;

#[actix_web::test]
async fn signup_creates_citizen_profile() {
    let h = harness(FakeDetector::default(), Ok("{}"));
    let app = test::init_service(App::new().app_data(h.data.clone()).configure(configure_app)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({"name": "Asha Rao", "email": " Asha@Example.org ", "password": "secret1"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["profile"]["email"], "asha@example.org");
    assert_eq!(body["profile"]["role"], "citizen");
    assert!(!body["idToken"].as_str().unwrap().is_empty());

    let uid = body["profile"]["id"].as_str().unwrap().to_string();
    let profile = h.store.get_profile(&uid).await.unwrap().unwrap();
    assert_eq!(profile.role, Role::Citizen);
    assert_eq!(profile.name, "Asha Rao");

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({"name": "Asha Again", "email": "asha@example.org", "password": "secret2"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "asha@example.org", "password": "secret1"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["profile"]["id"], uid.as_str());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "asha@example.org", "password": "wrong-one"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signup_validates_input() {
    let h = harness(FakeDetector::default(), Ok("{}"));
    let app = test::init_service(App::new().app_data(h.data.clone()).configure(configure_app)).await;

    for body in [
        json!({"name": "", "email": "a@example.org", "password": "secret1"}),
        json!({"name": "Asha", "email": "not-an-email", "password": "secret1"}),
        json!({"name": "Asha", "email": "a@example.org", "password": "12345"}),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn logout_revokes_existing_tokens() {
    let h = harness(FakeDetector::default(), Ok("{}"));
    h.add_profile("uid-1", "asha@example.org", Role::Citizen).await;
    let app = test::init_service(App::new().app_data(h.data.clone()).configure(configure_app)).await;
    let issued = bearer(&token("uid-1", "asha@example.org"));

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(issued.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["email"], "asha@example.org");

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(issued.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(issued)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // A token minted right after logout, possibly in the same second.
    let relogin = chrono::Utc::now().timestamp();
    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(bearer(&token_issued_at("uid-1", "asha@example.org", relogin)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn login_right_after_logout_is_accepted() {
    let h = harness(FakeDetector::default(), Ok("{}"));
    let app = test::init_service(App::new().app_data(h.data.clone()).configure(configure_app)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({"name": "Asha Rao", "email": "asha@example.org", "password": "secret1"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let uid = body["profile"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(bearer(&token_issued_at(
            &uid,
            "asha@example.org",
            chrono::Utc::now().timestamp() - 30,
        )))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let fresh = token_issued_at(&uid, "asha@example.org", chrono::Utc::now().timestamp());
    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(bearer(&fresh))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["id"], uid.as_str());
}

#[actix_web::test]
async fn navigation_is_role_gated() {
    let h = harness(FakeDetector::default(), Ok("{}"));
    h.add_profile("uid-1", "asha@example.org", Role::Citizen).await;
    h.add_profile("admin-1", "ops@city.gov", Role::Admin).await;
    let app = test::init_service(App::new().app_data(h.data.clone()).configure(configure_app)).await;

    let req = test::TestRequest::get()
        .uri("/api/navigate/admin?from=track")
        .insert_header(bearer(&token("uid-1", "asha@example.org")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["page"], "track");
    assert_eq!(body["allowed"], false);
    assert_eq!(
        body["notification"]["message"],
        "Access denied. Admin privileges required."
    );

    let req = test::TestRequest::get()
        .uri("/api/navigate/report?from=admin")
        .insert_header(bearer(&token("admin-1", "ops@city.gov")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["page"], "admin");

    let req = test::TestRequest::get().uri("/api/navigate/track").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["page"], "home");
    assert_eq!(
        body["notification"]["message"],
        "Please login to access this feature."
    );

    let req = test::TestRequest::get()
        .uri("/api/navigate/admin")
        .insert_header(bearer(&token("admin-1", "ops@city.gov")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["page"], "admin");
    assert_eq!(body["allowed"], true);

    let req = test::TestRequest::get().uri("/api/navigate/settings").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
