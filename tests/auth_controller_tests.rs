mod common;

use axum::http::{header, Request, StatusCode};
use common::*;
use cryptoalert::{routes, services::store::AlertStore};
use serde_json::json;
use tower::ServiceExt;

async fn register(t: &TestApp, email: &str, password: &str) -> axum::response::Response {
    routes::app(t.state.clone())
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": email, "password": password, "name": "Tester" }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn register_creates_user_and_returns_usable_token() {
    let t = test_app();

    let res = register(&t, "New.User@Example.com", "hunter22").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.headers().get(header::SET_COOKIE).is_some());

    let body = response_json(res).await;
    assert_eq!(body["user"]["email"], "new.user@example.com");
    assert_eq!(body["user"]["name"], "Tester");
    let token = body["token"].as_str().unwrap().to_string();

    let stored = t
        .store
        .find_user_by_email("new.user@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.password_hash, "hunter22");

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/auth/me", Some(&format!("Bearer {token}"))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["user"]["id"], stored.id.as_str());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let t = test_app();

    assert_eq!(register(&t, "dup@example.com", "secret1").await.status(), StatusCode::CREATED);

    let res = register(&t, "DUP@example.com", "secret2").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(res).await["error"], "Email has already been taken!");
}

#[tokio::test]
async fn invalid_registration_input_is_rejected() {
    let t = test_app();

    let res = register(&t, "not-an-email", "secret1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = register(&t, "short@example.com", "abc").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert!(t.store.find_user_by_email("short@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn login_sets_cookie_that_authenticates_requests() {
    let t = test_app();
    register(&t, "login@example.com", "correct-horse").await;

    let res = routes::app(t.state.clone())
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "login@example.com", "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let set_cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let pair = set_cookie.split(';').next().unwrap().to_string();
    assert!(pair.starts_with(&format!("{}=", t.state.settings.jwt_cookie_name)));
    assert!(set_cookie.contains("HttpOnly"));

    let req = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::COOKIE, pair)
        .body(axum::body::Body::empty())
        .unwrap();
    let res = routes::app(t.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["user"]["email"], "login@example.com");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let t = test_app();
    register(&t, "known@example.com", "right-pass").await;

    for (email, password) in [
        ("known@example.com", "wrong-pass"),
        ("unknown@example.com", "right-pass"),
    ] {
        let res = routes::app(t.state.clone())
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response_json(res).await["error"], "Invalid email or password.");
    }
}

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let t = test_app();

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/auth/me", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_ignored() {
    let t = test_app();
    let mut other = test_settings();
    other.jwt_secret = "some-other-secret".to_string();
    let foreign = test_app_with(other, FakePrices::with(&[]));

    let auth = bearer_for(&foreign.state, &identity("u1"));
    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/auth/me", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
