mod common;

use axum::http::StatusCode;
use common::*;
use cryptoalert::{
    models::AlertCondition,
    routes,
    services::store::AlertStore,
};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn alerts_require_authentication() {
    let t = test_app();

    for req in [
        empty_request("GET", "/api/alerts", None),
        json_request(
            "POST",
            "/api/alerts",
            None,
            json!({ "asset": "bitcoin", "target_price": 1, "condition": "above" }),
        ),
        empty_request("DELETE", "/api/alerts?id=x", None),
        empty_request("GET", "/api/alerts", Some("Bearer not-a-jwt")),
    ] {
        let res = routes::app(t.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = response_json(res).await;
        assert_eq!(body["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn create_then_list_returns_the_new_alert() {
    let t = test_app();
    let auth = bearer_for(&t.state, &identity("u1"));

    let res = routes::app(t.state.clone())
        .oneshot(json_request(
            "POST",
            "/api/alerts",
            Some(&auth),
            json!({ "cryptocurrency": "Bitcoin", "targetPrice": 50000, "condition": "ABOVE" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["message"], "Alert created successfully");
    assert_eq!(body["alert"]["asset"], "bitcoin");
    assert_eq!(body["alert"]["condition"], "above");
    assert_eq!(body["alert"]["owner_id"], "u1");
    assert_eq!(body["alert"]["is_active"], true);
    assert_eq!(body["alert"]["is_triggered"], false);

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/alerts", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["target_price"], 50000.0);
    assert!(alerts[0]["latest_trigger"].is_null());
}

#[tokio::test]
async fn invalid_condition_is_rejected_and_nothing_is_stored() {
    let t = test_app();
    let auth = bearer_for(&t.state, &identity("u1"));

    let res = routes::app(t.state.clone())
        .oneshot(json_request(
            "POST",
            "/api/alerts",
            Some(&auth),
            json!({ "asset": "bitcoin", "target_price": 100, "condition": "sideways" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_json(res).await;
    assert_eq!(body["error"], r#"Condition must be either "above" or "below""#);
    assert!(t.store.get_alerts_by_owner("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_fields_and_bad_price_are_rejected() {
    let t = test_app();
    let auth = bearer_for(&t.state, &identity("u1"));

    let cases = [
        (
            json!({ "asset": "bitcoin", "condition": "above" }),
            "Cryptocurrency, target price, and condition are required",
        ),
        (
            json!({ "asset": "bitcoin", "target_price": -3, "condition": "below" }),
            "Target price must be a positive number",
        ),
    ];

    for (payload, message) in cases {
        let res = routes::app(t.state.clone())
            .oneshot(json_request("POST", "/api/alerts", Some(&auth), payload))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(res).await["error"], message);
    }

    assert!(t.store.get_alerts_by_owner("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_someone_elses_alert_is_not_found() {
    let t = test_app();
    let theirs = t
        .store
        .create_alert("owner", "bitcoin", 10.0, AlertCondition::Above)
        .await
        .unwrap();
    let auth = bearer_for(&t.state, &identity("intruder"));

    let res = routes::app(t.state.clone())
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/alerts?id={}", theirs.id),
            Some(&auth),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(res).await["error"], "Alert not found");

    assert!(t.store.find_alert_by_id(&theirs.id).await.unwrap().is_some());
}

#[tokio::test]
async fn owner_can_delete_and_missing_id_is_bad_request() {
    let t = test_app();
    let mine = t
        .store
        .create_alert("u1", "ethereum", 10.0, AlertCondition::Below)
        .await
        .unwrap();
    let auth = bearer_for(&t.state, &identity("u1"));

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("DELETE", "/api/alerts", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["error"], "Alert ID is required");

    let res = routes::app(t.state.clone())
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/alerts?id={}", mine.id),
            Some(&auth),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(t.store.find_alert_by_id(&mine.id).await.unwrap().is_none());

    let res = routes::app(t.state.clone())
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/alerts?id={}", mine.id),
            Some(&auth),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_defaults_to_pending_and_filters_fired_alerts() {
    let t = test_app_with(test_settings(), FakePrices::with(&[("bitcoin", 60_000.0)]));
    let user = t.store.create_user("u@example.com", "h", None).await.unwrap();
    let fired = t
        .store
        .create_alert(&user.id, "bitcoin", 50_000.0, AlertCondition::Above)
        .await
        .unwrap();
    let pending = t
        .store
        .create_alert(&user.id, "bitcoin", 70_000.0, AlertCondition::Above)
        .await
        .unwrap();

    t.state.monitor.run_evaluation_pass().await.unwrap();

    let auth = bearer_for(&t.state, &user.clone().into());
    let list = |query: &'static str| {
        let app = routes::app(t.state.clone());
        let auth = auth.clone();
        async move {
            let res = app
                .oneshot(empty_request("GET", &format!("/api/alerts{query}"), Some(&auth)))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            response_json(res).await["alerts"].as_array().unwrap().clone()
        }
    };

    let triggered = list("?triggered=true").await;
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0]["id"], fired.id.as_str());
    assert_eq!(triggered[0]["latest_trigger"]["triggered_price"], 60_000.0);

    let open = list("?triggered=false").await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["id"], pending.id.as_str());

    let default = list("").await;
    assert_eq!(default.len(), 1);
    assert_eq!(default[0]["id"], pending.id.as_str());

    let unrecognised = list("?triggered=maybe").await;
    assert_eq!(unrecognised.len(), 1);
    assert_eq!(unrecognised[0]["id"], pending.id.as_str());
}

#[tokio::test]
async fn cron_endpoint_runs_a_pass() {
    let t = test_app_with(test_settings(), FakePrices::with(&[("solana", 90.0)]));
    let user = t.store.create_user("s@example.com", "h", None).await.unwrap();
    t.store
        .create_alert(&user.id, "solana", 100.0, AlertCondition::Below)
        .await
        .unwrap();

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("POST", "/api/cron/check-alerts", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["checked"], 1);
    assert_eq!(body["report"]["triggered"], 1);
    assert_eq!(t.notifier.sent().len(), 1);
    assert_eq!(t.notifier.sent()[0].to_address, "s@example.com");
}

#[tokio::test]
async fn cron_endpoint_checks_secret_when_configured() {
    let mut settings = test_settings();
    settings.cron_secret = Some("s3cret".to_string());
    let t = test_app_with(settings, FakePrices::with(&[]));

    for auth in [None, Some("Bearer wrong")] {
        let res = routes::app(t.state.clone())
            .oneshot(empty_request("GET", "/api/cron/check-alerts", auth))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response_json(res).await["success"], false);
    }

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/cron/check-alerts", Some("Bearer s3cret")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(t.prices.calls(), 0);
}

#[tokio::test]
async fn price_endpoint_serves_single_batch_and_catalog_queries() {
    let t = test_app_with(
        test_settings(),
        FakePrices::with(&[("bitcoin", 65_000.0), ("ethereum", 3_000.0)]),
    );

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/price?crypto=Bitcoin", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert_eq!(body["crypto"], "bitcoin");
    assert_eq!(body["price"], 65_000.0);
    assert_eq!(body["change24h"], 1.5);

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/price?ids=bitcoin,ethereum,dogecoin", None))
        .await
        .unwrap();
    let body = response_json(res).await;
    assert_eq!(body["prices"]["ethereum"]["usd"], 3_000.0);
    assert!(body["prices"].get("dogecoin").is_none());

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/api/price?list=true", None))
        .await
        .unwrap();
    let body = response_json(res).await;
    assert_eq!(body["cryptos"].as_array().unwrap().len(), 8);
    assert_eq!(body["cryptos"][0]["symbol"], "BTC");
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let t = test_app();

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/health/store", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["store"], "ok");

    let res = routes::app(t.state.clone())
        .oneshot(empty_request("GET", "/nope", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
