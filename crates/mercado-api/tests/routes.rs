use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use mercado_api::{AppStateInner, router};
use mercado_db::Database;
use mercado_db::migrations::VEHICLES_CATEGORY_ID;

fn app() -> Router {
    let db = Database::open_in_memory().expect("open db");
    router(Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
    }))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn register(app: &Router, email: &str, name: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "correct horse", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["user_id"].as_str().expect("user_id").to_string(),
        body["token"].as_str().expect("token").to_string(),
    )
}

/// Seller registers and publishes an active listing.
async fn published(app: &Router) -> (String, String, String) {
    let (seller_id, seller) = register(app, "seller@example.com", "Seller").await;
    let (status, listing) = call(
        app,
        "POST",
        "/listings",
        Some(&seller),
        Some(json!({
            "title": "Honda Civic 2015",
            "price": 55000.0,
            "category_id": VEHICLES_CATEGORY_ID,
            "type": "produto",
            "city": "Florianópolis",
            "state": "SC",
            "attributes": { "kind": "general", "km": 90000 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", listing);
    assert_eq!(listing["status"], "draft");
    let listing_id = listing["id"].as_str().expect("id").to_string();

    let (status, _) = call(
        app,
        "PUT",
        &format!("/listings/{}/status", listing_id),
        Some(&seller),
        Some(json!({ "status": "active" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    (seller_id, seller, listing_id)
}

#[tokio::test]
async fn login_returns_token_for_registered_user() {
    let app = app();
    register(&app, "ana@example.com", "Ana").await;

    let (status, body) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ANA@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");

    let (status, _) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ana@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "ana@example.com", "password": "another one", "name": "Ana 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn simultaneous_registrations_with_one_email() {
    let app = app();
    let body = || Some(json!({ "email": "twin@example.com", "password": "correct horse", "name": "Twin" }));

    let (first, second) = tokio::join!(
        call(&app, "POST", "/auth/register", None, body()),
        call(&app, "POST", "/auth/register", None, body()),
    );
    let mut statuses = [first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, [201, 409]);
}

#[tokio::test]
async fn long_name_gets_its_own_message() {
    let app = app();
    let (status, body) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "long@example.com", "password": "correct horse", "name": "x".repeat(81) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name must have at most 80 characters");
}

#[tokio::test]
async fn malformed_requests_get_error_bodies() {
    let app = app();
    let (_, token) = register(&app, "ana@example.com", "Ana").await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "INVALID_BODY");

    let (status, body) = call(
        &app,
        "PUT",
        "/me/profile",
        Some(&token),
        Some(json!({ "name": "Ana", "nickname": "an" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_BODY");

    let (status, body) = call(&app, "GET", "/listings/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PATH");

    let (status, body) = call(&app, "GET", "/listings?price_min=cheap", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
}

#[tokio::test]
async fn anonymous_calls_need_login() {
    let app = app();
    let (_, _, listing_id) = published(&app).await;

    let (status, body) = call(&app, "POST", &format!("/listings/{}/favorite", listing_id), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_REQUIRED");

    let (status, _) = call(&app, "GET", "/conversations", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // public pages stay public
    let (status, found) = call(&app, "GET", "/listings?city=florian%C3%B3polis", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn buyer_contacts_seller_and_both_see_thread() {
    let app = app();
    let (seller_id, seller, listing_id) = published(&app).await;
    let (_, buyer) = register(&app, "buyer@example.com", "Buyer").await;

    let start = |message: Value| {
        let app = app.clone();
        let buyer = buyer.clone();
        let uri = format!("/listings/{}/conversations", listing_id);
        let body = json!({ "seller_id": seller_id, "message": message });
        async move { call(&app, "POST", &uri, Some(&buyer), Some(body)).await }
    };

    let (status, body) = start(json!("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, first) = start(json!("Ainda disponível?")).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    let (_, second) = start(json!("Aceita troca?")).await;
    assert_eq!(first["conversation_id"], second["conversation_id"]);

    let conversation_id = first["conversation_id"].as_str().expect("id");
    let (status, sent) = call(
        &app,
        "POST",
        &format!("/conversations/{}/messages", conversation_id),
        Some(&seller),
        Some(json!({ "body": "Sim, aceito" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, messages) = call(
        &app,
        "GET",
        &format!("/conversations/{}/messages", conversation_id),
        Some(&buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages.as_array().expect("array");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["body"], "Ainda disponível?");
    assert_eq!(messages[2]["id"], sent["id"]);

    let (_, threads) = call(&app, "GET", "/conversations", Some(&seller), None).await;
    assert_eq!(threads[0]["listing_title"], "Honda Civic 2015");

    let (_, overview) = call(&app, "GET", "/meus-anuncios", Some(&seller), None).await;
    assert_eq!(overview["tab"], "ads");
    assert_eq!(overview["ads_count"], 1);
    assert_eq!(overview["conversations_count"], 1);
}

#[tokio::test]
async fn favorite_toggles_back_and_forth() {
    let app = app();
    let (_, _, listing_id) = published(&app).await;
    let (_, buyer) = register(&app, "buyer@example.com", "Buyer").await;
    let uri = format!("/listings/{}/favorite", listing_id);

    let (_, on) = call(&app, "POST", &uri, Some(&buyer), None).await;
    assert_eq!(on["favorited"], true);
    let (_, ids) = call(&app, "GET", "/me/favorites/ids", Some(&buyer), None).await;
    assert_eq!(ids[0], listing_id.as_str());

    let (_, off) = call(&app, "POST", &uri, Some(&buyer), None).await;
    assert_eq!(off["favorited"], false);
}

#[tokio::test]
async fn promotion_is_owner_only_and_priced_from_catalog() {
    let app = app();
    let (_, seller, listing_id) = published(&app).await;
    let (_, buyer) = register(&app, "buyer@example.com", "Buyer").await;
    let uri = format!("/listings/{}/promotion", listing_id);
    let selection = json!({ "plans": ["vip", "highlight"], "vip_days": 60 });

    let (status, quote) = call(&app, "POST", &format!("{}/quote", uri), None, Some(selection.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["total"], 15990);
    assert_eq!(quote["total_display"], "R$159,90");
    assert_eq!(quote["tier"], "vip");

    let (status, _) = call(&app, "POST", &uri, Some(&buyer), Some(selection.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, applied) = call(&app, "POST", &uri, Some(&seller), Some(selection)).await;
    assert_eq!(status, StatusCode::OK, "{}", applied);
    assert_eq!(applied["promotion"]["plan_tier"], "vip");
    assert!(applied["promotion"]["plan_expires_at"].is_string());
    assert_eq!(applied["promotion"]["website_url"], "");

    let (_, selector) = call(&app, "GET", &uri, Some(&seller), None).await;
    assert_eq!(selector["vip_days"], 60);
    assert_eq!(selector["premium_days"], 30);
}

#[tokio::test]
async fn detail_page_counts_views_and_clicks() {
    let app = app();
    let (_, _, listing_id) = published(&app).await;
    let uri = format!("/listings/{}", listing_id);

    call(&app, "GET", &uri, None, None).await;
    let (status, _) = call(&app, "POST", &format!("{}/clicks/whatsapp", uri), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "POST", &format!("{}/clicks/likes", uri), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        &format!("{}/contact/email", uri),
        None,
        Some(json!({ "email": "visitor@example.com", "robot_checked": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listing) = call(&app, "GET", &uri, None, None).await;
    // the second GET reads before counting itself
    assert_eq!(listing["analytics"]["views"], 1);
    assert_eq!(listing["analytics"]["whatsapp_clicks"], 1);
    assert_eq!(listing["analytics"]["email_clicks"], 0);
    assert_eq!(listing["owner"]["name"], "Seller");
    assert_eq!(listing["effective_tier"], "normal");
    assert!(listing.get("price_per_square_meter").is_none());

    let (status, _) = call(&app, "GET", &format!("/listings/{}", uuid_nil()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn uuid_nil() -> &'static str {
    "00000000-0000-0000-0000-000000000000"
}
