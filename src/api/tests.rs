use super::{ApiState, SESSION_HEADER, build_router};
use crate::catalog::NewListing;
use crate::documents::DocumentStore;
use crate::flows::model::testing::ScriptedModel;
use crate::profile::{UserProfile, VerificationStatus};
use crate::session::AuthUser;
use crate::storage::LocalBlobStore;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://127.0.0.1:9002";
const BOUNDARY: &str = "craftopia-test-boundary";

struct TestApp {
    router: Router,
    state: Arc<ApiState>,
    _blob_dir: tempfile::TempDir,
}

impl TestApp {
    async fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = DocumentStore::new(crate::db::connect_in_memory().await);
        let blob_dir = tempfile::tempdir().expect("tempdir");
        let blobs = LocalBlobStore::new(blob_dir.path(), PUBLIC_URL);
        let model = Arc::new(ScriptedModel::new(responses));
        let state = Arc::new(ApiState::new(documents, blobs, model, Duration::from_secs(3600)).await.expect("state"));

        Self {
            router: build_router(state.clone()),
            state,
            _blob_dir: blob_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, session: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.expect("request")).await
    }

    async fn new_session(&self) -> String {
        let (status, body) = self.call(Method::POST, "/api/session", None, None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().expect("session id").to_string()
    }

    /// A session signed in as `uid`, with a completed profile.
    async fn signed_in(&self, uid: &str) -> String {
        let session = self.new_session().await;
        let (status, _) = self
            .call(
                Method::POST,
                "/api/session/sign-in",
                Some(&session),
                Some(json!({"uid": uid, "email": format!("{uid}@example.com"), "display_name": "Asha Devi"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = self
            .call(
                Method::PUT,
                "/api/profile/setup",
                Some(&session),
                Some(json!({"name": "Asha Devi", "city": "Jaipur", "phone": "9876543210"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        session
    }

    async fn apply(&self, session: &str) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in [
            ("craft_name", "Blue Pottery"),
            ("experience", "12"),
            ("bio", "Cobalt-glazed quartz pottery, three generations in Jaipur."),
        ] {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"sample_image\"; filename=\"vase.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"png-bytes");
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/profile/artisan-application")
            .header(SESSION_HEADER, session)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    async fn verified_artisan(&self, uid: &str) -> (String, UserProfile) {
        let session = self.signed_in(uid).await;
        let (status, _) = self.apply(&session).await;
        assert_eq!(status, StatusCode::OK);
        self.state
            .profiles
            .set_verification_status(uid, VerificationStatus::Verified)
            .await
            .expect("verify");
        let profile = self.state.profiles.require(uid).await.expect("profile");
        (session, profile)
    }

    async fn wait_for_products(&self, count: usize) {
        let mut updates = self.state.feed.subscribe();
        updates
            .wait_for(|products| products.len() == count)
            .await
            .expect("feed");
    }
}

fn listing(title: &str, price: f64, tags: &[&str]) -> NewListing {
    NewListing {
        title: title.into(),
        story: "Handmade in Jaipur.".into(),
        price,
        images: vec![format!("https://img.example/{title}.jpg")],
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

#[tokio::test]
async fn health_and_status() {
    let app = TestApp::new(Vec::<String>::new()).await;

    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call(Method::GET, "/api/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"], 0);
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
    let app = TestApp::new(Vec::<String>::new()).await;

    let (status, body) = app.call(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["title"].is_string());
    assert!(body["description"].is_string());

    let (status, _) = app.call(Method::GET, "/api/cart", Some("unknown"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_sign_in_creates_profile_and_redirects_to_setup() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.new_session().await;
    let user = json!({"uid": "u1", "email": "u1@example.com"});

    let (status, body) = app
        .call(Method::POST, "/api/session/sign-in", Some(&session), Some(user.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_new_user"], true);
    assert_eq!(body["redirect"], "/profile-setup");
    assert_eq!(body["session"]["profile"]["role"], "buyer");

    let (_, body) = app.call(Method::GET, "/api/session", Some(&session), None).await;
    assert_eq!(body["redirect"], "/profile-setup");
    assert_eq!(body["is_artisan"], false);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/profile/setup",
            Some(&session),
            Some(json!({"name": "Asha", "city": "Jaipur", "phone": "123"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Update Failed");
    assert_eq!(body["description"], "Please enter a valid phone number.");

    let other = app.new_session().await;
    let (_, body) = app
        .call(Method::POST, "/api/session/sign-in", Some(&other), Some(user))
        .await;
    assert_eq!(body["is_new_user"], false);
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn sign_out_and_teardown() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.signed_in("u1").await;

    let (status, body) = app.call(Method::POST, "/api/session/sign-out", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], Value::Null);

    let (status, _) = app
        .call(Method::PUT, "/api/profile/setup", Some(&session), Some(json!({"name": "A", "city": "B", "phone": "C"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::DELETE, "/api/session", Some(&session), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call(Method::GET, "/api/session", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guest_cart_lifecycle() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.new_session().await;
    let item = json!({"id": "1", "name": "Vase", "price": "₹1,200", "image": "", "quantity": 5});

    app.call(Method::POST, "/api/cart/items", Some(&session), Some(item.clone())).await;
    let (status, body) = app.call(Method::POST, "/api/cart/items", Some(&session), Some(item)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["total"], "₹2,400.00");

    let (_, body) = app
        .call(Method::PUT, "/api/cart/items/1", Some(&session), Some(json!({"quantity": 0})))
        .await;
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"], "₹0.00");

    let (status, _) = app.call(Method::DELETE, "/api/cart/items/1", Some(&session), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Carts are per session.
    let other = app.new_session().await;
    let (_, body) = app.call(Method::GET, "/api/cart", Some(&other), None).await;
    assert_eq!(body["item_count"], 0);
}

#[tokio::test]
async fn artisan_application_uploads_and_blocks_reapplying() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.signed_in("u1").await;

    let (status, body) = app.apply(&session).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "artisan");
    assert_eq!(body["verification_status"], "pending");
    let image_url = body["sample_images"][0].as_str().expect("url").to_string();
    assert_eq!(image_url, format!("{PUBLIC_URL}/blobs/artisan-applications/u1/vase.png"));

    let path = image_url.trim_start_matches(PUBLIC_URL).to_string();
    let request = Request::builder().uri(path).body(Body::empty()).expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&bytes[..], b"png-bytes");

    let (status, body) = app.apply(&session).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Application Failed");
}

#[tokio::test]
async fn only_verified_artisans_can_list() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let buyer = app.signed_in("buyer").await;
    let body = serde_json::to_value(listing("Vase", 500.0, &["pottery"])).expect("json");

    let (status, _) = app.call(Method::POST, "/api/products", Some(&buyer), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let pending = app.signed_in("pending").await;
    app.apply(&pending).await;
    let (status, body_json) = app.call(Method::POST, "/api/products", Some(&pending), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body_json["title"], "Access Denied");

    let (artisan, _) = app.verified_artisan("artisan").await;
    let (status, product) = app.call(Method::POST, "/api/products", Some(&artisan), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["seller_details"], json!({"name": "Asha Devi", "city": "Jaipur"}));

    let id = product["id"].as_str().expect("id");
    let (status, fetched) = app.call(Method::GET, &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Vase");

    let (status, _) = app.call(Method::GET, "/api/products/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_listing_filters_and_sorts() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let (_, artisan) = app.verified_artisan("artisan").await;
    for (title, price, tags) in [
        ("Bowl", 100.0, &["pottery"][..]),
        ("Vase", 500.0, &["pottery", "blue"][..]),
        ("Shawl", 9999.0, &["textile"][..]),
    ] {
        app.state.catalog.create(&listing(title, price, tags), &artisan).await.expect("create");
    }
    app.wait_for_products(3).await;

    let (status, body) = app
        .call(Method::GET, "/api/products?sort=price-asc&min_price=0&max_price=1000", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let prices: Vec<f64> = body["products"]
        .as_array()
        .expect("products")
        .iter()
        .filter_map(|product| product["ai_price"].as_f64())
        .collect();
    assert_eq!(prices, vec![100.0, 500.0]);
    assert_eq!(body["active_filters"], 2);
    assert_eq!(body["all_tags"], json!(["textile", "pottery", "blue"]));

    let (_, body) = app.call(Method::GET, "/api/products?tags=pottery,blue", None, None).await;
    assert_eq!(body["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["products"][0]["title"], "Vase");

    let (status, body) = app.call(Method::GET, "/api/products?sort=cheapest", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Invalid Filter");
}

#[tokio::test]
async fn adding_a_product_to_the_cart() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let (_, artisan) = app.verified_artisan("artisan").await;
    let product = app
        .state
        .catalog
        .create(&listing("Vase", 1200.0, &[]), &artisan)
        .await
        .expect("create");

    let session = app.new_session().await;
    let uri = format!("/api/products/{}/cart", product.id);
    app.call(Method::POST, &uri, Some(&session), None).await;
    let (status, body) = app.call(Method::POST, &uri, Some(&session), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Added to cart");
    assert_eq!(body["description"], "Vase has been added to your cart.");
    assert_eq!(body["cart"]["items"][0]["price"], "₹1200.00");
    assert_eq!(body["cart"]["items"][0]["hint"], "craft");
    assert_eq!(body["cart"]["total"], "₹2,400.00");
}

#[tokio::test]
async fn failed_identity_check_keeps_application_pending() {
    let app = TestApp::new([r#"{"is_verified": false, "verification_result": "You appear to be in Mumbai."}"#]).await;
    let session = app.signed_in("u1").await;
    app.apply(&session).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/profile/verify-identity",
            Some(&session),
            Some(json!({
                "photo_data_uri": "data:image/jpeg;base64,/9j/4AAQ",
                "latitude": 19.076,
                "longitude": 72.8777
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_verified"], false);
    assert_eq!(body["verification_result"], "You appear to be in Mumbai.");

    let profile = app.state.profiles.require("u1").await.expect("profile");
    assert_eq!(profile.verification_status, Some(VerificationStatus::Pending));
}

#[tokio::test]
async fn buyers_cannot_verify_identity() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.signed_in("u1").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/profile/verify-identity",
            Some(&session),
            Some(json!({"photo_data_uri": "data:image/jpeg;base64,/9j/4AAQ", "latitude": 0.0, "longitude": 0.0})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["title"], "Access Denied");
}

#[tokio::test]
async fn craft_insights_is_public_and_validated() {
    let app = TestApp::new([r#"{"craft_details": "Bidriware is metal inlay work from Bidar."}"#]).await;

    let (status, body) = app
        .call(Method::POST, "/api/flows/craft-insights", None, Some(json!({"craft_name": "ab"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], "Please enter at least 3 characters.");

    let (status, body) = app
        .call(Method::POST, "/api/flows/craft-insights", None, Some(json!({"craft_name": "Bidriware"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["craft_details"].as_str().expect("details").starts_with("Bidriware"));
}

#[tokio::test]
async fn listing_flows_require_an_artisan() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.signed_in("u1").await;

    let (status, _) = app.call(Method::POST, "/api/flows/artisan-listing", Some(&session), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/flows/product-listing",
            None,
            Some(json!({"product_description": "Vase", "product_image": "data:image/png;base64,iVBORw0KGgo="})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn artisan_listing_uses_the_stored_sample() {
    let app = TestApp::new([
        r#"{"product_title": "Cobalt Vase", "product_description": "From Jaipur.", "suggested_price": 1800}"#,
    ])
    .await;
    let (session, _) = app.verified_artisan("artisan").await;

    let (status, body) = app.call(Method::POST, "/api/flows/artisan-listing", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product_title"], "Cobalt Vase");
    assert_eq!(body["suggested_price"], 1800.0);
}

#[tokio::test]
async fn model_failures_are_bad_gateway() {
    let app = TestApp::new(Vec::<String>::new()).await;

    let (status, body) = app
        .call(Method::POST, "/api/flows/craft-insights", None, Some(json!({"craft_name": "Kalamkari"})))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["title"], "Error");
}

#[tokio::test]
async fn transcription_defaults_to_empty_text() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.signed_in("u1").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/flows/transcribe",
            Some(&session),
            Some(json!({"audio_data_uri": "data:audio/webm;base64,GkXfow=="})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcript"], "");
}

#[tokio::test]
async fn sign_in_requires_a_uid() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.new_session().await;
    let user = AuthUser {
        uid: " ".into(),
        email: None,
        display_name: None,
    };

    let (status, _) = app
        .call(
            Method::POST,
            "/api/session/sign-in",
            Some(&session),
            Some(serde_json::to_value(user).expect("json")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_quantities_are_rejected() {
    let app = TestApp::new(Vec::<String>::new()).await;
    let session = app.new_session().await;
    for id in ["a", "b"] {
        let item = json!({"id": id, "name": id, "price": "₹10", "image": ""});
        app.call(Method::POST, "/api/cart/items", Some(&session), Some(item)).await;
    }

    let (status, body) = app
        .call(Method::PUT, "/api/cart/items/a", Some(&session), Some(json!({"quantity": 4294967295u64})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Cart Error");

    let (status, body) = app
        .call(Method::PUT, "/api/cart/items/a", Some(&session), Some(json!({"quantity": 999})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_count"], 1000);

    let (status, body) = app.call(Method::GET, "/api/cart", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], "₹10,000.00");
}
