//! Integration test harness for the Vitrine storefront.
//!
//! Every test spawns two servers on ephemeral ports:
//!
//! - a fake commerce backend (plain axum router with canned JSON)
//! - the real storefront application pointed at it
//!
//! and drives the storefront with a cookie-keeping `reqwest` client that does
//! not follow redirects, so Post/Redirect/Get responses can be asserted.
//!
//! # Fixtures
//!
//! Store `maison` sells:
//!
//! | slug   | price           | stock | notes                    |
//! |--------|-----------------|-------|--------------------------|
//! | `mug`  | 20.00           | 5     |                          |
//! | `lamp` | 80.00, sale 60  | 2     |                          |
//! | `tee`  | 25.00           | 10    | variants Small, Large    |
//! | `vase` | 40.00           | 0     | sold out                 |
//!
//! Coupon `SAVE10` takes 10.00 off; every other code is rejected.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use vitrine_storefront::config::{BackendConfig, StorefrontConfig};
use vitrine_storefront::state::AppState;

pub const STORE: &str = "maison";
pub const CSRF_TOKEN: &str = "csrf-test-token";
pub const ORDER_NUMBER: &str = "ORD-1001";
pub const PROVIDER_URL: &str = "https://pay.example.test/checkout/abc";

/// An order the fake backend received as multipart.
#[derive(Debug, Clone, Default)]
pub struct RecordedOrder {
    pub csrf_token: Option<String>,
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub file_size: usize,
}

/// What the fake backend saw.
#[derive(Debug, Default)]
pub struct Recorder {
    pub orders: Mutex<Vec<RecordedOrder>>,
    pub coupon_requests: Mutex<Vec<Value>>,
    pub payment_requests: Mutex<Vec<(String, Value)>>,
}

/// A running storefront with its fake backend.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub backend_url: Url,
    pub recorder: Arc<Recorder>,
}

impl TestContext {
    pub async fn new() -> Self {
        let recorder = Arc::new(Recorder::default());
        let backend_addr = serve(fake_backend(recorder.clone())).await;
        let backend_url = Url::parse(&format!("http://{backend_addr}/")).unwrap();

        let config = StorefrontConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../storefront/static"),
            backend: BackendConfig {
                base_url: backend_url.clone(),
                api_token: SecretString::from("test-backend-token"),
                cache_ttl: Duration::from_secs(60),
                timeout: Some(Duration::from_secs(5)),
            },
            confirmation_path: "/{store}/orders/{order_number}".to_string(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::new(config).expect("Failed to build app state");
        let storefront_addr = serve(vitrine_storefront::app(state)).await;

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{storefront_addr}"),
            backend_url,
            recorder,
        }
    }

    /// Absolute URL of a storefront path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Absolute URL of a path inside the test store.
    pub fn store_url(&self, path: &str) -> String {
        self.url(&format!("/{STORE}{path}"))
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.store_url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn get_text(&self, path: &str) -> String {
        self.get(path).await.text().await.expect("Failed to read body")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.store_url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// POST a form the way the storefront script does.
    pub async fn post_fragment(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.store_url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn add_to_cart(&self, product: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post_form("/cart/add", &[("product", product), ("quantity", &quantity)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    /// Complete the shipping step with a valid address and method 1.
    pub async fn submit_valid_shipping(&self) {
        let response = self.post_form("/checkout/shipping", &valid_shipping_form()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/{STORE}/checkout"));
    }

    /// Cart with one mug, shipping and review done: checkout is at payment.
    pub async fn reach_payment_step(&self) {
        self.add_to_cart("mug", 2).await;
        self.submit_valid_shipping().await;
        let response = self.post_form("/checkout/review", &[]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}

/// A complete, valid shipping step submission.
pub fn valid_shipping_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("email", "ada@example.com"),
        ("phone", "+254 700 123456"),
        ("first_name", "Ada"),
        ("last_name", "Lovelace"),
        ("address", "12 Moi Avenue"),
        ("postal_code", "00100"),
        ("country_id", "1"),
        ("state_id", "10"),
        ("city_id", "100"),
        ("shipping_method_id", "1"),
        ("notes", ""),
    ]
}

/// The `Location` header of a redirect.
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

// =============================================================================
// Fake Backend
// =============================================================================

fn fake_backend(recorder: Arc<Recorder>) -> Router {
    Router::new()
        .route("/api/stores/{store}", get(store))
        .route("/api/stores/{store}/products", get(products))
        .route("/api/stores/{store}/products/{slug}", get(product))
        .route("/api/stores/{store}/checkout", get(checkout))
        .route("/api/stores/{store}/orders", post(orders))
        .route(
            "/api/stores/{store}/payments/{provider}/initialize",
            post(initialize_payment),
        )
        .route("/api/locations/countries/{id}/states", get(states))
        .route("/api/locations/states/{id}/cities", get(cities))
        .route("/api/coupons/validate", post(validate_coupon))
        .with_state(recorder)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response()
}

fn catalog() -> Vec<Value> {
    vec![
        json!({"id": 1, "slug": "mug", "name": "Stoneware Mug", "price": "20.00", "stock": 5,
               "category": "Kitchen", "image": "products/mug.jpg",
               "rating": {"average": "4.5", "count": 12}}),
        json!({"id": 2, "slug": "lamp", "name": "Brass Lamp", "price": "80.00",
               "sale_price": "60.00", "stock": 2, "gallery": ["products/lamp-2.jpg"]}),
        json!({"id": 3, "slug": "tee", "name": "Linen Tee", "price": "25.00", "stock": 10,
               "variants": [
                   {"id": 31, "name": "Small", "stock": 3},
                   {"id": 32, "name": "Large", "price": "27.00", "stock": 0}
               ]}),
        json!({"id": 4, "slug": "vase", "name": "Glass Vase", "price": "40.00", "stock": 0}),
    ]
}

async fn store(Path(store): Path<String>) -> Response {
    if store != STORE {
        return not_found();
    }
    Json(json!({
        "id": 7,
        "slug": STORE,
        "name": "Maison",
        "theme": "furniture",
        "currency": {"code": "USD", "symbol": "$", "symbol_position": "before"},
        "logo": "logos/maison.png",
        "description": "Objects for slow living",
        "pages": [{"title": "About us", "url": "https://maison.example.test/about"}]
    }))
    .into_response()
}

async fn products(
    Path(store): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if store != STORE {
        return not_found();
    }
    let mut data = catalog();
    if query.get("featured").is_some() {
        data.truncate(2);
    }
    if query.get("sort").map(String::as_str) == Some("price_desc") {
        data.reverse();
    }
    let total = data.len();
    Json(json!({"data": data, "current_page": 1, "last_page": 1, "total": total})).into_response()
}

async fn product(Path((store, slug)): Path<(String, String)>) -> Response {
    if store != STORE {
        return not_found();
    }
    let catalog = catalog();
    let Some(found) = catalog.iter().find(|p| p["slug"] == slug.as_str()) else {
        return not_found();
    };
    let related: Vec<&Value> = catalog.iter().filter(|p| p["slug"] != slug.as_str()).collect();
    Json(json!({"product": found, "related": related})).into_response()
}

async fn checkout(Path(store): Path<String>) -> Response {
    if store != STORE {
        return not_found();
    }
    Json(json!({
        "shipping_methods": [
            {"id": 1, "name": "Standard", "type": "flat_rate", "cost": "10.00"},
            {"id": 2, "name": "Free over 100", "type": "free_shipping", "min_order_amount": "100.00"}
        ],
        "payment_methods": {"cod": true, "bank_transfer": true, "paystack": true, "stripe": false},
        "countries": [{"id": 1, "name": "Kenya"}, {"id": 2, "name": "Ghana"}],
        "csrf_token": CSRF_TOKEN,
        "bank_details": "Maison Ltd, account 0012345678",
        "terms_url": "https://maison.example.test/terms"
    }))
    .into_response()
}

async fn states(Path(id): Path<u64>) -> Response {
    match id {
        1 => Json(json!([{"id": 10, "name": "Nairobi County"}, {"id": 11, "name": "Mombasa County"}]))
            .into_response(),
        99 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!([])).into_response(),
    }
}

async fn cities(Path(id): Path<u64>) -> Response {
    match id {
        10 => Json(json!([{"id": 100, "name": "Nairobi"}])).into_response(),
        11 => Json(json!([{"id": 110, "name": "Mombasa"}])).into_response(),
        _ => Json(json!([])).into_response(),
    }
}

async fn validate_coupon(State(recorder): State<Arc<Recorder>>, Json(body): Json<Value>) -> Response {
    recorder.coupon_requests.lock().unwrap().push(body.clone());
    if body["code"].as_str().is_some_and(|code| code.eq_ignore_ascii_case("SAVE10")) {
        Json(json!({"valid": true, "discount": "10.00"})).into_response()
    } else {
        Json(json!({"valid": false, "message": "This coupon has expired."})).into_response()
    }
}

async fn initialize_payment(
    State(recorder): State<Arc<Recorder>>,
    Path((_store, provider)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    recorder.payment_requests.lock().unwrap().push((provider, body));
    Json(json!({"success": true, "redirect_url": PROVIDER_URL})).into_response()
}

async fn orders(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut order = RecordedOrder {
        csrf_token: headers
            .get("X-CSRF-TOKEN")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..RecordedOrder::default()
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            order.file_size = field.bytes().await.unwrap().len();
            order.file_name = Some(file_name);
        } else {
            order.fields.insert(name, field.text().await.unwrap());
        }
    }

    recorder.orders.lock().unwrap().push(order);
    Json(json!({"success": true, "order_number": ORDER_NUMBER})).into_response()
}
