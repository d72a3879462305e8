#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

use ticketgate_server::config::Config;
use ticketgate_server::db;
use ticketgate_server::routes::create_routes;
use ticketgate_server::services::mailer::{DeliveryError, Mailer, OutboundEmail};
use ticketgate_server::services::{SignatureVerifier, SIGNATURE_HEADER};
use ticketgate_server::state::AppState;

pub const SECRET: &str = "sk_test_integration";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_secret(Some(SECRET)).await
}

pub async fn spawn_app_with_secret(secret: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("tickets.db").display()),
        paystack_secret_key: secret.map(str::to_string),
        qr_code_dir: dir.path().join("codes"),
        public_base_url: "https://tickets.test".to_string(),
        ..Config::default()
    };

    let pool = db::connect(&config.database_url, 4).await.unwrap();
    db::migrate(&pool).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let (state, _worker) = AppState::new(Arc::new(config), pool, mailer.clone()).unwrap();
    let router = create_routes(state.clone());

    TestApp {
        router,
        state,
        mailer,
        dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_webhook(&self, payload: &Value) -> (StatusCode, Value) {
        self.send(signed_webhook(payload.to_string().into_bytes(), SECRET))
            .await
    }
}

pub fn signed_webhook(body: Vec<u8>, secret: &str) -> Request<Body> {
    let signature = SignatureVerifier::new(Some(secret.to_string()))
        .sign(&body)
        .unwrap();
    Request::post("/webhook/paystack")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

pub fn charge_success() -> Value {
    serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": "R1",
            "amount": 5000,
            "customer": { "email": "a@b.com" },
            "metadata": { "customer_name": "Ada", "phone": "555", "ticket_type": "vip" }
        }
    })
}
