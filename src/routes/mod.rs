use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, security_headers};
use crate::handlers::{admin_dashboard, health_check, paystack_webhook, require_signature, scan_ticket};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let webhook = post(paystack_webhook).layer(from_fn_with_state(state.clone(), require_signature));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/webhook/paystack", webhook)
        .route("/scan/:ticket_id", get(scan_ticket))
        .route("/admin", get(admin_dashboard))
        .nest_service("/codes", ServeDir::new(&state.config.qr_code_dir))
        .with_state(state.clone());

    for layer in security_headers(state.config.production) {
        router = router.layer(layer);
    }

    router
        .layer(create_cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
