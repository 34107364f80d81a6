//! Route definitions for the back-office API.

pub mod access;
pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod inventory;
pub mod menu;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod shops;
pub mod stream;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::services::storage;
use crate::AppState;

/// Multipart framing on top of the raw file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn api_routes(state: &AppState) -> Router<AppState> {
    let auth = Router::new()
        .route("/signup/validate", post(auth::signup_validate))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/password", put(auth::change_password));

    let public = Router::new()
        .route("/shops", get(shops::list_public))
        .route("/shops/{shop_id}/conversations", post(messages::open))
        .route("/conversations/{id}", get(messages::customer_thread))
        .route("/conversations/{id}/messages", post(messages::customer_post));

    Router::new()
        .nest("/auth", auth)
        .nest("/public", public)
        .route("/access/routes", get(access::routes))
        .route("/access/check", get(access::check))
        .route("/shops", get(shops::list_owned))
        .route("/shops/current", get(shops::current))
        .route("/shops/current/staff", get(shops::staff))
        .route("/shops/current/staff/{user_id}", put(shops::update_staff_role))
        .route("/shops/{id}", put(shops::update))
        .route(
            "/categories",
            get(menu::list_categories).post(menu::create_category),
        )
        .route(
            "/categories/{id}",
            put(menu::update_category).delete(menu::delete_category),
        )
        .route("/products", get(menu::list_products).post(menu::create_product))
        .route(
            "/products/{id}",
            get(menu::get_product)
                .put(menu::update_product)
                .delete(menu::delete_product),
        )
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(
                state.config.max_upload_bytes + MULTIPART_OVERHEAD,
            )),
        )
        .route("/inventory", get(inventory::list).post(inventory::create))
        .route(
            "/inventory/{id}",
            get(inventory::get_by_id)
                .put(inventory::update)
                .delete(inventory::delete),
        )
        .route("/inventory/{id}/adjust", post(inventory::adjust))
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/stream", get(orders::stream))
        .route("/orders/{id}", get(orders::get_by_id))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/conversations", get(messages::list))
        .route(
            "/conversations/{id}/messages",
            get(messages::thread).post(messages::reply),
        )
        .route("/conversations/{id}/stream", get(messages::stream))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/analytics/summary", get(analytics::summary))
        .route("/analytics/export", get(analytics::export))
}

fn cors(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match HeaderValue::from_str(&state.config.frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, url = %state.config.frontend_url, "Invalid FRONTEND_URL, CORS disabled");
            layer
        }
    }
}

/// Full application router with middleware applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", api_routes(&state))
        .nest_service(
            storage::PUBLIC_PREFIX,
            ServeDir::new(&state.config.upload_dir),
        )
        .layer(cors(&state))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
