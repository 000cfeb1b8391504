pub mod auth;
pub mod extract;
pub mod middleware;
pub mod released;
pub mod rest;
pub mod settings;
pub mod state;
pub mod uploads;

pub use middleware::require_auth;
pub use rest::{create_note_handler, delete_note_handler, list_notes_handler, update_note_handler};

use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full application router: public routes, cookie-protected API
/// routes, CORS, request tracing and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/api/released/{id}/unlock",
            post(released::unlock_released_note_handler),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/notes", get(list_notes_handler).post(create_note_handler))
        .route(
            "/api/notes/{id}",
            patch(update_note_handler).delete(delete_note_handler),
        )
        .route(
            "/api/settings",
            get(settings::get_settings_handler).patch(settings::update_settings_handler),
        )
        .route("/api/check-in", post(settings::check_in_handler))
        .route(
            "/api/settings/test-reminder",
            post(settings::test_reminder_handler),
        )
        .route(
            "/api/uploads/request-url",
            post(uploads::request_upload_url_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi())))
}
