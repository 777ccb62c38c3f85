//! Router construction for the inventory server.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware as axum_mw,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use stockroom_types::ErrorBody;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::auth::middleware::jwt_auth;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        // Session
        .route("/userinfo", get(handlers::auth::userinfo))
        .route("/users", get(handlers::auth::list_users))
        .route("/user/change-password", post(handlers::auth::change_password))
        .route("/logout", post(handlers::auth::logout))
        // Materials
        .route(
            "/materials",
            get(handlers::materials::list).post(handlers::materials::create),
        )
        .route("/materials/summary", get(handlers::materials::summary))
        .route("/materials/barcodes.pdf", get(handlers::materials::barcode_sheet))
        .route(
            "/materials/barcode/:barcode",
            get(handlers::materials::by_barcode),
        )
        .route(
            "/materials/:item_id",
            put(handlers::materials::update).delete(handlers::materials::remove),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::categories::list).post(handlers::categories::create),
        )
        .route(
            "/categories/:id",
            put(handlers::categories::rename).delete(handlers::categories::remove),
        )
        // Inventory records
        .route("/barcode/record", post(handlers::records::scan_record))
        .route("/inventory/record", post(handlers::records::scan_record))
        .route(
            "/in-records",
            get(handlers::records::list_in).post(handlers::records::create_in),
        )
        .route("/in-records/:id", delete(handlers::records::delete_in))
        .route(
            "/out-records",
            get(handlers::records::list_out).post(handlers::records::create_out),
        )
        .route("/out-records/:id", delete(handlers::records::delete_out))
        // Reports and files
        .route("/report/preview", get(handlers::reports::preview_pdf))
        .route("/report/export_excel", get(handlers::reports::export_excel))
        .route("/backup", get(handlers::backup::backup_database))
        .route("/font/noto_sans_tc", get(handlers::font::noto_sans_tc))
        .layer(axum_mw::from_fn(jwt_auth));

    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register))
        .route("/auto-auth", get(handlers::auth::auto_auth))
        .route("/get-db-uri", get(handlers::auth::get_db_uri))
        .route("/portal/accounts", get(handlers::portal::accounts));

    let api = public
        .merge(protected)
        .fallback(api_not_found)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("access-control-allow-private-network"),
            HeaderValue::from_static("true"),
        ));

    let static_dir = state.config.static_dir.clone();
    let dashboard = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .service(ServeFile::new(static_dir.join("dashboard.html")));
    let pages = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("login.html")));

    Router::new()
        .nest("/api", api)
        .route_service("/dashboard.html", dashboard)
        .fallback_service(pages)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_private_network(true),
        )
        .layer(Extension(state))
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}
