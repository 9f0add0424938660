pub mod handlers;

pub use handlers::*;

use axum::{routing::get, Router};
use tower::ServiceBuilder;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/bill", get(get_bill))
        .route("/api/bill/download", get(download_bill))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
