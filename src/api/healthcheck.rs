use axum::extract::State;
use axum::http::StatusCode;

use crate::context::AppState;

pub async fn handle(State(app): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&app.pool).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            log::warn!("healthcheck failed: {err:#}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
