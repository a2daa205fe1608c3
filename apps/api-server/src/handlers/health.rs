//! Health check endpoint.

use actix_web::{HttpResponse, web};

use blogicum_shared::dto::HealthResponse;

use crate::state::AppState;

/// GET /health
///
/// Reports `degraded` with 503 when the configured database does not answer.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = database_reachable(&state).await;

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[cfg(feature = "postgres")]
async fn database_reachable(state: &AppState) -> bool {
    let Some(db) = &state.db else {
        return true;
    };
    match db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn database_reachable(_state: &AppState) -> bool {
    true
}
