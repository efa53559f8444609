use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use super::state::AppState;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    providers: BTreeMap<&'static str, &'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn provider_report(state: &AppState) -> BTreeMap<&'static str, &'static str> {
    let config = state.config();
    let presence = |configured: bool| if configured { "configured" } else { "missing" };
    BTreeMap::from([
        ("image", presence(config.image.is_configured())),
        ("video", presence(config.video.is_configured())),
        ("transcription", presence(config.transcription.is_configured())),
        (
            "email",
            presence(config.email.credential().is_ok() && config.email.recipient().is_ok()),
        ),
        ("datastore", presence(config.datastore.is_configured())),
    ])
}

/// Health check endpoint
///
/// Always 200 while the process is serving; reports which external
/// providers have credentials.
#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        providers: provider_report(&state),
        error: None,
    })
}

/// Readiness check endpoint
///
/// 503 while any generation or transcription credential is missing, so the
/// instance is kept out of rotation until it can serve those routes.
#[get("/ready")]
async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let providers = provider_report(&state);
    let missing: Vec<&str> = ["image", "video", "transcription"]
        .into_iter()
        .filter(|name| providers.get(name) == Some(&"missing"))
        .collect();

    if missing.is_empty() {
        return HttpResponse::Ok().json(HealthResponse {
            status: "ready".to_string(),
            providers,
            error: None,
        });
    }

    warn!("Readiness check failed: missing credentials for {:?}", missing);
    HttpResponse::ServiceUnavailable().json(HealthResponse {
        status: "not_ready".to_string(),
        providers,
        error: Some(format!("Missing provider credentials: {}", missing.join(", "))),
    })
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "alive" }))
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
