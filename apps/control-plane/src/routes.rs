// INICIO DEL ARCHIVO [apps/control-plane/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V16.0 - CONTROL PLANE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA DE RUTAS REST, WS Y PERÍMETRO DE SALUD
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología soporta:
 * 1. REST de recursos (Environments / Sandboxes / Cuentas).
 * 2. WebSockets (logs vivos + terminal PTY) con auto-autenticación
 *    vía query param `token`.
 * 3. Perímetro de salud sin credenciales.
 * =================================================================
 */

use crate::handlers::auth::AuthHandler;
use crate::handlers::environment::EnvironmentHandler;
use crate::handlers::health::HealthHandler;
use crate::handlers::sandbox::SandboxHandler;
use crate::handlers::stream;
use crate::middleware::auth_gate;
use crate::state::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

pub fn create_control_plane_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el Dashboard y herramientas de Ops
    let mut network_security_shield = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    network_security_shield = match application_shared_state
        .config
        .cors_allowed_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(allowed_origin) => network_security_shield.allow_origin(allowed_origin),
        None => {
            warn!("🌐 [CORS]: No allowed origin configured; perimeter open to Any.");
            network_security_shield.allow_origin(Any)
        }
    };

    // ESTRATO DE CUENTAS Y GOBERNANZA (Autenticado)
    let account_stratum = Router::new()
        .route("/auth/me", get(AuthHandler::handle_me))
        .route(
            "/auth/api-keys",
            get(AuthHandler::handle_list_api_keys).post(AuthHandler::handle_create_api_key),
        )
        .route("/auth/api-keys/:id", delete(AuthHandler::handle_revoke_api_key))
        .route("/audit", get(AuthHandler::handle_list_audit));

    // ESTRATO DE PLANTILLAS (Environments)
    let environment_stratum = Router::new()
        .route(
            "/environments",
            get(EnvironmentHandler::handle_list).post(EnvironmentHandler::handle_create),
        )
        .route(
            "/environments/:id",
            get(EnvironmentHandler::handle_get)
                .put(EnvironmentHandler::handle_update)
                .delete(EnvironmentHandler::handle_delete),
        )
        .route("/environments/:id/secrets", post(EnvironmentHandler::handle_set_secret))
        .route(
            "/environments/:id/secrets/:key",
            delete(EnvironmentHandler::handle_delete_secret),
        );

    // ESTRATO DE INSTANCIAS (Sandboxes)
    let sandbox_stratum = Router::new()
        .route("/sandboxes", get(SandboxHandler::handle_list).post(SandboxHandler::handle_create))
        .route(
            "/sandboxes/:id",
            get(SandboxHandler::handle_get).delete(SandboxHandler::handle_destroy),
        )
        .route("/sandboxes/:id/start", post(SandboxHandler::handle_start))
        .route("/sandboxes/:id/stop", post(SandboxHandler::handle_stop))
        .route("/sandboxes/:id/restart", post(SandboxHandler::handle_restart))
        .route("/sandboxes/:id/replicate", post(SandboxHandler::handle_replicate))
        .route("/sandboxes/:id/logs", get(SandboxHandler::handle_logs))
        .route("/sandboxes/:id/metrics", get(SandboxHandler::handle_metrics))
        .route("/sandboxes/:id/exec", post(SandboxHandler::handle_exec));

    // Escudo de autenticación sobre los estratos de recursos
    let authenticated_strata = account_stratum
        .merge(environment_stratum)
        .merge(sandbox_stratum)
        .layer(middleware::from_fn_with_state(application_shared_state.clone(), auth_gate));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        // Perímetro de salud (sin credenciales)
        .route("/health", get(HealthHandler::handle_health))
        .route("/health/live", get(HealthHandler::handle_live))
        .route("/health/ready", get(HealthHandler::handle_ready))
        // Génesis de cuenta (escudo de intentos por IP dentro del handler)
        .route("/auth/signup", post(AuthHandler::handle_signup))
        .route("/auth/login", post(AuthHandler::handle_login))
        // Singularidad Activa: enlaces WebSocket (auto-autenticación)
        .route("/ws/sandboxes/:id/logs", get(stream::establish_log_stream))
        .route("/ws/sandboxes/:id/terminal", get(stream::establish_terminal_stream))
        .merge(authenticated_strata)
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/control-plane/src/routes.rs]
