// INICIO DEL ARCHIVO [apps/control-plane/src/handlers/health.rs]
/*!
 * =================================================================
 * APARATO: HEALTH PERIMETER (V7.0 - TRIPLE PROBE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SONDAS DE VIDA, PREPARACIÓN Y MEDIDORES
 * =================================================================
 */

use crate::errors::{envelope_ok, ApiError};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use crisol_domain_models::PlatformGauges;
use tracing::warn;

pub struct HealthHandler;

impl HealthHandler {
    /// GET /health: estado agregado + medidores del plano.
    pub async fn handle_health(
        State(application_state): State<AppState>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let gauges_snapshot = application_state
            .platform_gauges
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poison_fault| {
                warn!("⚠️ [HEALTH]: Gauge lock poisoned: {poison_fault}");
                PlatformGauges::default()
            });

        Ok(envelope_ok(serde_json::json!({ "status": "ok", "gauges": gauges_snapshot })))
    }

    /// GET /health/live: latido mínimo del proceso.
    pub async fn handle_live() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "success": true, "data": { "status": "alive" } }))
    }

    /**
     * GET /health/ready: sondas reales: Ledger y motor de contenedores.
     * El runtime caído se proyecta como 503.
     */
    pub async fn handle_ready(
        State(application_state): State<AppState>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        // Sonda del Ledger: una consulta trivial de ida y vuelta
        let ledger_connection = application_state
            .database_client
            .get_connection()
            .map_err(|fault| ApiError::Internal(fault.to_string()))?;
        ledger_connection
            .query("SELECT 1", ())
            .await
            .map_err(|fault| ApiError::Internal(format!("ledger probe collapsed: {fault}")))?;

        // Sonda del motor de contenedores
        application_state
            .runtime
            .ping()
            .await
            .map_err(|fault| ApiError::RuntimeUnavailable(format!("engine probe collapsed: {fault}")))?;

        Ok(envelope_ok(serde_json::json!({ "status": "ready" })))
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/handlers/health.rs]
