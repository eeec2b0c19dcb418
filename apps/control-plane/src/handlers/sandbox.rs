// INICIO DEL ARCHIVO [apps/control-plane/src/handlers/sandbox.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX HANDLER (V15.0 - LIFECYCLE PERIMETER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ADAPTACIÓN HTTP DEL CICLO DE VIDA DE SANDBOXES
 *
 * VISION HIPER-HOLÍSTICA:
 * La creación es asíncrona: el perímetro retorna la fila pending de
 * inmediato bajo el escudo de ráfagas de creación (10/min/tenant).
 * =================================================================
 */

use crate::errors::{envelope_ok, ApiError};
use crate::middleware::AuthenticatedIdentity;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use crisol_domain_models::{
    CreateSandboxPayload, ExecCommandPayload, ReplicateSandboxPayload, SandboxStatus,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxListQuery {
    pub status: Option<SandboxStatus>,
    pub environment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LogsTailQuery {
    pub tail: Option<u32>,
}

pub struct SandboxHandler;

impl SandboxHandler {
    /// POST /sandboxes: génesis asíncrono (respuesta pending inmediata).
    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_create(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Json(payload): Json<CreateSandboxPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        // Escudo específico de creaciones (10/min/tenant)
        let authorized = application_state.rate_limiter.check(
            &format!("sandbox-create:{}", identity.user_id),
            application_state.config.sandbox_creates_per_minute,
            60,
        );
        if !authorized {
            return Err(ApiError::RateLimited("sandbox creation rate exceeded".into()));
        }

        let sandbox =
            application_state.sandbox_service.create_sandbox(&identity, payload).await?;
        Ok(envelope_ok(sandbox))
    }

    pub async fn handle_list(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Query(filters): Query<SandboxListQuery>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let sandboxes = application_state
            .sandbox_service
            .list_sandboxes(&identity, filters.status, filters.environment_id)
            .await?;
        Ok(envelope_ok(sandboxes))
    }

    /// GET: detalle con reconciliación y cola de logs reciente.
    pub async fn handle_get(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let detail =
            application_state.sandbox_service.get_sandbox_detail(&identity, sandbox_id).await?;
        Ok(envelope_ok(detail))
    }

    #[instrument(skip(application_state, identity))]
    pub async fn handle_start(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let sandbox =
            application_state.sandbox_service.start_sandbox(&identity, sandbox_id).await?;
        Ok(envelope_ok(sandbox))
    }

    #[instrument(skip(application_state, identity))]
    pub async fn handle_stop(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let sandbox =
            application_state.sandbox_service.stop_sandbox(&identity, sandbox_id).await?;
        Ok(envelope_ok(sandbox))
    }

    #[instrument(skip(application_state, identity))]
    pub async fn handle_restart(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let sandbox =
            application_state.sandbox_service.restart_sandbox(&identity, sandbox_id).await?;
        Ok(envelope_ok(sandbox))
    }

    /// POST /sandboxes/{id}/replicate: pipeline completo con puertos frescos.
    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_replicate(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
        Json(payload): Json<ReplicateSandboxPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let replica = application_state
            .sandbox_service
            .replicate_sandbox(&identity, sandbox_id, payload)
            .await?;
        Ok(envelope_ok(replica))
    }

    /// DELETE: destrucción física; ausencia => 404 de opacidad.
    #[instrument(skip(application_state, identity))]
    pub async fn handle_destroy(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let existed =
            application_state.sandbox_service.destroy_sandbox(&identity, sandbox_id).await?;
        if !existed {
            return Err(ApiError::NotFound);
        }
        Ok(envelope_ok(serde_json::json!({ "deleted": true })))
    }

    /// GET /sandboxes/{id}/logs?tail=N: cola reciente acotada del Ledger.
    pub async fn handle_logs(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
        Query(query): Query<LogsTailQuery>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let entries = application_state
            .sandbox_service
            .recent_logs(&identity, sandbox_id, query.tail.unwrap_or(100))
            .await?;
        Ok(envelope_ok(entries))
    }

    /// GET /sandboxes/{id}/metrics: muestra one-shot del runtime.
    pub async fn handle_metrics(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let metrics =
            application_state.sandbox_service.sample_metrics(&identity, sandbox_id).await?;
        Ok(envelope_ok(metrics))
    }

    /// POST /sandboxes/{id}/exec: ejecución batch bloqueante.
    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_exec(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(sandbox_id): Path<Uuid>,
        Json(payload): Json<ExecCommandPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let report = application_state
            .sandbox_service
            .exec_command(&identity, sandbox_id, payload)
            .await?;
        Ok(envelope_ok(report))
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/handlers/sandbox.rs]
