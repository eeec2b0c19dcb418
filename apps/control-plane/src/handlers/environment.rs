// INICIO DEL ARCHIVO [apps/control-plane/src/handlers/environment.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT HANDLER (V11.0 - TEMPLATE PERIMETER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ADAPTACIÓN HTTP DEL SERVICIO DE PLANTILLAS
 * =================================================================
 */

use crate::errors::{envelope_ok, ApiError};
use crate::middleware::AuthenticatedIdentity;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use crisol_domain_models::{CreateEnvironmentPayload, SetSecretPayload, UpdateEnvironmentPayload};
use tracing::instrument;
use uuid::Uuid;

pub struct EnvironmentHandler;

impl EnvironmentHandler {
    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_create(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Json(payload): Json<CreateEnvironmentPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let response =
            application_state.environment_service.create_environment(&identity, payload).await?;
        Ok(envelope_ok(response))
    }

    pub async fn handle_list(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let responses = application_state.environment_service.list_environments(&identity).await?;
        Ok(envelope_ok(responses))
    }

    pub async fn handle_get(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(environment_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let response = application_state
            .environment_service
            .get_environment(&identity, environment_id)
            .await?;
        Ok(envelope_ok(response))
    }

    /// PUT: acuña la siguiente versión inmutable del linaje.
    #[instrument(skip(application_state, identity, patch))]
    pub async fn handle_update(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(environment_id): Path<Uuid>,
        Json(patch): Json<UpdateEnvironmentPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let response = application_state
            .environment_service
            .update_environment(&identity, environment_id, patch)
            .await?;
        Ok(envelope_ok(response))
    }

    #[instrument(skip(application_state, identity))]
    pub async fn handle_delete(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(environment_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        application_state.environment_service.delete_environment(&identity, environment_id).await?;
        Ok(envelope_ok(serde_json::json!({ "deleted": true })))
    }

    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_set_secret(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(environment_id): Path<Uuid>,
        Json(payload): Json<SetSecretPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        application_state
            .environment_service
            .set_secret(&identity, environment_id, payload)
            .await?;
        Ok(envelope_ok(serde_json::json!({ "sealed": true })))
    }

    #[instrument(skip(application_state, identity))]
    pub async fn handle_delete_secret(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path((environment_id, secret_key)): Path<(Uuid, String)>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        application_state
            .environment_service
            .delete_secret(&identity, environment_id, &secret_key)
            .await?;
        Ok(envelope_ok(serde_json::json!({ "deleted": true })))
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/handlers/environment.rs]
