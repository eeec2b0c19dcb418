// INICIO DEL ARCHIVO [apps/control-plane/src/services/environments.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT SERVICE (V17.0 - TEMPLATE GOVERNANCE)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: PLANTILLAS, LINAJE DE VERSIONES Y SECRETOS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DUAL SOURCE: Exactamente uno de image/dockerfile por versión.
 * 2. VEILED PROJECTION: Las respuestas presentan los secretos como
 *    {key, redacted: true}; el claro solo fluye al provisioner.
 * 3. LIVE GUARD: La incineración se veta mientras existan sandboxes
 *    vivos anclados a la plantilla.
 * =================================================================
 */

use crate::errors::ApiError;
use crate::middleware::AuthenticatedIdentity;
use crisol_core_vault::SecretsVault;
use crisol_domain_models::{
    limits, validation, AuditAction, CreateEnvironmentPayload, EnvironmentResponse,
    SetSecretPayload, UpdateEnvironmentPayload,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxRepository,
};
use crisol_infra_runtime::ContainerRuntime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct EnvironmentService {
    environment_repository: Arc<EnvironmentRepository>,
    sandbox_repository: Arc<SandboxRepository>,
    audit_repository: Arc<AuditRepository>,
    secrets_vault: Arc<SecretsVault>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl EnvironmentService {
    pub fn new(
        environment_repository: Arc<EnvironmentRepository>,
        sandbox_repository: Arc<SandboxRepository>,
        audit_repository: Arc<AuditRepository>,
        secrets_vault: Arc<SecretsVault>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            environment_repository,
            sandbox_repository,
            audit_repository,
            secrets_vault,
            runtime,
        }
    }

    /**
     * Génesis de plantilla: cuota ≤ 5, fuente dual exclusiva, versión 1.
     */
    #[instrument(skip(self, identity, payload), fields(tenant = %identity.user_id, name = %payload.name))]
    pub async fn create_environment(
        &self,
        identity: &AuthenticatedIdentity,
        payload: CreateEnvironmentPayload,
    ) -> Result<EnvironmentResponse, ApiError> {
        validation::validate_resource_name(&payload.name)?;
        validate_image_source(&payload.image, &payload.dockerfile)?;

        let cpu = payload.cpu.unwrap_or(validation::CPU_DEFAULT);
        validation::validate_cpu_allocation(cpu)?;
        let memory_mb = payload.memory.unwrap_or(validation::MEMORY_MB_DEFAULT);
        validation::validate_memory_allocation(memory_mb)?;
        validation::validate_port_mappings(&payload.ports)?;

        // Cuota soberana de plantillas por tenant
        let template_census = self.environment_repository.count_for_user(identity.user_id).await?;
        if template_census >= limits::MAX_ENVIRONMENTS_PER_USER {
            return Err(ApiError::QuotaExceeded(format!(
                "environment quota reached ({} templates)",
                limits::MAX_ENVIRONMENTS_PER_USER
            )));
        }

        let (environment, version) = self
            .environment_repository
            .insert_environment_with_version(
                identity.user_id,
                &payload,
                cpu,
                memory_mb,
                &HashMap::new(),
            )
            .await
            .map_err(|fault| match fault {
                crisol_infra_db::DbError::Conflict(_) => {
                    ApiError::Conflict(format!("environment name '{}' already exists", payload.name))
                }
                other => other.into(),
            })?;

        self.audit(
            identity,
            AuditAction::EnvironmentCreated,
            &environment.id.to_string(),
            serde_json::json!({ "name": environment.name }),
        )
        .await;

        Ok(EnvironmentResponse::compose(&environment, &version))
    }

    /**
     * Actualización append-only: acuña versión + 1 y gira el puntero.
     * Ninguna versión previa se muta jamás.
     */
    #[instrument(skip(self, identity, patch))]
    pub async fn update_environment(
        &self,
        identity: &AuthenticatedIdentity,
        environment_id: Uuid,
        patch: UpdateEnvironmentPayload,
    ) -> Result<EnvironmentResponse, ApiError> {
        if let Some(cpu) = patch.cpu {
            validation::validate_cpu_allocation(cpu)?;
        }
        if let Some(memory_mb) = patch.memory {
            validation::validate_memory_allocation(memory_mb)?;
        }
        if let Some(image) = &patch.image {
            validation::validate_image_reference(image)?;
        }
        if let Some(ports) = &patch.ports {
            validation::validate_port_mappings(ports)?;
        }

        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let minted_version =
            self.environment_repository.mint_next_version(environment.id, &patch).await?;

        self.audit(
            identity,
            AuditAction::EnvironmentUpdated,
            &environment.id.to_string(),
            serde_json::json!({ "version": minted_version.version }),
        )
        .await;

        // Relectura: el puntero y updated_at giraron en la transacción
        let refreshed = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(EnvironmentResponse::compose(&refreshed, &minted_version))
    }

    pub async fn list_environments(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> Result<Vec<EnvironmentResponse>, ApiError> {
        let environments = self.environment_repository.list_for_user(identity.user_id).await?;

        let mut responses = Vec::with_capacity(environments.len());
        for environment in &environments {
            if let Some(current_version) =
                self.environment_repository.current_version(environment).await?
            {
                responses.push(EnvironmentResponse::compose(environment, &current_version));
            }
        }
        Ok(responses)
    }

    pub async fn get_environment(
        &self,
        identity: &AuthenticatedIdentity,
        environment_id: Uuid,
    ) -> Result<EnvironmentResponse, ApiError> {
        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let current_version = self
            .environment_repository
            .current_version(&environment)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(EnvironmentResponse::compose(&environment, &current_version))
    }

    /**
     * Incineración: vetada mientras existan sandboxes vivos; los
     * contenedores residuales de filas terminales se remueven antes.
     */
    #[instrument(skip(self, identity))]
    pub async fn delete_environment(
        &self,
        identity: &AuthenticatedIdentity,
        environment_id: Uuid,
    ) -> Result<(), ApiError> {
        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let live_census =
            self.sandbox_repository.count_live_for_environment(environment.id).await?;
        if live_census > 0 {
            return Err(ApiError::Conflict(format!(
                "{live_census} live sandboxes still anchored to this environment"
            )));
        }

        // Contenedores residuales de filas terminales (stopped/error)
        let anchored_rows = self
            .sandbox_repository
            .list_for_user(identity.user_id, None, Some(environment.id))
            .await?;
        for terminal_row in anchored_rows {
            if let Some(container_ref) = &terminal_row.container_ref {
                if let Err(engine_fault) = self.runtime.remove_container(container_ref).await {
                    warn!("⚠️ [ENV_PURGE]: Residual container removal incomplete: {engine_fault}");
                }
            }
        }

        let existed =
            self.environment_repository.delete_environment(identity.user_id, environment.id).await?;
        if !existed {
            return Err(ApiError::NotFound);
        }

        self.audit(
            identity,
            AuditAction::EnvironmentDeleted,
            &environment.id.to_string(),
            serde_json::json!({ "name": environment.name }),
        )
        .await;

        info!("🗑️ [ENV_SERVICE]: Environment {} incinerated.", environment.id);
        Ok(())
    }

    // --- ESTRATO DE SECRETOS (BÓVEDA L1) ---

    /**
     * Sella un secreto sobre la versión VIGENTE (metadato tardío, D1).
     */
    #[instrument(skip(self, identity, payload), fields(key = %payload.key))]
    pub async fn set_secret(
        &self,
        identity: &AuthenticatedIdentity,
        environment_id: Uuid,
        payload: SetSecretPayload,
    ) -> Result<(), ApiError> {
        validation::validate_secret_key(&payload.key)?;

        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let current_version = self
            .environment_repository
            .current_version(&environment)
            .await?
            .ok_or(ApiError::NotFound)?;

        let mut sealed_secrets = current_version.secrets_encrypted.clone();
        sealed_secrets.insert(payload.key.clone(), self.secrets_vault.encrypt(&payload.value)?);

        self.environment_repository.set_current_secrets(environment.id, &sealed_secrets).await?;

        self.audit(
            identity,
            AuditAction::SecretSet,
            &environment.id.to_string(),
            serde_json::json!({ "key": payload.key }),
        )
        .await;
        Ok(())
    }

    /// Remueve una clave del mapa sellado de la versión vigente.
    #[instrument(skip(self, identity))]
    pub async fn delete_secret(
        &self,
        identity: &AuthenticatedIdentity,
        environment_id: Uuid,
        secret_key: &str,
    ) -> Result<(), ApiError> {
        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let current_version = self
            .environment_repository
            .current_version(&environment)
            .await?
            .ok_or(ApiError::NotFound)?;

        let mut sealed_secrets = current_version.secrets_encrypted.clone();
        if sealed_secrets.remove(secret_key).is_none() {
            return Err(ApiError::NotFound);
        }

        self.environment_repository.set_current_secrets(environment.id, &sealed_secrets).await?;

        self.audit(
            identity,
            AuditAction::SecretDeleted,
            &environment.id.to_string(),
            serde_json::json!({ "key": secret_key }),
        )
        .await;
        Ok(())
    }

    // --- ESTRATO DE RASTRO (PRIVATE SSoT) ---

    async fn audit(
        &self,
        identity: &AuthenticatedIdentity,
        action: AuditAction,
        resource_id: &str,
        metadata: serde_json::Value,
    ) {
        if let Err(audit_fault) = self
            .audit_repository
            .append(
                identity.user_id,
                action,
                "environment",
                resource_id,
                metadata,
                identity.client_ip.as_deref(),
                identity.client_agent.as_deref(),
            )
            .await
        {
            warn!("⚠️ [AUDIT_SKIP]: Trail append failed: {audit_fault}");
        }
    }
}

/// Fuente dual exclusiva: exactamente uno de image/dockerfile.
fn validate_image_source(
    image: &Option<String>,
    dockerfile: &Option<String>,
) -> Result<(), ApiError> {
    match (image, dockerfile) {
        (Some(image_reference), None) => {
            validation::validate_image_reference(image_reference)?;
            Ok(())
        }
        (None, Some(dockerfile_body)) if !dockerfile_body.trim().is_empty() => Ok(()),
        (Some(_), Some(_)) => Err(ApiError::Validation(
            "exactly one of image/dockerfile must be provided, not both".into(),
        )),
        _ => Err(ApiError::Validation(
            "exactly one of image/dockerfile must be provided".into(),
        )),
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/environments.rs]
