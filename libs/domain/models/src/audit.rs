// INICIO DEL ARCHIVO [libs/domain/models/src/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT DOMAIN MODELS (V9.0 - APPEND ONLY)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: RASTRO FORENSE INMUTABLE DE ACCIONES DE TENANT
 *
 * VISION HIPER-HOLÍSTICA:
 * El rastro es append-only y de solo lectura desde cualquier servicio;
 * su escritura jamás bloquea ni colapsa una operación de negocio.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Acciones auditables del plano de control.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserSignup,
    UserLogin,
    ApiKeyCreated,
    ApiKeyRevoked,
    EnvironmentCreated,
    EnvironmentUpdated,
    EnvironmentDeleted,
    SecretSet,
    SecretDeleted,
    SandboxCreated,
    SandboxStarted,
    SandboxStopped,
    SandboxRestarted,
    SandboxReplicated,
    SandboxDestroyed,
    SandboxExpired,
    SandboxProvisionFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSignup => "user.signup",
            Self::UserLogin => "user.login",
            Self::ApiKeyCreated => "api_key.created",
            Self::ApiKeyRevoked => "api_key.revoked",
            Self::EnvironmentCreated => "environment.created",
            Self::EnvironmentUpdated => "environment.updated",
            Self::EnvironmentDeleted => "environment.deleted",
            Self::SecretSet => "environment.secret_set",
            Self::SecretDeleted => "environment.secret_deleted",
            Self::SandboxCreated => "sandbox.created",
            Self::SandboxStarted => "sandbox.started",
            Self::SandboxStopped => "sandbox.stopped",
            Self::SandboxRestarted => "sandbox.restarted",
            Self::SandboxReplicated => "sandbox.replicated",
            Self::SandboxDestroyed => "sandbox.destroyed",
            Self::SandboxExpired => "sandbox.expired",
            Self::SandboxProvisionFailed => "sandbox.provision_failed",
        }
    }
}

/// Entrada inmutable del rastro forense.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub metadata: serde_json::Value,
    pub client_ip: Option<String>,
    pub client_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
// FIN DEL ARCHIVO [libs/domain/models/src/audit.rs]
