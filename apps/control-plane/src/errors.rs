// INICIO DEL ARCHIVO [apps/control-plane/src/errors.rs]
/*!
 * =================================================================
 * APARATO: API ERROR CATALOG (V10.0 - ENVELOPE SOVEREIGN)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS Y SOBRE DE RESPUESTA HTTP
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ENVELOPE PARITY: Toda respuesta viaja como
 *    {success, data?, error?: {code, message}}.
 * 2. TENANT OPACITY: NotFound cubre ausencia Y propiedad ajena;
 *    el catálogo jamás emite un 'Forbidden' que delate existencia.
 * 3. STATUS MAPPING: validación→400, auth→401, ausencia→404,
 *    conflicto→409, cuota/ráfaga→429, runtime caído→503, resto→500.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crisol_core_vault::VaultError;
use crisol_domain_models::ValidationViolation;
use crisol_infra_db::DbError;
use crisol_infra_runtime::RuntimeError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Recurso ausente o propiedad de otro tenant (opacidad absoluta).
    #[error("resource not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    RateLimited(String),

    /// La operación exige un sandbox en estado running.
    #[error("sandbox is not running")]
    NotRunning,

    /// La fila no tiene contenedor físico asociado.
    #[error("sandbox has no container")]
    NoContainer,

    /// El motor no pudo producir una muestra de métricas.
    #[error("metrics sample unavailable")]
    MetricsUnavailable,

    /// Fallo terminal del ciclo de vida reportado por el provisioner.
    #[error("{0}")]
    SandboxError(String),

    #[error("{0}")]
    Timeout(String),

    /// El runtime de contenedores no responde.
    #[error("{0}")]
    RuntimeUnavailable(String),

    #[error("internal fault")]
    Internal(String),
}

impl ApiError {
    /// Código externo bit-exacto del contrato §6.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::NotRunning => "NOT_RUNNING",
            Self::NoContainer => "NO_CONTAINER",
            Self::MetricsUnavailable => "METRICS_UNAVAILABLE",
            Self::SandboxError(_) => "SANDBOX_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::RuntimeUnavailable(_) => "INTERNAL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::NotRunning | Self::NoContainer => StatusCode::CONFLICT,
            Self::QuotaExceeded(_) | Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::MetricsUnavailable | Self::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SandboxError(_) | Self::Timeout(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Mensaje proyectado al perímetro (genérico ante fallos internos).
    fn public_message(&self) -> String {
        match self {
            Self::Internal(detail) => {
                error!("💀 [INTERNAL_FAULT]: {detail}");
                "internal fault".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = json!({
            "success": false,
            "error": { "code": self.code(), "message": self.public_message() }
        });
        (self.status(), Json(envelope)).into_response()
    }
}

// --- ESTRATO DE PROYECCIÓN DESDE CATÁLOGOS INFERIORES ---

impl From<DbError> for ApiError {
    fn from(database_fault: DbError) -> Self {
        match database_fault {
            DbError::NotFound => ApiError::NotFound,
            DbError::Conflict(detail) => ApiError::Conflict(detail),
            DbError::IllegalTransition => {
                ApiError::Conflict("resource state changed concurrently".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<VaultError> for ApiError {
    fn from(vault_fault: VaultError) -> Self {
        ApiError::Internal(vault_fault.to_string())
    }
}

impl From<RuntimeError> for ApiError {
    fn from(engine_fault: RuntimeError) -> Self {
        match engine_fault {
            RuntimeError::NotFound(_) => ApiError::NotFound,
            RuntimeError::Conflict(detail) => ApiError::Conflict(detail),
            RuntimeError::Unavailable(detail) => ApiError::RuntimeUnavailable(detail),
            RuntimeError::Other(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<ValidationViolation> for ApiError {
    fn from(violation: ValidationViolation) -> Self {
        ApiError::Validation(violation.0)
    }
}

/// Sobre de éxito del contrato §6: `{success: true, data}`.
pub fn envelope_ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}
// FIN DEL ARCHIVO [apps/control-plane/src/errors.rs]
