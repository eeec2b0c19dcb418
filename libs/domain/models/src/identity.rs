// INICIO DEL ARCHIVO [libs/domain/models/src/identity.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY DOMAIN MODELS (V14.0 - TENANT SOVEREIGNTY)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: DEFINICIÓN DE TENANTS, LLAVES API Y SESIONES
 *
 * VISION HIPER-HOLÍSTICA:
 * El User es la raíz de propiedad exclusiva de todos los recursos
 * descendentes (Environments, Sandboxes, ApiKeys, Auditoría).
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Entidad soberana del tenant. El email viaja siempre case-folded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Verificador PBKDF2-HMAC-SHA256; jamás se serializa hacia la API.
    #[serde(skip_serializing)]
    pub password_verifier: String,
    pub created_at: DateTime<Utc>,
}

/// Proyección pública del tenant para respuestas de la API.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublicProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserPublicProfile {
    fn from(user: &User) -> Self {
        Self { id: user.id, email: user.email.clone(), created_at: user.created_at }
    }
}

/// Llave API de larga duración. Solo llaves no revocadas autentican.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Prefijo de búsqueda (`sk_` + 8 hex); índice de localización.
    pub prefix: String,
    /// Digest SHA-256 del secreto completo; jamás se serializa.
    #[serde(skip_serializing)]
    pub hashed_secret: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Una llave autentica únicamente mientras no exista sello de revocación.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

// --- ESTRATO DE PAYLOADS DE MANDO (DTOs) ---

#[typeshare]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    pub email: String,
    pub password: String,
}

#[typeshare]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Concesión de sesión emitida tras autenticación exitosa.
#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserPublicProfile,
}

#[typeshare]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyPayload {
    pub name: String,
}

/// Respuesta de forja de llave: el secreto completo viaja UNA sola vez.
#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}
// FIN DEL ARCHIVO [libs/domain/models/src/identity.rs]
