// INICIO DEL ARCHIVO [libs/domain/models/src/environment.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT DOMAIN MODELS (V22.0 - IMMUTABLE LINEAGE)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: PLANTILLAS DE CONTENEDOR Y VERSIONADO MONÓTONO
 *
 * VISION HIPER-HOLÍSTICA:
 * Un Environment es una plantilla nombrada por tenant con una secuencia
 * lineal de versiones inmutables. 'update' jamás muta una versión:
 * acuña la siguiente (version + 1) y gira 'current_version_id'.
 *
 * # Mathematical Proof (Monotone Lineage):
 * La unicidad (environment_id, version) junto al acuñado 'prev + 1'
 * bajo candado de fila garantiza una cadena estrictamente creciente
 * sin huecos observables por el tenant.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use typeshare::typeshare;
use uuid::Uuid;

/// Mapeo de puerto contenedor → host (host restringido a 1024..65535).
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container: u16,
    pub host: u16,
}

/// Entidad raíz de la plantilla. `(user_id, name)` es único por tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Siempre referencia una versión del MISMO environment.
    pub current_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Instantánea inmutable de configuración. Exactamente uno de
/// `image`/`dockerfile` está poblado; los secretos son criptogramas opacos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentVersion {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub version: u32,
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    pub build_files: HashMap<String, String>,
    pub command: Option<Vec<String>>,
    pub cpu: f64,
    pub memory_mb: u32,
    pub ports: Vec<PortMapping>,
    pub env: HashMap<String, String>,
    /// Clave → criptograma AES-256-GCM sellado por la Bóveda L1.
    pub secrets_encrypted: HashMap<String, String>,
    pub mounts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// --- ESTRATO DE PAYLOADS DE MANDO (DTOs) ---

#[typeshare]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironmentPayload {
    pub name: String,
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub build_files: HashMap<String, String>,
    pub command: Option<Vec<String>>,
    pub cpu: Option<f64>,
    pub memory: Option<u32>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub mounts: Vec<String>,
}

/// Parche de actualización: los campos ausentes heredan de la versión actual.
#[typeshare]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvironmentPayload {
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    pub build_files: Option<HashMap<String, String>>,
    pub command: Option<Vec<String>>,
    pub cpu: Option<f64>,
    pub memory: Option<u32>,
    pub ports: Option<Vec<PortMapping>>,
    pub env: Option<HashMap<String, String>>,
    pub mounts: Option<Vec<String>>,
}

#[typeshare]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSecretPayload {
    pub key: String,
    pub value: String,
}

/// Proyección de secreto hacia la API: la clave existe, el valor jamás.
#[typeshare]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedSecret {
    pub key: String,
    pub redacted: bool,
}

/// Respuesta compuesta Environment + versión vigente con secretos velados.
#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResponse {
    pub id: Uuid,
    pub name: String,
    pub version: u32,
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    pub command: Option<Vec<String>>,
    pub cpu: f64,
    pub memory: u32,
    pub ports: Vec<PortMapping>,
    pub env: HashMap<String, String>,
    pub secrets: Vec<RedactedSecret>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvironmentResponse {
    /**
     * Compone la proyección pública velando el mapa de secretos.
     * El material cifrado jamás cruza este constructor.
     */
    pub fn compose(environment: &Environment, current_version: &EnvironmentVersion) -> Self {
        let mut veiled_secrets: Vec<RedactedSecret> = current_version
            .secrets_encrypted
            .keys()
            .map(|key| RedactedSecret { key: key.clone(), redacted: true })
            .collect();
        veiled_secrets.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            id: environment.id,
            name: environment.name.clone(),
            version: current_version.version,
            image: current_version.image.clone(),
            dockerfile: current_version.dockerfile.clone(),
            command: current_version.command.clone(),
            cpu: current_version.cpu,
            memory: current_version.memory_mb,
            ports: current_version.ports.clone(),
            env: current_version.env.clone(),
            secrets: veiled_secrets,
            created_at: environment.created_at,
            updated_at: environment.updated_at,
        }
    }
}
// FIN DEL ARCHIVO [libs/domain/models/src/environment.rs]
