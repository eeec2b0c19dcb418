// INICIO DEL ARCHIVO [libs/domain/models/src/sandbox.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX DOMAIN MODELS (V31.0 - LIFECYCLE SOVEREIGN)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: MÁQUINA DE ESTADOS Y CONTRATOS DEL CICLO DE VIDA
 *
 * VISION HIPER-HOLÍSTICA:
 * El par (Status, Phase) describe coordenadas ortogonales: Status es
 * el estado grueso visible al tenant; Phase la sub-fase fina de
 * aprovisionamiento. La tabla de transiciones legales vive aquí como
 * función pura, consumida por el servicio L4 y por el SQL guardado L3.
 *
 * # Mathematical Proof (Legality Closure):
 * 'can_transition' es el cierre exacto de la tabla del ciclo de vida;
 * toda transición observada fuera de su dominio es, por definición,
 * un defecto certificable por el Proving Grounds.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use typeshare::typeshare;
use uuid::Uuid;

use crate::environment::PortMapping;
use crate::telemetry::SandboxLogEntry;

/// Estado grueso visible al tenant.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    Pending,
    Running,
    Stopped,
    Error,
    Expired,
}

impl SandboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            "error" => Some(Self::Error),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Estados terminales previos a la destrucción física de la fila.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error | Self::Expired)
    }
}

/// Sub-fase fina de aprovisionamiento.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxPhase {
    Creating,
    Starting,
    Healthy,
    Stopping,
    Stopped,
    Failed,
}

impl SandboxPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "creating" => Some(Self::Creating),
            "starting" => Some(Self::Starting),
            "healthy" => Some(Self::Healthy),
            "stopping" => Some(Self::Stopping),
            "stopped" => Some(Self::Stopped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Coordenada completa (Status, Phase) del ciclo de vida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleState {
    pub status: SandboxStatus,
    pub phase: SandboxPhase,
}

impl LifecycleState {
    pub const fn new(status: SandboxStatus, phase: SandboxPhase) -> Self {
        Self { status, phase }
    }

    /// Estado inicial de toda creación: `pending/creating`.
    pub const fn initial() -> Self {
        Self::new(SandboxStatus::Pending, SandboxPhase::Creating)
    }

    /**
     * Cierre exacto de la tabla de transiciones legales.
     *
     * # Logic:
     * - pending/creating  → pending/starting | error/failed
     * - pending/starting  → running/healthy  | error/failed
     * - running/healthy   → stopped/stopped  (stop de usuario, exit)
     * - running/healthy   → error/failed     (reconciliación: runtime dead)
     * - stopped/stopped   → running/healthy  (start / restart)
     * - pending|running   → expired/stopped  (barrido TTL)
     * - La identidad (A → A) es legal: las órdenes cruzadas son no-ops.
     */
    pub fn can_transition(&self, target: &LifecycleState) -> bool {
        use SandboxPhase as P;
        use SandboxStatus as S;

        if self == target {
            return true;
        }

        let from = (self.status, self.phase);
        let to = (target.status, target.phase);

        matches!(
            (from, to),
            ((S::Pending, P::Creating), (S::Pending, P::Starting))
                | ((S::Pending, P::Creating), (S::Error, P::Failed))
                | ((S::Pending, P::Starting), (S::Running, P::Healthy))
                | ((S::Pending, P::Starting), (S::Error, P::Failed))
                | ((S::Running, P::Healthy), (S::Stopped, P::Stopped))
                | ((S::Running, P::Healthy), (S::Error, P::Failed))
                | ((S::Stopped, P::Stopped), (S::Running, P::Healthy))
                | ((S::Running, P::Healthy), (S::Expired, P::Stopped))
                | ((S::Pending, P::Creating), (S::Expired, P::Stopped))
                | ((S::Pending, P::Starting), (S::Expired, P::Stopped))
        )
    }
}

/// Instancia concreta de contenedor derivada de una versión de Environment.
/// `(user_id, environment_id, name)` es la llave de idempotencia.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sandbox {
    pub id: Uuid,
    pub user_id: Uuid,
    pub environment_id: Uuid,
    pub environment_version_id: Uuid,
    pub name: String,
    /// Nulo solo durante `pending` o con destrucción en curso.
    pub container_ref: Option<String>,
    pub status: SandboxStatus,
    pub phase: SandboxPhase,
    pub ports: Vec<PortMapping>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub provision_progress: u8,
    pub provision_status_text: String,
}

impl Sandbox {
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::new(self.status, self.phase)
    }
}

// --- ESTRATO DE PAYLOADS DE MANDO (DTOs) ---

#[typeshare]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSandboxPayload {
    pub environment_id: Uuid,
    /// Versión explícita; ausente = versión vigente del Environment.
    pub version_id: Option<Uuid>,
    pub name: Option<String>,
    pub ttl_seconds: Option<u64>,
    /// Override de puertos efectivos (ausente = puertos de la versión).
    pub ports: Option<Vec<PortMapping>>,
    /// Override de entorno, right-biased sobre versión ⊕ secretos.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for CreateSandboxPayload {
    fn default() -> Self {
        Self {
            environment_id: Uuid::nil(),
            version_id: None,
            name: None,
            ttl_seconds: None,
            ports: None,
            env: HashMap::new(),
        }
    }
}

#[typeshare]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateSandboxPayload {
    pub name: Option<String>,
    pub ports: Option<Vec<PortMapping>>,
}

#[typeshare]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommandPayload {
    pub command: Vec<String>,
}

#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommandReport {
    pub exit_code: i64,
    pub output: String,
}

/// Proyección detallada: fila + avance + cola de logs reciente.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxDetailResponse {
    #[serde(flatten)]
    pub sandbox: Sandbox,
    pub logs_preview: Vec<SandboxLogEntry>,
}
// FIN DEL ARCHIVO [libs/domain/models/src/sandbox.rs]
