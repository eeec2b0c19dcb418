// INICIO DEL ARCHIVO [libs/infra/runtime/src/spec.rs]
/*!
 * =================================================================
 * APARATO: RUNTIME CONTRACT TYPES (V9.0 - ISOLATION PROFILE)
 * CLASIFICACIÓN: INFRASTRUCTURE CONTRACTS (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATOS DE CREACIÓN, SONDA Y EVENTOS DE LOG
 *
 * VISION HIPER-HOLÍSTICA:
 * El perfil de aislamiento es un invariante duro del aparato: cero
 * montajes del host, red bridge, no-new-privileges y capacidades
 * recortadas a {CHOWN, SETUID, SETGID}.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use crisol_domain_models::{LogStreamKind, PortMapping};
use std::collections::HashMap;

/// Periodo CFS soberano del planificador (microsegundos).
pub const CPU_PERIOD_MICROSECONDS: i64 = 100_000;
/// Etiqueta de propiedad de plataforma: enumeración en el apagado C9.
pub const LABEL_PLATFORM: &str = "sandbox-platform";
/// Etiqueta portadora del identificador de sandbox.
pub const LABEL_SANDBOX_ID: &str = "sandbox-id";
/// Etiqueta portadora del identificador de tenant.
pub const LABEL_USER_ID: &str = "user-id";
/// Capacidades conservadas tras el recorte total.
pub const RETAINED_CAPABILITIES: &[&str] = &["CHOWN", "SETUID", "SETGID"];

/// Contrato de creación de contenedor construido por el provisioner L4.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Option<Vec<String>>,
    /// Vector de entorno ya fusionado (versión ⊕ secretos ⊕ overrides).
    pub env: Vec<String>,
    pub ports: Vec<PortMapping>,
    pub cpu: f64,
    pub memory_mb: u32,
    pub labels: HashMap<String, String>,
    /// Rutas tmpfs internas; los montajes del host están vetados por invariante.
    pub mounts: Vec<String>,
}

impl ContainerSpec {
    /// Cuota CFS derivada: floor(cpu × periodo).
    pub fn cpu_quota_microseconds(&self) -> i64 {
        (self.cpu * CPU_PERIOD_MICROSECONDS as f64).floor() as i64
    }

    /// Límite de memoria en bytes (mb × 1.048.576).
    pub fn memory_limit_bytes(&self) -> i64 {
        self.memory_mb as i64 * 1_048_576
    }
}

/// Estado físico reportado por el motor en una inspección puntual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

/// Sonda de inspección: `None` a nivel de adaptador cuando no existe.
#[derive(Debug, Clone, Copy)]
pub struct ContainerProbe {
    pub status: ProbeStatus,
    pub running: bool,
    pub exit_code: Option<i64>,
}

/// Evento decodificado del stream multiplexado de logs del motor.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub stream: LogStreamKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Desenlace de una ejecución batch dentro del contenedor.
#[derive(Debug, Clone)]
pub struct BatchExecOutcome {
    pub exit_code: i64,
    pub combined_output: String,
}
// FIN DEL ARCHIVO [libs/infra/runtime/src/spec.rs]
