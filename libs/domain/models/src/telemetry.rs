// INICIO DEL ARCHIVO [libs/domain/models/src/telemetry.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY DOMAIN MODELS (V19.0 - PANOPTICON FRAMES)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: LOGS DE SANDBOX, MÉTRICAS Y TRAMAS WEBSOCKET
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Flujo de origen de una línea de log del contenedor.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStreamKind {
    Stdout,
    Stderr,
}

impl LogStreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// Entrada persistida de log. El texto ya viaja velado (redacción L4).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxLogEntry {
    pub id: Uuid,
    pub sandbox_id: Uuid,
    pub stream: LogStreamKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Muestra one-shot de métricas del contenedor (Runtime Adapter L3).
#[typeshare]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetrics {
    pub cpu_percent: f64,
    #[typeshare(serialized_as = "number")]
    pub memory_usage_bytes: u64,
    #[typeshare(serialized_as = "number")]
    pub memory_limit_bytes: u64,
    pub memory_percent: f64,
    #[typeshare(serialized_as = "number")]
    pub network_rx_bytes: u64,
    #[typeshare(serialized_as = "number")]
    pub network_tx_bytes: u64,
    #[typeshare(serialized_as = "number")]
    pub block_read_bytes: u64,
    #[typeshare(serialized_as = "number")]
    pub block_write_bytes: u64,
}

/// Medidores agregados del plano de control (refrescados por el daemon C8).
#[typeshare]
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformGauges {
    #[typeshare(serialized_as = "number")]
    pub sandboxes_total: u64,
    #[typeshare(serialized_as = "number")]
    pub sandboxes_pending: u64,
    #[typeshare(serialized_as = "number")]
    pub sandboxes_running: u64,
    #[typeshare(serialized_as = "number")]
    pub sandboxes_stopped: u64,
    #[typeshare(serialized_as = "number")]
    pub sandboxes_error: u64,
    #[typeshare(serialized_as = "number")]
    pub sandboxes_expired: u64,
    #[typeshare(serialized_as = "number")]
    pub environments_total: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

// --- ESTRATO DE TRAMAS WEBSOCKET (ENLACE NEURAL L5) ---

/// Trama servidor → cliente del endpoint de logs.
#[typeshare]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum LogSocketFrame {
    /// Estado vigente del sandbox al conectar o al mutar.
    Status { status: String, phase: String },
    /// Línea de log (replay histórico o cola viva).
    Log(SandboxLogEntry),
    /// Fallo terminal del enlace.
    Error { message: String },
}

/// Trama de control cliente → servidor del endpoint de terminal.
/// Todo texto que no parsee cae como bytes de entrada al PTY.
#[typeshare]
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TerminalControlFrame {
    Resize { cols: u16, rows: u16 },
    Ping,
}
// FIN DEL ARCHIVO [libs/domain/models/src/telemetry.rs]
