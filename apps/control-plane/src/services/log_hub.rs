// INICIO DEL ARCHIVO [apps/control-plane/src/services/log_hub.rs]
/*!
 * =================================================================
 * APARATO: LOG FAN-OUT HUB (V9.0 - BROKER PER SANDBOX)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN DE LOGS VIVOS A VISORES WEBSOCKET
 *
 * VISION HIPER-HOLÍSTICA:
 * Broker por sandbox sobre canales broadcast: el colector es el único
 * productor (escritura única al Ledger) y cada visor sostiene su
 * receptor independiente. La caída de un visor jamás perturba a los
 * demás; el rezago (Lagged) es la materialización del backpressure
 * acotado y cierra únicamente al visor rezagado.
 *
 * # Mathematical Proof (Exactly-Once Fan-Out):
 * broadcast entrega cada evento una vez por receptor desde su punto
 * de suscripción; la persistencia ocurre aguas arriba en el colector,
 * por lo que la copia almacenada se escribe exactamente una vez.
 * =================================================================
 */

use crisol_domain_models::SandboxLogEntry;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, error};
use uuid::Uuid;

/// Capacidad por visor: bound del backpressure (eventos retenidos).
const VIEWER_CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
pub struct LogHub {
    /// sandbox_id → transmisor del broker de ese sandbox.
    sandbox_brokers: RwLock<HashMap<Uuid, broadcast::Sender<SandboxLogEntry>>>,
}

impl LogHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suscribe un visor al broker del sandbox (creándolo si no existe).
    pub fn subscribe(&self, sandbox_id: Uuid) -> broadcast::Receiver<SandboxLogEntry> {
        let mut brokers_guard = match self.sandbox_brokers.write() {
            Ok(guard) => guard,
            Err(poison_fault) => {
                error!("💀 [LOG_HUB]: Broker census lock poisoned: {poison_fault}");
                poison_fault.into_inner()
            }
        };

        brokers_guard
            .entry(sandbox_id)
            .or_insert_with(|| broadcast::channel(VIEWER_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Difunde un evento ya velado a todos los visores del sandbox.
    pub fn publish(&self, entry: SandboxLogEntry) {
        let brokers_guard = match self.sandbox_brokers.read() {
            Ok(guard) => guard,
            Err(poison_fault) => poison_fault.into_inner(),
        };

        if let Some(broker) = brokers_guard.get(&entry.sandbox_id) {
            // Sin suscriptores el envío falla en silencio nominal
            let _ = broker.send(entry);
        }
    }

    /// Retira el broker de un sandbox incinerado (los visores cierran).
    pub fn retire(&self, sandbox_id: Uuid) {
        let mut brokers_guard = match self.sandbox_brokers.write() {
            Ok(guard) => guard,
            Err(poison_fault) => poison_fault.into_inner(),
        };
        if brokers_guard.remove(&sandbox_id).is_some() {
            debug!("🔌 [LOG_HUB]: Broker retired for sandbox {sandbox_id}.");
        }
    }

    /// Retira todos los brokers (apagado C9: los visores reciben cierre).
    pub fn retire_all(&self) {
        let mut brokers_guard = match self.sandbox_brokers.write() {
            Ok(guard) => guard,
            Err(poison_fault) => poison_fault.into_inner(),
        };
        brokers_guard.clear();
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/log_hub.rs]
