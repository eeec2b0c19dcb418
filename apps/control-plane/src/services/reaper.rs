// INICIO DEL ARCHIVO [apps/control-plane/src/services/reaper.rs]
/*!
 * =================================================================
 * APARATO: TTL REAPER DAEMON (V13.0 - EXPIRY ENFORCER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: BARRIDO PERIÓDICO DE SANDBOXES VENCIDOS
 *
 * VISION HIPER-HOLÍSTICA:
 * Ciclo de 60 segundos sobre el Servicio de Sandboxes: las vencidas
 * se detienen y remueven con mejor esfuerzo y se sellan como
 * expired/stopped. Todo fallo se traga y el próximo ciclo reintenta.
 * =================================================================
 */

use crate::services::sandboxes::SandboxService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::interval;
use tracing::info;

/// Cadencia soberana del barrido TTL.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Despliega el daemon del barrido TTL y retorna su mando de aborto.
pub fn spawn_reaper(sandbox_service: Arc<SandboxService>) -> AbortHandle {
    let daemon_handle = tokio::spawn(async move {
        let mut sweep_ticker = interval(SWEEP_INTERVAL);
        info!("💀 [REAPER_ACTIVE]: TTL hygiene daemon initiated.");

        loop {
            sweep_ticker.tick().await;

            let sealed_count = sandbox_service.sweep_expired().await;
            if sealed_count > 0 {
                info!("💀 [REAPER_CLEANUP]: Sealed {} expired sandboxes.", sealed_count);
            }
        }
    });

    daemon_handle.abort_handle()
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/reaper.rs]
