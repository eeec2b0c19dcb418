// INICIO DEL ARCHIVO [apps/control-plane/src/services/gauges.rs]
/*!
 * =================================================================
 * APARATO: PLATFORM GAUGES REFRESHER (V6.0 - CENSUS PULSE)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: REFRESCO PERIÓDICO DE MEDIDORES DEL PLANO
 *
 * VISION HIPER-HOLÍSTICA:
 * Cada 30 segundos censa el Ledger (sandboxes por estado, plantillas)
 * y publica la instantánea en RAM para el perímetro /health.
 * =================================================================
 */

use chrono::Utc;
use crisol_domain_models::PlatformGauges;
use crisol_infra_db::repositories::{EnvironmentRepository, SandboxRepository};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Cadencia soberana del pulso de medidores.
const GAUGE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Despliega el daemon de medidores y retorna su mando de aborto.
pub fn spawn_gauges_refresher(
    sandbox_repository: Arc<SandboxRepository>,
    environment_repository: Arc<EnvironmentRepository>,
    shared_gauges: Arc<RwLock<PlatformGauges>>,
) -> AbortHandle {
    let daemon_handle = tokio::spawn(async move {
        let mut refresh_ticker = interval(GAUGE_REFRESH_INTERVAL);
        info!("📊 [GAUGES_ACTIVE]: Census pulse daemon initiated.");

        loop {
            refresh_ticker.tick().await;

            let status_census = match sandbox_repository.count_by_status().await {
                Ok(census) => census,
                Err(ledger_fault) => {
                    warn!("⚠️ [GAUGES]: Sandbox census failed: {ledger_fault}");
                    continue;
                }
            };
            let environments_total = match environment_repository.count_all().await {
                Ok(count) => count,
                Err(ledger_fault) => {
                    warn!("⚠️ [GAUGES]: Environment census failed: {ledger_fault}");
                    continue;
                }
            };

            let fetch = |label: &str| status_census.get(label).copied().unwrap_or(0);
            let refreshed = PlatformGauges {
                sandboxes_total: status_census.values().sum(),
                sandboxes_pending: fetch("pending"),
                sandboxes_running: fetch("running"),
                sandboxes_stopped: fetch("stopped"),
                sandboxes_error: fetch("error"),
                sandboxes_expired: fetch("expired"),
                environments_total,
                refreshed_at: Some(Utc::now()),
            };

            match shared_gauges.write() {
                Ok(mut gauges_guard) => *gauges_guard = refreshed,
                Err(poison_fault) => {
                    warn!("⚠️ [GAUGES]: Shared gauge lock poisoned: {poison_fault}");
                }
            }
            debug!("📊 [GAUGES]: Census pulse refreshed.");
        }
    });

    daemon_handle.abort_handle()
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/gauges.rs]
