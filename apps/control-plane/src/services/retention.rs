// INICIO DEL ARCHIVO [apps/control-plane/src/services/retention.rs]
/*!
 * =================================================================
 * APARATO: RETENTION CLEANER DAEMON (V8.0 - AGE HORIZON)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PODA DIARIA DE LOGS Y RASTRO POR ANTIGÜEDAD
 *
 * VISION HIPER-HOLÍSTICA:
 * Ciclo de 24 horas: logs de sandbox más viejos que R días (7) y
 * entradas de auditoría más viejas que 90 días se incineran. El
 * daemon es idempotente y traga sus propios fallos.
 * =================================================================
 */

use crate::config::ControlPlaneConfig;
use chrono::{Duration as ChronoDuration, Utc};
use crisol_infra_db::repositories::{AuditRepository, SandboxLogRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::interval;
use tracing::{info, warn};

/// Cadencia soberana de la poda por antigüedad.
const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Despliega el daemon de retención y retorna su mando de aborto.
pub fn spawn_retention_cleaner(
    log_repository: Arc<SandboxLogRepository>,
    audit_repository: Arc<AuditRepository>,
    config: Arc<ControlPlaneConfig>,
) -> AbortHandle {
    let daemon_handle = tokio::spawn(async move {
        let mut retention_ticker = interval(RETENTION_INTERVAL);
        info!("🧹 [RETENTION_ACTIVE]: Age-horizon cleaner initiated.");

        loop {
            retention_ticker.tick().await;

            let log_horizon = Utc::now() - ChronoDuration::days(config.log_retention_days);
            match log_repository.purge_older_than(log_horizon).await {
                Ok(purged) if purged > 0 => {
                    info!("🧹 [RETENTION]: {} sandbox log rows incinerated.", purged);
                }
                Ok(_) => {}
                Err(ledger_fault) => {
                    warn!("⚠️ [RETENTION]: Log purge incomplete: {ledger_fault}");
                }
            }

            let audit_horizon = Utc::now() - ChronoDuration::days(config.audit_retention_days);
            match audit_repository.purge_older_than(audit_horizon).await {
                Ok(purged) if purged > 0 => {
                    info!("🧹 [RETENTION]: {} audit rows incinerated.", purged);
                }
                Ok(_) => {}
                Err(ledger_fault) => {
                    warn!("⚠️ [RETENTION]: Audit purge incomplete: {ledger_fault}");
                }
            }
        }
    });

    daemon_handle.abort_handle()
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/retention.rs]
