// INICIO DEL ARCHIVO [apps/control-plane/src/services/log_collector.rs]
/*!
 * =================================================================
 * APARATO: LOG COLLECTOR ENGINE (V12.0 - SINGLE WRITER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: INGESTA VELADA DE LOGS DEL CONTENEDOR AL LEDGER
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. SINGLE WRITER: Un colector por contenedor vivo; cada evento se
 *    vela (redacción), se persiste UNA vez y se difunde por el hub.
 * 2. LINEAR ORDER: Escritor único => marcas temporales no-decrecientes
 *    por sandbox.
 * 3. SILENT CLOSE: El fin del stream (contenedor muerto) o cualquier
 *    fallo cierra el colector en silencio; la cola persistida queda
 *    visible hasta su retención.
 * =================================================================
 */

use crate::services::redaction::redact_log_text;
use crate::services::sandboxes::SandboxService;
use chrono::Utc;
use crisol_domain_models::SandboxLogEntry;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

impl SandboxService {
    /**
     * Despliega el colector de logs del contenedor con reemplazo:
     * un colector previo del mismo sandbox se cancela primero.
     */
    pub(crate) fn spawn_log_collector_internal(&self, sandbox_id: Uuid, container_ref: String) {
        let runtime = Arc::clone(&self.runtime);
        let log_repository = Arc::clone(&self.log_repository);
        let log_hub = Arc::clone(&self.log_hub);
        let collectors_registry = Arc::clone(&self.collectors);
        let retention_rows = self.config.sandbox_log_retention_rows;

        self.collectors.register_replacing(sandbox_id, || {
            let task_handle = tokio::spawn(async move {
                collect_container_logs(
                    runtime,
                    log_repository,
                    log_hub,
                    sandbox_id,
                    container_ref,
                    retention_rows,
                )
                .await;
                collectors_registry.release(sandbox_id);
            });
            task_handle.abort_handle()
        });
    }
}

/**
 * Bucle de ingesta: cola viva desde "ahora", velado, Ledger y difusión.
 */
#[instrument(skip_all, fields(sandbox = %sandbox_id))]
async fn collect_container_logs(
    runtime: Arc<dyn crisol_infra_runtime::ContainerRuntime>,
    log_repository: Arc<crisol_infra_db::repositories::SandboxLogRepository>,
    log_hub: Arc<crate::services::log_hub::LogHub>,
    sandbox_id: Uuid,
    container_ref: String,
    retention_rows: u32,
) {
    let mut live_stream = match runtime.stream_logs(&container_ref, Utc::now().timestamp()).await {
        Ok(stream) => stream,
        Err(engine_fault) => {
            debug!("⚪ [COLLECTOR]: Stream acquisition failed (container gone?): {engine_fault}");
            return;
        }
    };

    info!("📡 [COLLECTOR]: Log siphon attached to container {}.", container_ref);
    let mut ingested_count: u64 = 0;

    while let Some(event_result) = live_stream.next().await {
        let event = match event_result {
            Ok(event) => event,
            Err(engine_fault) => {
                // El contenedor probablemente murió; cierre silencioso
                debug!("⚪ [COLLECTOR]: Stream severed: {engine_fault}");
                break;
            }
        };

        let veiled_entry = SandboxLogEntry {
            id: Uuid::new_v4(),
            sandbox_id,
            stream: event.stream,
            text: redact_log_text(&event.text),
            timestamp: event.timestamp,
        };

        if let Err(ledger_fault) = log_repository.append(&veiled_entry).await {
            debug!("⚪ [COLLECTOR]: Ledger append skipped: {ledger_fault}");
            continue;
        }

        ingested_count += 1;
        // Retención por sandbox tras cada apéndice (N filas más recientes)
        let _ = log_repository.enforce_retention(sandbox_id, retention_rows).await;

        log_hub.publish(veiled_entry);
    }

    info!("🔌 [COLLECTOR]: Siphon closed for {} after {} events.", container_ref, ingested_count);
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/log_collector.rs]
