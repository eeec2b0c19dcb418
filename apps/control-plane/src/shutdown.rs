// INICIO DEL ARCHIVO [apps/control-plane/src/shutdown.rs]
/*!
 * =================================================================
 * APARATO: SHUTDOWN COORDINATOR (V10.0 - ORDERED COLLAPSE)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: APAGADO ORDENADO ANTE SEÑAL DE TERMINACIÓN
 *
 * VISION HIPER-HOLÍSTICA:
 * Secuencia soberana: quiescencia de daemons → cancelación de
 * provisioners y colectores → retiro de brokers WS → detención y
 * remoción de todos los contenedores etiquetados → caída del Ledger.
 * Todo bajo una ventana dura de 30 segundos.
 * =================================================================
 */

use crate::state::AppState;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{info, warn};

/// Ventana dura del apagado: vencida, el proceso aborta.
pub const TEARDOWN_HARD_DEADLINE: Duration = Duration::from_secs(30);
/// Gracia de detención por contenedor durante el apagado.
const SHUTDOWN_STOP_GRACE_SECONDS: i64 = 5;

/**
 * Espera la señal de terminación del proceso (SIGINT / SIGTERM).
 * Alimenta el graceful shutdown del transporte Axum.
 */
pub async fn wait_for_termination_signal() {
    let interrupt_signal = async {
        tokio::signal::ctrl_c().await.expect("instalación del manejador SIGINT");
    };

    #[cfg(unix)]
    let terminate_signal = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("instalación del manejador SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate_signal = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt_signal => info!("🛑 [SHUTDOWN]: SIGINT received."),
        _ = terminate_signal => info!("🛑 [SHUTDOWN]: SIGTERM received."),
    }
}

/**
 * Colapso ordenado del plano tras el cierre del transporte HTTP.
 */
pub async fn execute_teardown(application_state: AppState, daemon_handles: Vec<AbortHandle>) {
    info!("🛑 [SHUTDOWN]: Ordered collapse sequence starting...");

    // 1. QUIESCENCIA DE DAEMONS PERIÓDICOS (reaper, retención, medidores)
    for daemon_handle in daemon_handles {
        daemon_handle.abort();
    }

    // 2. CANCELACIÓN DE TAREAS POR SANDBOX (provisioners y sifones)
    application_state.sandbox_service.provisioners.cancel_all();
    application_state.sandbox_service.collectors.cancel_all();

    // 3. RETIRO DE BROKERS WS (los visores reciben trama de cierre)
    application_state.log_hub.retire_all();

    // 4. DETENCIÓN Y REMOCIÓN DE CONTENEDORES ETIQUETADOS
    match application_state.runtime.list_owned().await {
        Ok(owned_containers) => {
            info!("🛑 [SHUTDOWN]: Draining {} owned containers.", owned_containers.len());
            for container_ref in owned_containers {
                if let Err(engine_fault) = application_state
                    .runtime
                    .stop_container(&container_ref, SHUTDOWN_STOP_GRACE_SECONDS)
                    .await
                {
                    warn!("⚠️ [SHUTDOWN]: Stop incomplete for {container_ref}: {engine_fault}");
                }
                if let Err(engine_fault) =
                    application_state.runtime.remove_container(&container_ref).await
                {
                    warn!("⚠️ [SHUTDOWN]: Removal incomplete for {container_ref}: {engine_fault}");
                }
            }
        }
        Err(engine_fault) => {
            warn!("⚠️ [SHUTDOWN]: Owned-container census failed: {engine_fault}");
        }
    }

    // 5. CAÍDA DEL LEDGER: los handles se liberan con el estado
    drop(application_state);
    info!("✅ [SHUTDOWN]: Control plane collapse sealed.");
}
// FIN DEL ARCHIVO [apps/control-plane/src/shutdown.rs]
