// INICIO DEL ARCHIVO [apps/control-plane/src/kernel.rs]
/**
 * =================================================================
 * APARATO: CONTROL PLANE SOVEREIGN KERNEL (V21.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * Ledger L3, Bóveda L1, Runtime Adapter L3, daemons C8 y transporte
 * Axum con apagado ordenado C9 bajo ventana dura de 30 segundos.
 * =================================================================
 */

use crate::config::ControlPlaneConfig;
use crate::routes::create_control_plane_router;
use crate::services::gauges::spawn_gauges_refresher;
use crate::services::reaper::spawn_reaper;
use crate::services::retention::spawn_retention_cleaner;
use crate::shutdown;
use crate::state::AppState;
use crisol_core_vault::SecretsVault;
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::DockerRuntime;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct ControlPlaneKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
}

impl ControlPlaneKernel {
    /**
     * Ignición del Ledger, la Bóveda y el Runtime Adapter.
     * Toda dependencia física se establece antes de levantar servicios.
     */
    #[instrument(skip(config))]
    pub async fn ignite(config: ControlPlaneConfig) -> Self {
        let database_client =
            StoreClient::connect(&config.database_url, config.database_auth_token.clone())
                .await
                .expect("FATAL: Ledger link collapse. Ignition aborted.");

        let secrets_vault = SecretsVault::from_environment()
            .expect("FATAL: Secrets vault key malformed. Ignition aborted.");

        let runtime = DockerRuntime::connect(config.runtime_socket_path.as_deref())
            .expect("FATAL: Container engine unreachable. Ignition aborted.");

        let listen_port = config.listen_port;
        Self {
            server_network_port: listen_port,
            application_shared_state: AppState::new(
                database_client,
                secrets_vault,
                Arc::new(runtime),
                config,
            ),
        }
    }

    /**
     * Despliega daemons de mantenimiento y el transporte HTTP/WS.
     * Bloquea hasta la señal de terminación; luego colapsa en orden.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. DAEMONS DE MANTENIMIENTO TÁCTICO (C8) ---
        let daemon_handles = vec![
            // A. Barrido TTL de sandboxes vencidos
            spawn_reaper(Arc::clone(&shared_application_state.sandbox_service)),
            // B. Poda por antigüedad (logs 7d, auditoría 90d)
            spawn_retention_cleaner(
                Arc::clone(&shared_application_state.log_repository),
                Arc::clone(&shared_application_state.audit_repository),
                Arc::clone(&shared_application_state.config),
            ),
            // C. Pulso de medidores del plano
            spawn_gauges_refresher(
                Arc::clone(&shared_application_state.sandbox_repository),
                Arc::clone(&shared_application_state.environment_repository),
                Arc::clone(&shared_application_state.platform_gauges),
            ),
        ];

        // --- 2. IGNICIÓN DEL TRANSPORTE HTTP/WS (AXUM) ---
        let sovereign_router = create_control_plane_router(shared_application_state.clone());

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().expect("dirección de enlace literal"),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Sandbox Control Plane listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        let serve_outcome = axum::serve(tcp_listener, sovereign_router)
            .with_graceful_shutdown(shutdown::wait_for_termination_signal())
            .await;

        if let Err(server_error) = serve_outcome {
            error!("💀 [KERNEL_COLLAPSE]: Transport failure: {}", server_error);
        }

        // --- 3. COLAPSO ORDENADO BAJO VENTANA DURA (C9) ---
        let teardown_outcome = tokio::time::timeout(
            shutdown::TEARDOWN_HARD_DEADLINE,
            shutdown::execute_teardown(shared_application_state, daemon_handles),
        )
        .await;

        if teardown_outcome.is_err() {
            error!("💀 [KERNEL_COLLAPSE]: Teardown exceeded the hard deadline. Aborting.");
            std::process::exit(1);
        }
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/kernel.rs]
