// [apps/control-plane/src/main.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE MAIN ENTRY POINT (V9.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La hidratación del entorno y la observabilidad preceden a la
 * construcción del runtime; el kernel abre el socket TCP únicamente
 * tras certificar Ledger, Bóveda y motor de contenedores.
 * =================================================================
 */

use crisol_control_plane::prelude::*;

use crisol_shared_heimdall::init_tracing;
use dotenvy::dotenv;
use tracing::info;

/**
 * Punto de ignición supremo del binario del plano de control.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (HEIMDALL)
    init_tracing("crisol_control_plane");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_orchestrator.block_on(async {
        info!(
            "🛰️  [CONTROL_PLANE]: Global ignition sequence starting on {} cores...",
            num_cpus::get()
        );

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let configuration = ControlPlaneConfig::from_environment();

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = ControlPlaneKernel::ignite(configuration).await;

        // 6. IGNICIÓN DE OPERACIONES (daemons + transporte + apagado C9)
        info!(
            "🚀 [CRISOL_ONLINE]: Control plane operational on port {}.",
            kernel_instance.server_network_port
        );
        kernel_instance.launch_sovereign_operations().await;
    });

    Ok(())
}
