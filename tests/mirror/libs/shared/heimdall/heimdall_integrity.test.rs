// INICIO DEL ARCHIVO [tests/mirror/libs/shared/heimdall/heimdall_integrity.test.rs]
/**
 * =================================================================
 * APARATO: HEIMDALL INTEGRITY TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la ignición única del estrato de observabilidad.
 * =================================================================
 */

use crisol_shared_heimdall::init_tracing;

#[tokio::test]
async fn certify_tracing_ignition() {
    // 1. IGNICIÓN: La inicialización debe completarse sin pánico
    init_tracing("heimdall_proving_grounds");

    // 2. EMISIÓN: Las macros deben fluir sobre el suscriptor instalado
    tracing::info!("🧪 [PROVING]: Heimdall emission certified.");
    tracing::warn!("🧪 [PROVING]: Warning stratum certified.");

    // 3. PÁNICO CONTROLADO: El hook Phoenix captura sin colapsar el test
    let captured = std::panic::catch_unwind(|| panic!("controlled collapse"));
    assert!(captured.is_err(), "El pánico controlado debe propagarse al llamador");

    println!("✅ HEIMDALL: Observability ignition certified.");
}
// FIN DEL ARCHIVO [tests/mirror/libs/shared/heimdall/heimdall_integrity.test.rs]
