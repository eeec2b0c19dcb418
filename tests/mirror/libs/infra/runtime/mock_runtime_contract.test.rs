// INICIO DEL ARCHIVO [tests/mirror/libs/infra/runtime/mock_runtime_contract.test.rs]
/**
 * =================================================================
 * APARATO: MOCK RUNTIME CONTRACT TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar que el motor simulado honra el contrato del
 *           adaptador (idempotencias, sonda, censo etiquetado).
 * =================================================================
 */

use crisol_infra_runtime::{ContainerRuntime, ContainerSpec, MockRuntime, ProbeStatus};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn forge_spec(name: &str) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        image: "nginx:alpine".to_string(),
        command: None,
        env: vec!["SANDBOX_ID=proving".to_string()],
        ports: vec![],
        cpu: 1.0,
        memory_mb: 256,
        labels: HashMap::from([("sandbox-platform".to_string(), "true".to_string())]),
        mounts: vec![],
    }
}

#[tokio::test]
async fn certify_lifecycle_and_probe_contract() {
    let engine = MockRuntime::new();

    // 1. MATERIALIZACIÓN + SONDA: creado pero no corriendo
    let container_ref = engine.create_container(&forge_spec("alpha")).await.unwrap();
    let probe = engine.inspect(&container_ref).await.unwrap().unwrap();
    assert!(!probe.running);
    assert_eq!(probe.status, ProbeStatus::Exited);

    // 2. IGNICIÓN: running=true y salud certificable
    engine.start_container(&container_ref).await.unwrap();
    assert!(engine.wait_running(&container_ref, Duration::from_secs(1)).await.unwrap());

    // 3. IDEMPOTENCIA DE STOP: 'ya detenido' es éxito
    engine.stop_container(&container_ref, 5).await.unwrap();
    engine.stop_container(&container_ref, 5).await.unwrap();

    // 4. IDEMPOTENCIA DE REMOVE: 'no encontrado' es éxito
    engine.remove_container(&container_ref).await.unwrap();
    engine.remove_container(&container_ref).await.unwrap();
    assert!(engine.inspect(&container_ref).await.unwrap().is_none());
}

#[tokio::test]
async fn certify_failure_levers_and_census() {
    let engine = Arc::new(MockRuntime::new());

    // Palanca de colapso de creación
    engine.fail_container_creation.store(true, Ordering::SeqCst);
    assert!(engine.create_container(&forge_spec("doomed")).await.is_err());
    engine.fail_container_creation.store(false, Ordering::SeqCst);

    // Censo etiquetado para el apagado C9
    let first = engine.create_container(&forge_spec("one")).await.unwrap();
    let second = engine.create_container(&forge_spec("two")).await.unwrap();
    let owned = engine.list_owned().await.unwrap();
    assert_eq!(owned.len(), 2);
    assert!(owned.contains(&first) && owned.contains(&second));

    // La remoción saca del censo
    engine.remove_container(&first).await.unwrap();
    assert_eq!(engine.live_count(), 1);

    // Palanca de veto de salud
    engine.start_container(&second).await.unwrap();
    engine.deny_health.store(true, Ordering::SeqCst);
    assert!(!engine.wait_running(&second, Duration::from_secs(1)).await.unwrap());

    println!("✅ MOCK_RUNTIME: Adapter contract certified.");
}

#[tokio::test]
async fn certify_progress_sink_emission() {
    let engine = MockRuntime::new();
    let observed: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

    let sink_observed = Arc::clone(&observed);
    engine
        .ensure_image(
            "nginx:alpine",
            Arc::new(move |percent: u8, _status: &str| {
                sink_observed.lock().unwrap().push(percent);
            }),
        )
        .await
        .unwrap();

    let emitted = observed.lock().unwrap().clone();
    assert_eq!(emitted.last().copied(), Some(100), "El avance debe culminar en 100");
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/runtime/mock_runtime_contract.test.rs]
