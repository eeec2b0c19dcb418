// INICIO DEL ARCHIVO [tests/mirror/apps/control_plane/services/reaper_expiry.test.rs]
/**
 * =================================================================
 * APARATO: REAPER EXPIRY TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar el barrido TTL: sellado expired/stopped y
 *           remoción física del contenedor vencido.
 * =================================================================
 */

use chrono::{Duration as ChronoDuration, Utc};
use crisol_control_plane::config::ControlPlaneConfig;
use crisol_control_plane::services::{LogHub, SandboxService};
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use crisol_domain_models::{
    CreateEnvironmentPayload, Sandbox, SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxLogRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::{ContainerRuntime, ContainerSpec, MockRuntime};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

async fn forge_control_plane(anchor: &str) -> (Arc<SandboxService>, Arc<MockRuntime>, StoreClient) {
    let database_url = format!("file:{anchor}?mode=memory&cache=shared");
    let client = StoreClient::connect(&database_url, None).await.unwrap();
    let engine = Arc::new(MockRuntime::new());

    let service = Arc::new(SandboxService::new(
        Arc::new(SandboxRepository::new(client.clone())),
        Arc::new(EnvironmentRepository::new(client.clone())),
        Arc::new(SandboxLogRepository::new(client.clone())),
        Arc::new(AuditRepository::new(client.clone())),
        Arc::new(SecretsVault::new([7u8; MASTER_KEY_LENGTH_BYTES])),
        Arc::clone(&engine) as Arc<dyn ContainerRuntime>,
        Arc::new(LogHub::new()),
        Arc::new(ControlPlaneConfig::proving_grounds(&database_url)),
    ));
    (service, engine, client)
}

async fn forge_environment(client: &StoreClient, tenant: Uuid) -> (Uuid, Uuid) {
    let repository = EnvironmentRepository::new(client.clone());
    let payload = CreateEnvironmentPayload {
        name: format!("env-{}", &Uuid::new_v4().to_string()[..8]),
        image: Some("nginx:alpine".to_string()),
        dockerfile: None,
        build_files: HashMap::new(),
        command: None,
        cpu: Some(1.0),
        memory: Some(256),
        ports: vec![],
        env: HashMap::new(),
        mounts: vec![],
    };
    let (environment, version) = repository
        .insert_environment_with_version(tenant, &payload, 1.0, 256, &HashMap::new())
        .await
        .unwrap();
    (environment.id, version.id)
}

#[tokio::test]
async fn certify_expired_running_sandbox_is_sealed_and_drained() {
    let (service, engine, client) = forge_control_plane("mem_reaper_seal").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    // 1. FILA VENCIDA EN ESTADO RUNNING CON CONTENEDOR FÍSICO
    let doomed_row = Sandbox {
        id: Uuid::new_v4(),
        user_id: tenant,
        environment_id,
        environment_version_id: version_id,
        name: "doomed".to_string(),
        container_ref: None,
        status: SandboxStatus::Pending,
        phase: SandboxPhase::Creating,
        ports: vec![],
        created_at: Utc::now(),
        started_at: None,
        stopped_at: None,
        expires_at: Some(Utc::now() - ChronoDuration::seconds(90)),
        provision_progress: 0,
        provision_status_text: String::new(),
    };
    repository.insert_pending(&doomed_row).await.unwrap();

    let container_ref = engine
        .create_container(&ContainerSpec {
            name: "crisol-doomed".to_string(),
            image: "nginx:alpine".to_string(),
            command: None,
            env: vec![],
            ports: vec![],
            cpu: 1.0,
            memory_mb: 256,
            labels: HashMap::new(),
            mounts: vec![],
        })
        .await
        .unwrap();
    engine.start_container(&container_ref).await.unwrap();
    repository.attach_container_ref(doomed_row.id, &container_ref).await.unwrap();
    repository.mark_starting(doomed_row.id).await.unwrap();
    repository
        .mark_running_from_starting(doomed_row.id, Utc::now(), "Sandbox healthy")
        .await
        .unwrap();

    // 2. BARRIDO: sellado + drenado físico
    let sealed_count = service.sweep_expired().await;
    assert_eq!(sealed_count, 1);

    let sealed_row = repository.reload(doomed_row.id).await.unwrap().unwrap();
    assert_eq!(sealed_row.status, SandboxStatus::Expired);
    assert_eq!(sealed_row.phase, SandboxPhase::Stopped);
    assert!(sealed_row.stopped_at.is_some());
    // La fila sobrevive (expiración suave); el contenedor no
    assert_eq!(engine.live_count(), 0);

    // 3. IDEMPOTENCIA: el próximo barrido no encuentra candidatas
    assert_eq!(service.sweep_expired().await, 0);

    println!("✅ REAPER: TTL sweep sealing certified.");
}

#[tokio::test]
async fn certify_unexpired_rows_survive_the_sweep() {
    let (service, _engine, client) = forge_control_plane("mem_reaper_survive").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    let living_row = Sandbox {
        id: Uuid::new_v4(),
        user_id: tenant,
        environment_id,
        environment_version_id: version_id,
        name: "living".to_string(),
        container_ref: None,
        status: SandboxStatus::Pending,
        phase: SandboxPhase::Creating,
        ports: vec![],
        created_at: Utc::now(),
        started_at: None,
        stopped_at: None,
        expires_at: Some(Utc::now() + ChronoDuration::seconds(600)),
        provision_progress: 0,
        provision_status_text: String::new(),
    };
    repository.insert_pending(&living_row).await.unwrap();

    assert_eq!(service.sweep_expired().await, 0);
    let surviving = repository.reload(living_row.id).await.unwrap().unwrap();
    assert_eq!(surviving.status, SandboxStatus::Pending);
}
// FIN DEL ARCHIVO [tests/mirror/apps/control_plane/services/reaper_expiry.test.rs]
