// INICIO DEL ARCHIVO [tests/mirror/apps/control_plane/services/replicate_ports.test.rs]
/**
 * =================================================================
 * APARATO: REPLICATE PORTS TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la réplica: puertos host frescos sobre el
 *           origen + 1, pipeline completo e independencia de vidas.
 * =================================================================
 */

use crisol_control_plane::config::ControlPlaneConfig;
use crisol_control_plane::middleware::AuthenticatedIdentity;
use crisol_control_plane::services::{LogHub, SandboxService};
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use crisol_domain_models::{
    CreateEnvironmentPayload, CreateSandboxPayload, PortMapping, ReplicateSandboxPayload,
    SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxLogRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::{ContainerRuntime, MockRuntime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
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

fn forge_identity(user_id: Uuid) -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        user_id,
        api_key_id: None,
        trace_id: Uuid::new_v4().to_string(),
        client_ip: None,
        client_agent: None,
    }
}

async fn await_lifecycle(client: &StoreClient, sandbox_id: Uuid, status: SandboxStatus) {
    let repository = SandboxRepository::new(client.clone());
    for _ in 0..100 {
        if let Some(row) = repository.reload(sandbox_id).await.unwrap() {
            if row.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("La fila {sandbox_id} jamás alcanzó {status:?}");
}

#[tokio::test]
async fn certify_replica_receives_fresh_host_ports() {
    let (service, _engine, client) = forge_control_plane("mem_replica_ports").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);

    let environment_repository = EnvironmentRepository::new(client.clone());
    let payload = CreateEnvironmentPayload {
        name: "replicable".to_string(),
        image: Some("nginx:alpine".to_string()),
        dockerfile: None,
        build_files: HashMap::new(),
        command: None,
        cpu: Some(1.0),
        memory: Some(256),
        ports: vec![PortMapping { container: 80, host: 49820 }],
        env: HashMap::new(),
        mounts: vec![],
    };
    let (environment, _) = environment_repository
        .insert_environment_with_version(tenant, &payload, 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    // 1. ORIGEN: pipeline completo hasta running
    let origin_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id: environment.id,
                version_id: None,
                name: Some("origin".to_string()),
                ttl_seconds: None,
                ports: Some(vec![PortMapping { container: 80, host: 49820 }]),
                env: HashMap::new(),
            },
        )
        .await
        .unwrap();
    await_lifecycle(&client, origin_row.id, SandboxStatus::Running).await;

    // 2. RÉPLICA: nombre derivado y puerto host fresco sobre origen + 1
    let replica_row = service
        .replicate_sandbox(&identity, origin_row.id, ReplicateSandboxPayload::default())
        .await
        .expect("La réplica debe acuñarse");

    assert_ne!(replica_row.id, origin_row.id);
    assert!(replica_row.name.starts_with("origin-replica-"));
    assert_eq!(replica_row.environment_version_id, origin_row.environment_version_id);

    let replica_host_port = replica_row.ports[0].host;
    assert_eq!(replica_row.ports[0].container, 80);
    assert_ne!(replica_host_port, 49820, "Dos réplicas vivas jamás comparten puerto host");
    assert!(replica_host_port > 49820);

    // 3. PIPELINE COMPLETO: la réplica también alcanza running
    await_lifecycle(&client, replica_row.id, SandboxStatus::Running).await;

    // 4. INDEPENDENCIA: destruir la réplica jamás toca al origen
    let destroyed = service.destroy_sandbox(&identity, replica_row.id).await.unwrap();
    assert!(destroyed);

    let repository = SandboxRepository::new(client.clone());
    let surviving_origin = repository.reload(origin_row.id).await.unwrap().unwrap();
    assert_eq!(surviving_origin.status, SandboxStatus::Running);
    assert_eq!(surviving_origin.phase, SandboxPhase::Healthy);
    assert!(repository.reload(replica_row.id).await.unwrap().is_none());

    println!("✅ REPLICATE: Fresh host-port derivation certified.");
}

#[tokio::test]
async fn certify_replica_honors_explicit_port_override() {
    let (service, _engine, client) = forge_control_plane("mem_replica_override").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);

    let environment_repository = EnvironmentRepository::new(client.clone());
    let payload = CreateEnvironmentPayload {
        name: "override-env".to_string(),
        image: Some("nginx:alpine".to_string()),
        dockerfile: None,
        build_files: HashMap::new(),
        command: None,
        cpu: Some(1.0),
        memory: Some(256),
        ports: vec![PortMapping { container: 80, host: 49910 }],
        env: HashMap::new(),
        mounts: vec![],
    };
    let (environment, _) = environment_repository
        .insert_environment_with_version(tenant, &payload, 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    let origin_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id: environment.id,
                version_id: None,
                name: Some("origin".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await
        .unwrap();
    await_lifecycle(&client, origin_row.id, SandboxStatus::Running).await;

    // Override explícito: el sondeo local se omite por contrato
    let replica_row = service
        .replicate_sandbox(
            &identity,
            origin_row.id,
            ReplicateSandboxPayload {
                name: Some("pinned-replica".to_string()),
                ports: Some(vec![PortMapping { container: 80, host: 49977 }]),
            },
        )
        .await
        .unwrap();

    assert_eq!(replica_row.name, "pinned-replica");
    assert_eq!(replica_row.ports[0].host, 49977);
}
// FIN DEL ARCHIVO [tests/mirror/apps/control_plane/services/replicate_ports.test.rs]
