// INICIO DEL ARCHIVO [tests/mirror/apps/control_plane/services/provisioner_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: PROVISIONER LIFECYCLE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la materialización asíncrona completa:
 *           pending/creating → pending/starting → running/healthy,
 *           inyección de secretos y colapso a error/failed.
 * =================================================================
 */

use crisol_control_plane::config::ControlPlaneConfig;
use crisol_control_plane::middleware::AuthenticatedIdentity;
use crisol_control_plane::services::{LogHub, SandboxService};
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use crisol_domain_models::{
    CreateEnvironmentPayload, CreateSandboxPayload, SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxLogRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::{ContainerRuntime, MockRuntime};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const PROVING_MASTER_KEY: [u8; MASTER_KEY_LENGTH_BYTES] = [7u8; MASTER_KEY_LENGTH_BYTES];

async fn forge_control_plane(anchor: &str) -> (Arc<SandboxService>, Arc<MockRuntime>, StoreClient) {
    let database_url = format!("file:{anchor}?mode=memory&cache=shared");
    let client = StoreClient::connect(&database_url, None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria");
    let engine = Arc::new(MockRuntime::new());

    let service = Arc::new(SandboxService::new(
        Arc::new(SandboxRepository::new(client.clone())),
        Arc::new(EnvironmentRepository::new(client.clone())),
        Arc::new(SandboxLogRepository::new(client.clone())),
        Arc::new(AuditRepository::new(client.clone())),
        Arc::new(SecretsVault::new(PROVING_MASTER_KEY)),
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

async fn forge_environment(
    client: &StoreClient,
    tenant: Uuid,
    sealed_secrets: HashMap<String, String>,
) -> Uuid {
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
        env: HashMap::from([("MODE".to_string(), "demo".to_string())]),
        mounts: vec![],
    };
    let (environment, _) = repository
        .insert_environment_with_version(tenant, &payload, 1.0, 256, &sealed_secrets)
        .await
        .unwrap();
    environment.id
}

/// Sondea el Ledger hasta que la fila alcance la coordenada esperada.
async fn await_lifecycle(
    client: &StoreClient,
    sandbox_id: Uuid,
    status: SandboxStatus,
    phase: SandboxPhase,
) -> crisol_domain_models::Sandbox {
    let repository = SandboxRepository::new(client.clone());
    for _ in 0..100 {
        if let Some(row) = repository.reload(sandbox_id).await.unwrap() {
            if row.status == status && row.phase == phase {
                return row;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("La fila {sandbox_id} jamás alcanzó {status:?}/{phase:?}");
}

#[tokio::test]
async fn certify_happy_path_materialization() {
    let (service, engine, client) = forge_control_plane("mem_prov_happy").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);
    let environment_id = forge_environment(&client, tenant, HashMap::new()).await;

    // 1. GÉNESIS: la respuesta inmediata es pending/creating
    let pending_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id,
                version_id: None,
                name: Some("demo".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await
        .expect("El génesis debe retornar la fila pending");
    assert_eq!(pending_row.status, SandboxStatus::Pending);
    assert_eq!(pending_row.phase, SandboxPhase::Creating);
    assert!(pending_row.container_ref.is_none());

    // 2. MATERIALIZACIÓN: el provisioner certifica running/healthy
    let healthy_row =
        await_lifecycle(&client, pending_row.id, SandboxStatus::Running, SandboxPhase::Healthy)
            .await;
    assert_eq!(healthy_row.provision_progress, 100);
    assert!(healthy_row.started_at.is_some());

    // 3. VERDAD FÍSICA: contenedor vivo con identidad inyectada
    let container_ref = healthy_row.container_ref.expect("ref físico sellado");
    let physical_record = engine.snapshot(&container_ref).expect("contenedor en el censo");
    assert!(physical_record.running);
    assert!(physical_record
        .env
        .contains(&format!("SANDBOX_ID={}", pending_row.id)));
    assert_eq!(physical_record.labels.get("sandbox-platform").map(String::as_str), Some("true"));

    println!("✅ PROVISIONER: Happy path materialization certified.");
}

#[tokio::test]
async fn certify_secret_injection_into_container_env() {
    let (service, engine, client) = forge_control_plane("mem_prov_secrets").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);

    // Secreto sellado con la MISMA llave maestra del plano
    let vault = SecretsVault::new(PROVING_MASTER_KEY);
    let sealed_secrets =
        HashMap::from([("API_KEY".to_string(), vault.encrypt("sk_live_ABCDEF").unwrap())]);
    let environment_id = forge_environment(&client, tenant, sealed_secrets).await;

    let pending_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id,
                version_id: None,
                name: Some("vaulted".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await
        .unwrap();

    let healthy_row =
        await_lifecycle(&client, pending_row.id, SandboxStatus::Running, SandboxPhase::Healthy)
            .await;

    // El claro fluye ÚNICAMENTE al vector de entorno del contenedor
    let physical_record = engine.snapshot(&healthy_row.container_ref.unwrap()).unwrap();
    assert!(physical_record.env.contains(&"API_KEY=sk_live_ABCDEF".to_string()));
    assert!(physical_record.env.contains(&"MODE=demo".to_string()));
}

#[tokio::test]
async fn certify_engine_collapse_descends_to_failed() {
    let (service, engine, client) = forge_control_plane("mem_prov_collapse").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);
    let environment_id = forge_environment(&client, tenant, HashMap::new()).await;

    engine.fail_container_creation.store(true, Ordering::SeqCst);

    let pending_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id,
                version_id: None,
                name: Some("doomed".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await
        .unwrap();

    // El colapso transiciona a error/failed; la fila sobrevive
    let failed_row =
        await_lifecycle(&client, pending_row.id, SandboxStatus::Error, SandboxPhase::Failed).await;
    assert!(failed_row.provision_status_text.contains("container creation collapsed"));
    assert_eq!(engine.live_count(), 0);
}

#[tokio::test]
async fn certify_health_window_denial_descends_to_failed() {
    let (service, engine, client) = forge_control_plane("mem_prov_health").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);
    let environment_id = forge_environment(&client, tenant, HashMap::new()).await;

    engine.deny_health.store(true, Ordering::SeqCst);

    let pending_row = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id,
                version_id: None,
                name: Some("unhealthy".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await
        .unwrap();

    let failed_row =
        await_lifecycle(&client, pending_row.id, SandboxStatus::Error, SandboxPhase::Failed).await;
    // El contenedor NO se incinera: el operador decide la destrucción
    assert!(failed_row.container_ref.is_some());
    assert_eq!(engine.live_count(), 1);
}
// FIN DEL ARCHIVO [tests/mirror/apps/control_plane/services/provisioner_lifecycle.test.rs]
