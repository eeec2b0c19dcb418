// INICIO DEL ARCHIVO [tests/mirror/apps/control_plane/services/sandbox_quota.test.rs]
/**
 * =================================================================
 * APARATO: SANDBOX QUOTA & RACE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la cuota de 10 instancias vivas (sin fila ni
 *           contenedor residual) y la carrera idempotente de génesis.
 * =================================================================
 */

use chrono::Utc;
use crisol_control_plane::config::ControlPlaneConfig;
use crisol_control_plane::errors::ApiError;
use crisol_control_plane::middleware::AuthenticatedIdentity;
use crisol_control_plane::services::{LogHub, SandboxService};
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use crisol_domain_models::{
    limits, CreateEnvironmentPayload, CreateSandboxPayload, Sandbox, SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxLogRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::{ContainerRuntime, MockRuntime};
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

fn forge_identity(user_id: Uuid) -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        user_id,
        api_key_id: None,
        trace_id: Uuid::new_v4().to_string(),
        client_ip: None,
        client_agent: None,
    }
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
async fn certify_eleventh_creation_collapses_without_residue() {
    let (service, engine, client) = forge_control_plane("mem_quota_cap").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    // 1. SATURACIÓN: 10 filas vivas directas al Ledger
    for index in 0..limits::MAX_LIVE_SANDBOXES_PER_USER {
        let row = Sandbox {
            id: Uuid::new_v4(),
            user_id: tenant,
            environment_id,
            environment_version_id: version_id,
            name: format!("occupant-{index}"),
            container_ref: None,
            status: SandboxStatus::Pending,
            phase: SandboxPhase::Creating,
            ports: vec![],
            created_at: Utc::now(),
            started_at: None,
            stopped_at: None,
            expires_at: None,
            provision_progress: 0,
            provision_status_text: String::new(),
        };
        repository.insert_pending(&row).await.unwrap();
    }

    // 2. LA UNDÉCIMA: colapsa con QuotaExceeded
    let overflow_outcome = service
        .create_sandbox(
            &identity,
            CreateSandboxPayload {
                environment_id,
                version_id: None,
                name: Some("overflow".to_string()),
                ttl_seconds: None,
                ports: None,
                env: HashMap::new(),
            },
        )
        .await;
    assert!(matches!(overflow_outcome, Err(ApiError::QuotaExceeded(_))));

    // 3. CERO RESIDUOS: ni fila ni contenedor
    assert_eq!(
        repository.count_live_for_user(tenant).await.unwrap(),
        limits::MAX_LIVE_SANDBOXES_PER_USER
    );
    assert!(repository.find_by_identity(tenant, environment_id, "overflow").await.unwrap().is_none());
    assert_eq!(engine.live_count(), 0);

    println!("✅ QUOTA: Eleventh creation rejection certified.");
}

#[tokio::test]
async fn certify_concurrent_genesis_converges_to_one_row() {
    let (service, engine, client) = forge_control_plane("mem_quota_race").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);
    let (environment_id, _) = forge_environment(&client, tenant).await;

    let forge_payload = || CreateSandboxPayload {
        environment_id,
        version_id: None,
        name: Some("twin".to_string()),
        ttl_seconds: None,
        ports: None,
        env: HashMap::new(),
    };

    // Dos creadores concurrentes con la misma llave de idempotencia
    let (first_outcome, second_outcome) = tokio::join!(
        service.create_sandbox(&identity, forge_payload()),
        service.create_sandbox(&identity, forge_payload()),
    );

    let first_row = first_outcome.unwrap();
    let second_row = second_outcome.unwrap();
    assert_eq!(first_row.id, second_row.id, "Ambos génesis deben converger a la misma fila");

    // Exactamente una fila en el Ledger y, a lo sumo, un contenedor físico
    let repository = SandboxRepository::new(client.clone());
    let census = repository.list_for_user(tenant, None, None).await.unwrap();
    assert_eq!(census.len(), 1);

    // Ventana de materialización: el provisioner único concluye
    for _ in 0..100 {
        if repository.reload(first_row.id).await.unwrap().unwrap().status == SandboxStatus::Running
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(engine.live_count() <= 1, "Jamás debe materializarse un segundo contenedor");
}
// FIN DEL ARCHIVO [tests/mirror/apps/control_plane/services/sandbox_quota.test.rs]
