// INICIO DEL ARCHIVO [tests/mirror/libs/infra/db/sandbox_idempotency.test.rs]
/**
 * =================================================================
 * APARATO: SANDBOX IDEMPOTENCY TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la llave (user, environment, name) y el censo
 *           de cuota sobre estados no terminales.
 * =================================================================
 */

use chrono::Utc;
use crisol_domain_models::{
    CreateEnvironmentPayload, Sandbox, SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{EnvironmentRepository, SandboxRepository};
use crisol_infra_db::{DbError, StoreClient};
use std::collections::HashMap;
use uuid::Uuid;

async fn forge_ledger(anchor: &str) -> StoreClient {
    StoreClient::connect(&format!("file:{anchor}?mode=memory&cache=shared"), None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria")
}

async fn forge_environment(client: &StoreClient, tenant: Uuid) -> (Uuid, Uuid) {
    let repository = EnvironmentRepository::new(client.clone());
    let payload = CreateEnvironmentPayload {
        name: format!("env-{:08x}", rand_suffix()),
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

fn rand_suffix() -> u32 {
    Uuid::new_v4().as_u128() as u32
}

fn forge_pending_row(tenant: Uuid, environment_id: Uuid, version_id: Uuid, name: &str) -> Sandbox {
    Sandbox {
        id: Uuid::new_v4(),
        user_id: tenant,
        environment_id,
        environment_version_id: version_id,
        name: name.to_string(),
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
    }
}

#[tokio::test]
async fn certify_idempotency_key_uniqueness() {
    let client = forge_ledger("mem_idem_key").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    // 1. GANADORA: primera inserción de la llave
    let winning_row = forge_pending_row(tenant, environment_id, version_id, "twin");
    repository.insert_pending(&winning_row).await.expect("La ganadora debe acuñarse");

    // 2. PERDEDORA: la misma llave colapsa en Conflict
    let losing_row = forge_pending_row(tenant, environment_id, version_id, "twin");
    assert!(matches!(
        repository.insert_pending(&losing_row).await,
        Err(DbError::Conflict(_))
    ));

    // 3. RELECTURA: la llave localiza exactamente a la ganadora
    let located = repository
        .find_by_identity(tenant, environment_id, "twin")
        .await
        .unwrap()
        .expect("La llave debe localizar la fila");
    assert_eq!(located.id, winning_row.id);

    println!("✅ IDEMPOTENCY: (user, environment, name) key certified.");
}

#[tokio::test]
async fn certify_quota_census_ignores_terminal_states() {
    let client = forge_ledger("mem_idem_quota").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    // Dos instancias vivas
    let first = forge_pending_row(tenant, environment_id, version_id, "alive-one");
    let second = forge_pending_row(tenant, environment_id, version_id, "alive-two");
    repository.insert_pending(&first).await.unwrap();
    repository.insert_pending(&second).await.unwrap();
    assert_eq!(repository.count_live_for_user(tenant).await.unwrap(), 2);

    // La primera desciende a error/failed: sale del censo de cuota
    repository.mark_failed(first.id, "proving grounds collapse").await.unwrap();
    assert_eq!(repository.count_live_for_user(tenant).await.unwrap(), 1);

    // Un tenant ajeno jamás pesa en el censo
    assert_eq!(repository.count_live_for_user(Uuid::new_v4()).await.unwrap(), 0);
}

#[tokio::test]
async fn certify_concurrent_delete_deduplication() {
    let client = forge_ledger("mem_idem_delete").await;
    let repository = SandboxRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let (environment_id, version_id) = forge_environment(&client, tenant).await;

    let row = forge_pending_row(tenant, environment_id, version_id, "doomed");
    repository.insert_pending(&row).await.unwrap();

    // Solo una de las destrucciones concurrentes observa la fila
    let first_delete = repository.delete(tenant, row.id).await.unwrap();
    let second_delete = repository.delete(tenant, row.id).await.unwrap();
    assert!(first_delete);
    assert!(!second_delete);
    assert!(repository.find_by_id(tenant, row.id).await.unwrap().is_none());
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/db/sandbox_idempotency.test.rs]
