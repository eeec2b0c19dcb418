// INICIO DEL ARCHIVO [tests/mirror/libs/infra/db/tenant_isolation.test.rs]
/**
 * =================================================================
 * APARATO: TENANT ISOLATION TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la opacidad absoluta entre tenants: todo
 *           acceso ajeno es indistinguible de la inexistencia.
 * =================================================================
 */

use chrono::Utc;
use crisol_domain_models::{CreateEnvironmentPayload, Sandbox, SandboxPhase, SandboxStatus};
use crisol_infra_db::repositories::{
    ApiKeyRepository, EnvironmentRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use std::collections::HashMap;
use uuid::Uuid;

#[tokio::test]
async fn certify_cross_tenant_opacity() {
    // 1. SETUP: Ledger compartido con dos tenants
    let client = StoreClient::connect("file:mem_isolation?mode=memory&cache=shared", None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria");
    let environment_repository = EnvironmentRepository::new(client.clone());
    let sandbox_repository = SandboxRepository::new(client.clone());

    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    // 2. PATRIMONIO DE A: plantilla + sandbox
    let payload = CreateEnvironmentPayload {
        name: "private-env".to_string(),
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
    let (environment, version) = environment_repository
        .insert_environment_with_version(tenant_a, &payload, 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    let sandbox = Sandbox {
        id: Uuid::new_v4(),
        user_id: tenant_a,
        environment_id: environment.id,
        environment_version_id: version.id,
        name: "private-box".to_string(),
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
    sandbox_repository.insert_pending(&sandbox).await.unwrap();

    // 3. LECTURAS DE B: inexistencia absoluta, jamás un Forbidden
    assert!(environment_repository.find_by_id(tenant_b, environment.id).await.unwrap().is_none());
    assert!(sandbox_repository.find_by_id(tenant_b, sandbox.id).await.unwrap().is_none());
    assert!(environment_repository.list_for_user(tenant_b).await.unwrap().is_empty());
    assert!(sandbox_repository.list_for_user(tenant_b, None, None).await.unwrap().is_empty());

    // 4. MUTACIONES DE B: cero filas alcanzadas, patrimonio de A intacto
    assert!(!sandbox_repository.delete(tenant_b, sandbox.id).await.unwrap());
    assert!(!environment_repository.delete_environment(tenant_b, environment.id).await.unwrap());

    let surviving_sandbox = sandbox_repository.find_by_id(tenant_a, sandbox.id).await.unwrap();
    assert!(surviving_sandbox.is_some(), "El patrimonio de A debe sobrevivir a B");
    assert!(environment_repository.find_by_id(tenant_a, environment.id).await.unwrap().is_some());

    println!("✅ ISOLATION: Cross-tenant opacity certified.");
}

#[tokio::test]
async fn certify_api_key_revocation_is_tenant_scoped() {
    let client = StoreClient::connect("file:mem_isolation_keys?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let key_repository = ApiKeyRepository::new(client.clone());

    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let minted_key =
        key_repository.insert_key(tenant_a, "sk_deadbeef", "digest-hex", "ci-key").await.unwrap();

    // B jamás revoca patrimonio de A
    assert!(!key_repository.revoke(tenant_b, minted_key.id).await.unwrap());
    // A revoca su propia llave; la revocación la saca del censo activo
    assert!(key_repository.revoke(tenant_a, minted_key.id).await.unwrap());
    assert!(key_repository.find_active_by_prefix("sk_deadbeef").await.unwrap().is_empty());
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/db/tenant_isolation.test.rs]
