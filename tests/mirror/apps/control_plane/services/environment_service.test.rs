// INICIO DEL ARCHIVO [tests/mirror/apps/control_plane/services/environment_service.test.rs]
/**
 * =================================================================
 * APARATO: ENVIRONMENT SERVICE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la gobernanza de plantillas: fuente dual,
 *           cuota, secretos velados y veto de incineración en vivo.
 * =================================================================
 */

use chrono::Utc;
use crisol_control_plane::errors::ApiError;
use crisol_control_plane::middleware::AuthenticatedIdentity;
use crisol_control_plane::services::EnvironmentService;
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use crisol_domain_models::{
    limits, CreateEnvironmentPayload, Sandbox, SandboxPhase, SandboxStatus, SetSecretPayload,
    UpdateEnvironmentPayload,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::{ContainerRuntime, MockRuntime};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const PROVING_MASTER_KEY: [u8; MASTER_KEY_LENGTH_BYTES] = [7u8; MASTER_KEY_LENGTH_BYTES];

async fn forge_service(anchor: &str) -> (EnvironmentService, StoreClient) {
    let database_url = format!("file:{anchor}?mode=memory&cache=shared");
    let client = StoreClient::connect(&database_url, None).await.unwrap();

    let service = EnvironmentService::new(
        Arc::new(EnvironmentRepository::new(client.clone())),
        Arc::new(SandboxRepository::new(client.clone())),
        Arc::new(AuditRepository::new(client.clone())),
        Arc::new(SecretsVault::new(PROVING_MASTER_KEY)),
        Arc::new(MockRuntime::new()) as Arc<dyn ContainerRuntime>,
    );
    (service, client)
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

fn forge_payload(name: &str) -> CreateEnvironmentPayload {
    CreateEnvironmentPayload {
        name: name.to_string(),
        image: Some("nginx:alpine".to_string()),
        dockerfile: None,
        build_files: HashMap::new(),
        command: None,
        cpu: Some(1.0),
        memory: Some(256),
        ports: vec![],
        env: HashMap::new(),
        mounts: vec![],
    }
}

#[tokio::test]
async fn certify_dual_source_exclusivity() {
    let (service, _client) = forge_service("mem_envsvc_dual").await;
    let identity = forge_identity(Uuid::new_v4());

    // Ninguna fuente
    let mut void_payload = forge_payload("void");
    void_payload.image = None;
    assert!(matches!(
        service.create_environment(&identity, void_payload).await,
        Err(ApiError::Validation(_))
    ));

    // Ambas fuentes
    let mut dual_payload = forge_payload("dual");
    dual_payload.dockerfile = Some("FROM alpine".to_string());
    assert!(matches!(
        service.create_environment(&identity, dual_payload).await,
        Err(ApiError::Validation(_))
    ));

    // Exactamente una: legal
    assert!(service.create_environment(&identity, forge_payload("legal")).await.is_ok());
}

#[tokio::test]
async fn certify_template_quota() {
    let (service, _client) = forge_service("mem_envsvc_quota").await;
    let identity = forge_identity(Uuid::new_v4());

    for index in 0..limits::MAX_ENVIRONMENTS_PER_USER {
        service
            .create_environment(&identity, forge_payload(&format!("template-{index}")))
            .await
            .unwrap();
    }

    // La sexta plantilla colapsa con QuotaExceeded
    assert!(matches!(
        service.create_environment(&identity, forge_payload("overflow")).await,
        Err(ApiError::QuotaExceeded(_))
    ));
}

#[tokio::test]
async fn certify_secret_veiling_in_responses() {
    let (service, _client) = forge_service("mem_envsvc_veil").await;
    let identity = forge_identity(Uuid::new_v4());

    let created = service.create_environment(&identity, forge_payload("vaulted")).await.unwrap();

    service
        .set_secret(
            &identity,
            created.id,
            SetSecretPayload { key: "API_KEY".to_string(), value: "sk_live_ABCDEF".to_string() },
        )
        .await
        .unwrap();

    // Clave de secreto ilegal: vetada en el perímetro
    assert!(matches!(
        service
            .set_secret(
                &identity,
                created.id,
                SetSecretPayload { key: "lowercase".to_string(), value: "x".to_string() },
            )
            .await,
        Err(ApiError::Validation(_))
    ));

    // La proyección lista la clave velada y JAMÁS el valor
    let projected = service.get_environment(&identity, created.id).await.unwrap();
    assert_eq!(projected.secrets.len(), 1);
    assert_eq!(projected.secrets[0].key, "API_KEY");
    assert!(projected.secrets[0].redacted);

    let rendered = serde_json::to_string(&projected).unwrap();
    assert!(!rendered.contains("sk_live_ABCDEF"), "El claro jamás cruza la proyección");

    // El borrado remueve la clave de la versión vigente
    service.delete_secret(&identity, created.id, "API_KEY").await.unwrap();
    let after_delete = service.get_environment(&identity, created.id).await.unwrap();
    assert!(after_delete.secrets.is_empty());

    println!("✅ ENV_SERVICE: Secret veiling certified.");
}

#[tokio::test]
async fn certify_update_mints_and_secrets_survive() {
    let (service, _client) = forge_service("mem_envsvc_update").await;
    let identity = forge_identity(Uuid::new_v4());

    let created = service.create_environment(&identity, forge_payload("evolving")).await.unwrap();
    assert_eq!(created.version, 1);

    service
        .set_secret(
            &identity,
            created.id,
            SetSecretPayload { key: "TOKEN".to_string(), value: "opaque".to_string() },
        )
        .await
        .unwrap();

    let updated = service
        .update_environment(
            &identity,
            created.id,
            UpdateEnvironmentPayload { memory: Some(1024), ..Default::default() },
        )
        .await
        .unwrap();

    // Monotonía y herencia: versión 2, imagen intacta, secreto retenido
    assert_eq!(updated.version, 2);
    assert_eq!(updated.image.as_deref(), Some("nginx:alpine"));
    assert_eq!(updated.memory, 1024);
    assert_eq!(updated.secrets.len(), 1);
    assert_eq!(updated.secrets[0].key, "TOKEN");
}

#[tokio::test]
async fn certify_live_sandboxes_veto_incineration() {
    let (service, client) = forge_service("mem_envsvc_veto").await;
    let tenant = Uuid::new_v4();
    let identity = forge_identity(tenant);

    let created = service.create_environment(&identity, forge_payload("anchored")).await.unwrap();

    // Instancia viva anclada a la plantilla
    let environment_repository = EnvironmentRepository::new(client.clone());
    let environment =
        environment_repository.find_by_id(tenant, created.id).await.unwrap().unwrap();
    let sandbox_repository = SandboxRepository::new(client.clone());
    sandbox_repository
        .insert_pending(&Sandbox {
            id: Uuid::new_v4(),
            user_id: tenant,
            environment_id: environment.id,
            environment_version_id: environment.current_version_id.unwrap(),
            name: "anchor".to_string(),
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
        })
        .await
        .unwrap();

    // Veto por vida anclada
    assert!(matches!(
        service.delete_environment(&identity, created.id).await,
        Err(ApiError::Conflict(_))
    ));

    // Con la vida extinta, la incineración procede en cascada
    let anchored = sandbox_repository.list_for_user(tenant, None, None).await.unwrap();
    sandbox_repository.mark_failed(anchored[0].id, "proving collapse").await.unwrap();
    assert!(service.delete_environment(&identity, created.id).await.is_ok());
    assert!(environment_repository.find_by_id(tenant, created.id).await.unwrap().is_none());
    assert!(sandbox_repository.list_for_user(tenant, None, None).await.unwrap().is_empty());
}
// FIN DEL ARCHIVO [tests/mirror/apps/control_plane/services/environment_service.test.rs]
