// INICIO DEL ARCHIVO [tests/mirror/libs/infra/db/lifecycle_guards.test.rs]
/**
 * =================================================================
 * APARATO: LIFECYCLE GUARDS TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar que el SQL guardado materializa la máquina de
 *           estados: las transiciones ilegales no alcanzan filas.
 * =================================================================
 */

use chrono::{Duration, Utc};
use crisol_domain_models::{
    CreateEnvironmentPayload, Sandbox, SandboxPhase, SandboxStatus,
};
use crisol_infra_db::repositories::{EnvironmentRepository, SandboxRepository};
use crisol_infra_db::{DbError, StoreClient};
use std::collections::HashMap;
use uuid::Uuid;

async fn forge_fixture(anchor: &str) -> (SandboxRepository, Sandbox) {
    let client = StoreClient::connect(&format!("file:{anchor}?mode=memory&cache=shared"), None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria");

    let environment_repository = EnvironmentRepository::new(client.clone());
    let tenant = Uuid::new_v4();
    let payload = CreateEnvironmentPayload {
        name: "guarded-env".to_string(),
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
        .insert_environment_with_version(tenant, &payload, 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    let repository = SandboxRepository::new(client);
    let row = Sandbox {
        id: Uuid::new_v4(),
        user_id: tenant,
        environment_id: environment.id,
        environment_version_id: version.id,
        name: "guarded-box".to_string(),
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
    (repository, row)
}

#[tokio::test]
async fn certify_happy_path_progression() {
    let (repository, row) = forge_fixture("mem_guards_happy").await;

    // pending/creating → (ref) → pending/starting → running/healthy
    repository.attach_container_ref(row.id, "container-alpha").await.unwrap();
    repository.mark_starting(row.id).await.unwrap();
    repository.mark_running_from_starting(row.id, Utc::now(), "Sandbox healthy").await.unwrap();

    let healthy = repository.reload(row.id).await.unwrap().unwrap();
    assert_eq!(healthy.status, SandboxStatus::Running);
    assert_eq!(healthy.phase, SandboxPhase::Healthy);
    assert_eq!(healthy.provision_progress, 100);
    assert!(healthy.started_at.is_some());

    // running → stopped → running (start de usuario) → expired vetado tras stop
    repository.mark_stopped(row.id, Utc::now()).await.unwrap();
    let stopped = repository.reload(row.id).await.unwrap().unwrap();
    assert_eq!(stopped.status, SandboxStatus::Stopped);
    assert!(stopped.stopped_at.is_some());

    repository.mark_running_from_stopped(row.id, Utc::now()).await.unwrap();
    let restarted = repository.reload(row.id).await.unwrap().unwrap();
    assert_eq!(restarted.status, SandboxStatus::Running);
    assert!(restarted.stopped_at.is_none(), "El start debe limpiar stopped_at");

    println!("✅ GUARDS: Happy path progression certified.");
}

#[tokio::test]
async fn certify_illegal_transitions_reach_zero_rows() {
    let (repository, row) = forge_fixture("mem_guards_illegal").await;

    // stop desde pending/creating: la guarda no alcanza filas
    assert!(matches!(
        repository.mark_stopped(row.id, Utc::now()).await,
        Err(DbError::IllegalTransition)
    ));

    // running directo desde creating (sin fase starting): vetado
    assert!(matches!(
        repository.mark_running_from_starting(row.id, Utc::now(), "x").await,
        Err(DbError::IllegalTransition)
    ));

    // Descenso legal a error/failed y sellado del estado terminal
    repository.mark_failed(row.id, "proving collapse").await.unwrap();
    let failed = repository.reload(row.id).await.unwrap().unwrap();
    assert_eq!(failed.status, SandboxStatus::Error);
    assert_eq!(failed.phase, SandboxPhase::Failed);

    // Desde terminal, toda transición guardada colapsa
    assert!(matches!(repository.mark_starting(row.id).await, Err(DbError::IllegalTransition)));
    assert!(matches!(
        repository.mark_expired(row.id, Utc::now()).await,
        Err(DbError::IllegalTransition)
    ));
    assert!(matches!(
        repository.mark_running_from_stopped(row.id, Utc::now()).await,
        Err(DbError::IllegalTransition)
    ));
}

#[tokio::test]
async fn certify_expiry_census_and_seal() {
    let (repository, row) = forge_fixture("mem_guards_expiry").await;

    // Sin expires_at: fuera del censo del barrido
    assert!(repository.select_expired(Utc::now()).await.unwrap().is_empty());

    // Vencimiento en el pasado mediante fila fresca
    let mut doomed = row.clone();
    doomed.id = Uuid::new_v4();
    doomed.name = "doomed-box".to_string();
    doomed.expires_at = Some(Utc::now() - Duration::seconds(30));
    repository.insert_pending(&doomed).await.unwrap();

    let census = repository.select_expired(Utc::now()).await.unwrap();
    assert_eq!(census.len(), 1);
    assert_eq!(census[0].id, doomed.id);

    // Sellado expired/stopped y salida definitiva del censo
    repository.mark_expired(doomed.id, Utc::now()).await.unwrap();
    let sealed = repository.reload(doomed.id).await.unwrap().unwrap();
    assert_eq!(sealed.status, SandboxStatus::Expired);
    assert_eq!(sealed.phase, SandboxPhase::Stopped);
    assert!(repository.select_expired(Utc::now()).await.unwrap().is_empty());
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/db/lifecycle_guards.test.rs]
