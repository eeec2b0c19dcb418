// INICIO DEL ARCHIVO [tests/mirror/libs/infra/db/environment_versioning.test.rs]
/**
 * =================================================================
 * APARATO: ENVIRONMENT VERSIONING TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar el linaje inmutable: monotonía estricta,
 *           byte-igualdad de versiones previas y herencia de campos.
 * =================================================================
 */

use crisol_domain_models::{CreateEnvironmentPayload, PortMapping, UpdateEnvironmentPayload};
use crisol_infra_db::repositories::EnvironmentRepository;
use crisol_infra_db::StoreClient;
use std::collections::HashMap;
use uuid::Uuid;

fn genesis_payload(name: &str) -> CreateEnvironmentPayload {
    CreateEnvironmentPayload {
        name: name.to_string(),
        image: Some("nginx:alpine".to_string()),
        dockerfile: None,
        build_files: HashMap::new(),
        command: None,
        cpu: Some(1.0),
        memory: Some(256),
        ports: vec![PortMapping { container: 80, host: 48080 }],
        env: HashMap::from([("MODE".to_string(), "demo".to_string())]),
        mounts: vec![],
    }
}

#[tokio::test]
async fn certify_immutable_monotone_lineage() {
    // 1. SETUP: Ledger en memoria (Shared Cache)
    let client = StoreClient::connect("file:mem_versioning?mode=memory&cache=shared", None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria");
    let repository = EnvironmentRepository::new(client.clone());
    let tenant = Uuid::new_v4();

    // 2. GÉNESIS: plantilla + versión 1
    let (environment, genesis_version) = repository
        .insert_environment_with_version(tenant, &genesis_payload("nginx-demo"), 1.0, 256, &HashMap::new())
        .await
        .expect("Fallo en el génesis de la plantilla");
    assert_eq!(genesis_version.version, 1);
    assert_eq!(environment.current_version_id, Some(genesis_version.id));

    let genesis_snapshot_before = serde_json::to_value(&genesis_version).unwrap();

    // 3. ACUÑADO: versión 2 con parche parcial (solo memoria)
    let patch = UpdateEnvironmentPayload { memory: Some(1024), ..Default::default() };
    let minted_version = repository
        .mint_next_version(environment.id, &patch)
        .await
        .expect("Fallo al acuñar la sucesora");

    // Monotonía estricta: exactamente prev + 1
    assert_eq!(minted_version.version, 2);
    // Herencia right-biased: la imagen sobrevive, la memoria muta
    assert_eq!(minted_version.image.as_deref(), Some("nginx:alpine"));
    assert_eq!(minted_version.memory_mb, 1024);
    assert_eq!(minted_version.ports, genesis_version.ports);

    // 4. INMUTABILIDAD: la versión 1 es byte-igual antes y después
    let genesis_refetched = repository
        .find_version(genesis_version.id)
        .await
        .unwrap()
        .expect("La versión 1 debe sobrevivir intacta");
    assert_eq!(serde_json::to_value(&genesis_refetched).unwrap(), genesis_snapshot_before);

    // 5. PUNTERO: solo current_version_id giró sobre la plantilla
    let refreshed_environment =
        repository.find_by_id(tenant, environment.id).await.unwrap().unwrap();
    assert_eq!(refreshed_environment.current_version_id, Some(minted_version.id));
    assert_eq!(refreshed_environment.name, environment.name);

    println!("✅ LINEAGE: Immutable monotone versioning certified.");
}

#[tokio::test]
async fn certify_secrets_carry_forward_on_mint() {
    let client = StoreClient::connect("file:mem_versioning_secrets?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = EnvironmentRepository::new(client.clone());
    let tenant = Uuid::new_v4();

    let (environment, _) = repository
        .insert_environment_with_version(tenant, &genesis_payload("vaulted"), 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    // Sellado tardío sobre la versión vigente (D1)
    let sealed_map =
        HashMap::from([("API_KEY".to_string(), "ciphertext-opaque-blob".to_string())]);
    repository.set_current_secrets(environment.id, &sealed_map).await.unwrap();

    // El acuñado retiene el mapa sellado existente
    let minted = repository
        .mint_next_version(environment.id, &UpdateEnvironmentPayload::default())
        .await
        .unwrap();
    assert_eq!(minted.version, 2);
    assert_eq!(minted.secrets_encrypted, sealed_map);
}

#[tokio::test]
async fn certify_duplicate_name_conflict() {
    let client = StoreClient::connect("file:mem_versioning_dup?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = EnvironmentRepository::new(client.clone());
    let tenant = Uuid::new_v4();

    repository
        .insert_environment_with_version(tenant, &genesis_payload("unique-name"), 1.0, 256, &HashMap::new())
        .await
        .unwrap();

    // El mismo (tenant, nombre) colapsa como Conflict semántico
    let duplicate_outcome = repository
        .insert_environment_with_version(tenant, &genesis_payload("unique-name"), 1.0, 256, &HashMap::new())
        .await;
    assert!(matches!(duplicate_outcome, Err(crisol_infra_db::DbError::Conflict(_))));

    // Otro tenant puede reutilizar el nombre libremente
    let foreign_tenant = Uuid::new_v4();
    assert!(repository
        .insert_environment_with_version(foreign_tenant, &genesis_payload("unique-name"), 1.0, 256, &HashMap::new())
        .await
        .is_ok());
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/db/environment_versioning.test.rs]
