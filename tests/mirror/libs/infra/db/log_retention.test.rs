// INICIO DEL ARCHIVO [tests/mirror/libs/infra/db/log_retention.test.rs]
/**
 * =================================================================
 * APARATO: LOG RETENTION TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar la retención dual (N más recientes + horizonte
 *           de antigüedad) y el orden cronológico de la cola.
 * =================================================================
 */

use chrono::{Duration, Utc};
use crisol_domain_models::{LogStreamKind, SandboxLogEntry};
use crisol_infra_db::repositories::SandboxLogRepository;
use crisol_infra_db::StoreClient;
use uuid::Uuid;

fn forge_entry(sandbox_id: Uuid, sequence: i64, text: &str) -> SandboxLogEntry {
    SandboxLogEntry {
        id: Uuid::new_v4(),
        sandbox_id,
        stream: if sequence % 2 == 0 { LogStreamKind::Stdout } else { LogStreamKind::Stderr },
        text: text.to_string(),
        timestamp: Utc::now() - Duration::seconds(100 - sequence),
    }
}

#[tokio::test]
async fn certify_newest_n_retention() {
    let client = StoreClient::connect("file:mem_log_retention?mode=memory&cache=shared", None)
        .await
        .expect("Fallo al inicializar el Ledger en memoria");
    let repository = SandboxLogRepository::new(client.clone());
    let sandbox_id = Uuid::new_v4();

    // 1. INGESTA: 15 entradas con marcas crecientes
    for sequence in 0..15 {
        repository
            .append(&forge_entry(sandbox_id, sequence, &format!("line-{sequence}")))
            .await
            .unwrap();
    }

    // 2. RETENCIÓN: conservar únicamente las 10 más recientes
    let purged = repository.enforce_retention(sandbox_id, 10).await.unwrap();
    assert_eq!(purged, 5);

    // 3. COLA: orden cronológico y supervivencia exacta de la cola nueva
    let surviving = repository.recent(sandbox_id, 100).await.unwrap();
    assert_eq!(surviving.len(), 10);
    assert_eq!(surviving.first().unwrap().text, "line-5");
    assert_eq!(surviving.last().unwrap().text, "line-14");
    assert!(
        surviving.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp),
        "Las marcas temporales deben ser no-decrecientes"
    );

    println!("✅ RETENTION: Newest-N eviction certified.");
}

#[tokio::test]
async fn certify_age_horizon_purge() {
    let client = StoreClient::connect("file:mem_log_horizon?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = SandboxLogRepository::new(client.clone());
    let sandbox_id = Uuid::new_v4();

    // Entrada arqueológica (10 días) y entrada fresca
    let mut archaic = forge_entry(sandbox_id, 0, "archaic");
    archaic.timestamp = Utc::now() - Duration::days(10);
    repository.append(&archaic).await.unwrap();
    repository.append(&forge_entry(sandbox_id, 1, "fresh")).await.unwrap();

    // Horizonte de 7 días: solo la arqueológica se incinera
    let purged = repository.purge_older_than(Utc::now() - Duration::days(7)).await.unwrap();
    assert_eq!(purged, 1);

    let surviving = repository.recent(sandbox_id, 100).await.unwrap();
    assert_eq!(surviving.len(), 1);
    assert_eq!(surviving[0].text, "fresh");
}

#[tokio::test]
async fn certify_per_sandbox_isolation_of_retention() {
    let client = StoreClient::connect("file:mem_log_percell?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repository = SandboxLogRepository::new(client.clone());
    let first_sandbox = Uuid::new_v4();
    let second_sandbox = Uuid::new_v4();

    for sequence in 0..5 {
        repository.append(&forge_entry(first_sandbox, sequence, "first")).await.unwrap();
        repository.append(&forge_entry(second_sandbox, sequence, "second")).await.unwrap();
    }

    // La retención de una celda jamás toca a la vecina
    repository.enforce_retention(first_sandbox, 2).await.unwrap();
    assert_eq!(repository.recent(first_sandbox, 100).await.unwrap().len(), 2);
    assert_eq!(repository.recent(second_sandbox, 100).await.unwrap().len(), 5);
}
// FIN DEL ARCHIVO [tests/mirror/libs/infra/db/log_retention.test.rs]
