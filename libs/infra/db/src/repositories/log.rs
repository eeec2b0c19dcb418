// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/log.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX LOG REPOSITORY (V13.0 - BOUNDED TAIL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA LINEAL DE LOGS CON RETENCIÓN DUAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. SINGLE WRITER: El colector L4 es el único escritor por sandbox;
 *    las marcas temporales resultan no-decrecientes por construcción.
 * 2. DUAL RETENTION: Retención por sandbox (N filas más recientes) y
 *    global por antigüedad (R días), ambas idempotentes.
 * =================================================================
 */

use crate::errors::DbError;
use crate::{parse_ledger_timestamp, to_ledger_timestamp, StoreClient};
use chrono::{DateTime, Utc};
use crisol_domain_models::{LogStreamKind, SandboxLogEntry};
use libsql::{params, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct SandboxLogRepository {
    database_client: StoreClient,
}

impl SandboxLogRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /// Apéndice de una entrada ya velada por la redacción L4.
    pub async fn append(&self, entry: &SandboxLogEntry) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO sandbox_logs (id, sandbox_id, stream, text, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id.to_string(),
                    entry.sandbox_id.to_string(),
                    entry.stream.as_str(),
                    entry.text.clone(),
                    to_ledger_timestamp(entry.timestamp)
                ],
            )
            .await?;
        Ok(())
    }

    /**
     * Retención por sandbox: conserva únicamente las N filas más recientes.
     * Invocada por el colector tras cada apéndice (idempotente).
     */
    pub async fn enforce_retention(&self, sandbox_id: Uuid, keep_newest: u32) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let purged_count = database_connection
            .execute(
                "DELETE FROM sandbox_logs WHERE sandbox_id = ?1 AND id NOT IN (
                     SELECT id FROM sandbox_logs WHERE sandbox_id = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2
                 )",
                params![sandbox_id.to_string(), keep_newest as i64],
            )
            .await?;

        if purged_count > 0 {
            debug!("🧹 [LOG_RETENTION]: {} rows evicted for sandbox {}.", purged_count, sandbox_id);
        }
        Ok(purged_count)
    }

    /// Cola reciente en orden cronológico (replay del WebSocket y previews).
    pub async fn recent(
        &self,
        sandbox_id: Uuid,
        limit: u32,
    ) -> Result<Vec<SandboxLogEntry>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, sandbox_id, stream, text, timestamp FROM (
                     SELECT id, sandbox_id, stream, text, timestamp FROM sandbox_logs
                     WHERE sandbox_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2
                 ) ORDER BY timestamp ASC, id ASC",
                params![sandbox_id.to_string(), limit as i64],
            )
            .await?;

        let mut entries_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            entries_collection.push(map_row_to_entry(data_row)?);
        }
        Ok(entries_collection)
    }

    /// Retención global: purga entradas más antiguas que el horizonte.
    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, horizon: DateTime<Utc>) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let purged_count = database_connection
            .execute(
                "DELETE FROM sandbox_logs WHERE timestamp < ?1",
                params![to_ledger_timestamp(horizon)],
            )
            .await?;
        Ok(purged_count)
    }
}

fn map_row_to_entry(data_row: Row) -> Result<SandboxLogEntry, DbError> {
    let stream_raw: String = data_row.get(2)?;
    Ok(SandboxLogEntry {
        id: Uuid::parse_str(&data_row.get::<String>(0)?)
            .map_err(|e| DbError::MappingError(format!("log id: {e}")))?,
        sandbox_id: Uuid::parse_str(&data_row.get::<String>(1)?)
            .map_err(|e| DbError::MappingError(format!("log sandbox: {e}")))?,
        stream: LogStreamKind::parse(&stream_raw)
            .ok_or_else(|| DbError::MappingError(format!("stream desconocido: {stream_raw}")))?,
        text: data_row.get(3)?,
        timestamp: parse_ledger_timestamp(&data_row.get::<String>(4)?).unwrap_or_else(Utc::now),
    })
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/log.rs]
