// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT REPOSITORY (V10.0 - APPEND ONLY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RASTRO FORENSE INMUTABLE DE ACCIONES
 *
 * VISION HIPER-HOLÍSTICA:
 * El apéndice jamás bloquea una operación de negocio: el servicio L4
 * registra el fallo y continúa. Ninguna ruta de servicio muta ni
 * borra entradas; la única poda es la retención por antigüedad (C8).
 * =================================================================
 */

use crate::errors::DbError;
use crate::{now_rfc3339, parse_ledger_timestamp, to_ledger_timestamp, StoreClient};
use chrono::{DateTime, Utc};
use crisol_domain_models::{AuditAction, AuditEntry};
use libsql::{params, Row};
use tracing::instrument;
use uuid::Uuid;

pub struct AuditRepository {
    database_client: StoreClient,
}

impl AuditRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /// Apéndice de una acción auditable del tenant.
    pub async fn append(
        &self,
        user_id: Uuid,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        metadata: serde_json::Value,
        client_ip: Option<&str>,
        client_agent: Option<&str>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO audit_logs
                 (id, user_id, action, resource_type, resource_id, metadata, client_ip, client_agent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    action.as_str(),
                    resource_type,
                    resource_id,
                    metadata.to_string(),
                    client_ip,
                    client_agent,
                    now_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Rastro del tenant, más reciente primero, acotado.
    pub async fn list_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<AuditEntry>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, user_id, action, resource_type, resource_id, metadata, client_ip, client_agent, created_at
                 FROM audit_logs WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                params![user_id.to_string(), limit as i64],
            )
            .await?;

        let mut entries_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            entries_collection.push(map_row_to_entry(data_row)?);
        }
        Ok(entries_collection)
    }

    /// Retención por antigüedad del rastro (daemon C8, 90 días).
    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, horizon: DateTime<Utc>) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let purged_count = database_connection
            .execute(
                "DELETE FROM audit_logs WHERE created_at < ?1",
                params![to_ledger_timestamp(horizon)],
            )
            .await?;
        Ok(purged_count)
    }
}

fn map_row_to_entry(data_row: Row) -> Result<AuditEntry, DbError> {
    Ok(AuditEntry {
        id: Uuid::parse_str(&data_row.get::<String>(0)?)
            .map_err(|e| DbError::MappingError(format!("audit id: {e}")))?,
        user_id: Uuid::parse_str(&data_row.get::<String>(1)?)
            .map_err(|e| DbError::MappingError(format!("audit user: {e}")))?,
        action: data_row.get(2)?,
        resource_type: data_row.get(3)?,
        resource_id: data_row.get(4)?,
        metadata: serde_json::from_str(&data_row.get::<String>(5)?)
            .unwrap_or(serde_json::Value::Null),
        client_ip: data_row.get(6)?,
        client_agent: data_row.get(7)?,
        created_at: parse_ledger_timestamp(&data_row.get::<String>(8)?).unwrap_or_else(Utc::now),
    })
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/audit.rs]
