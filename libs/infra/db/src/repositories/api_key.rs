// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/api_key.rs]
/*!
 * =================================================================
 * APARATO: API KEY REPOSITORY (V9.0 - LONG-LIVED CREDENTIALS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CICLO DE VIDA DE LLAVES API POR PREFIJO
 *
 * VISION HIPER-HOLÍSTICA:
 * La localización es por prefijo indexado; la verificación del digest
 * pertenece al Guardián L4 (comparación de tiempo constante). Solo
 * llaves sin sello de revocación autentican.
 * =================================================================
 */

use crate::errors::DbError;
use crate::{now_rfc3339, parse_ledger_timestamp, StoreClient};
use crisol_domain_models::ApiKey;
use chrono::Utc;
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct ApiKeyRepository {
    database_client: StoreClient,
}

impl ApiKeyRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Acuña una nueva llave API. El secreto completo jamás toca el Ledger;
     * solo su digest SHA-256 y el prefijo de localización.
     */
    #[instrument(skip(self, hashed_secret), fields(prefix = %prefix))]
    pub async fn insert_key(
        &self,
        user_id: Uuid,
        prefix: &str,
        hashed_secret: &str,
        name: &str,
    ) -> Result<ApiKey, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let key_identifier = Uuid::new_v4();
        let created_at_stamp = now_rfc3339();

        database_connection
            .execute(
                "INSERT INTO api_keys (id, user_id, prefix, hashed_secret, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key_identifier.to_string(),
                    user_id.to_string(),
                    prefix,
                    hashed_secret,
                    name,
                    created_at_stamp.clone()
                ],
            )
            .await?;

        info!("🗝️ [KEY_FORGED]: API key [{}…] minted for tenant.", prefix);

        Ok(ApiKey {
            id: key_identifier,
            user_id,
            prefix: prefix.to_string(),
            hashed_secret: hashed_secret.to_string(),
            name: name.to_string(),
            created_at: parse_ledger_timestamp(&created_at_stamp).unwrap_or_else(Utc::now),
            last_used_at: None,
            revoked_at: None,
        })
    }

    /// Candidatas activas para un prefijo (la verificación ocurre en L4).
    pub async fn find_active_by_prefix(&self, prefix: &str) -> Result<Vec<ApiKey>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, user_id, prefix, hashed_secret, name, created_at, last_used_at, revoked_at
                 FROM api_keys WHERE prefix = ?1 AND revoked_at IS NULL",
                params![prefix],
            )
            .await?;

        let mut candidate_keys = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            candidate_keys.push(self.map_row_to_api_key(data_row)?);
        }
        Ok(candidate_keys)
    }

    /// Inventario de llaves del tenant (metadatos; el digest no se proyecta).
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, user_id, prefix, hashed_secret, name, created_at, last_used_at, revoked_at
                 FROM api_keys WHERE user_id = ?1 ORDER BY created_at DESC",
                params![user_id.to_string()],
            )
            .await?;

        let mut keys_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            keys_collection.push(self.map_row_to_api_key(data_row)?);
        }
        Ok(keys_collection)
    }

    /// Estampa el último uso tras una autenticación exitosa.
    pub async fn stamp_last_used(&self, key_id: Uuid) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE api_keys SET last_used_at = ?2 WHERE id = ?1",
                params![key_id.to_string(), now_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /**
     * Sella la revocación de una llave del tenant.
     * Retorna `false` si la llave no existe o pertenece a otro tenant.
     */
    #[instrument(skip(self))]
    pub async fn revoke(&self, user_id: Uuid, key_id: Uuid) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected_count = database_connection
            .execute(
                "UPDATE api_keys SET revoked_at = ?3
                 WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL",
                params![key_id.to_string(), user_id.to_string(), now_rfc3339()],
            )
            .await?;

        if rows_affected_count > 0 {
            info!("🚫 [KEY_REVOKED]: API key {} sealed.", key_id);
        }
        Ok(rows_affected_count > 0)
    }

    // --- ESTRATO DE MAPEO (PRIVATE SSoT) ---

    fn map_row_to_api_key(&self, data_row: Row) -> Result<ApiKey, DbError> {
        Ok(ApiKey {
            id: Uuid::parse_str(&data_row.get::<String>(0)?)
                .map_err(|e| DbError::MappingError(format!("api key id: {e}")))?,
            user_id: Uuid::parse_str(&data_row.get::<String>(1)?)
                .map_err(|e| DbError::MappingError(format!("api key user: {e}")))?,
            prefix: data_row.get(2)?,
            hashed_secret: data_row.get(3)?,
            name: data_row.get(4)?,
            created_at: parse_ledger_timestamp(&data_row.get::<String>(5)?)
                .unwrap_or_else(Utc::now),
            last_used_at: data_row
                .get::<Option<String>>(6)?
                .as_deref()
                .and_then(parse_ledger_timestamp),
            revoked_at: data_row
                .get::<Option<String>>(7)?
                .as_deref()
                .and_then(parse_ledger_timestamp),
        })
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/api_key.rs]
