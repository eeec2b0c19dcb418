// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/environment.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT REPOSITORY (V18.0 - IMMUTABLE LINEAGE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PLANTILLAS DE TENANT Y LINAJE MONÓTONO DE VERSIONES
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. APPEND-ONLY LINEAGE: 'mint_next_version' lee la versión vigente,
 *    acuña 'version + 1' con herencia de campos y gira el puntero
 *    'current_version_id' dentro de UNA transacción. Ninguna versión
 *    previa se muta jamás.
 * 2. LATE-BOUND SECRETS: El mapa cifrado de la versión vigente es el
 *    único campo tratado como metadato tardío (ver DESIGN.md D1).
 * 3. TENANT OPACITY: Toda lectura viaja filtrada por user_id.
 *
 * # Mathematical Proof (Monotone Minting):
 * La transacción serializa a los acuñadores concurrentes; el índice
 * UNIQUE(environment_id, version) convierte cualquier carrera residual
 * en un 'Conflict' semántico en lugar de un linaje bifurcado.
 * =================================================================
 */

use crate::errors::DbError;
use crate::{now_rfc3339, parse_ledger_timestamp, StoreClient};
use crisol_domain_models::{
    CreateEnvironmentPayload, Environment, EnvironmentVersion, UpdateEnvironmentPayload,
};
use chrono::Utc;
use libsql::{params, Row};
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const VERSION_COLUMNS: &str = "id, environment_id, version, image, dockerfile, build_files, \
                               command, cpu, memory_mb, ports, env, secrets_encrypted, mounts, created_at";

/// Repositorio de autoridad única para plantillas y su linaje de versiones.
pub struct EnvironmentRepository {
    database_client: StoreClient,
}

impl EnvironmentRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /// Censo global de plantillas (medidores C8).
    pub async fn count_all(&self) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query("SELECT COUNT(*) FROM environments", ())
            .await?;

        let count: i64 = query_results
            .next()
            .await?
            .ok_or(DbError::MappingError("count sin fila".into()))?
            .get(0)?;
        Ok(count as u64)
    }

    /// Censo de plantillas del tenant (validación de cuota L4).
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<u32, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT COUNT(*) FROM environments WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await?;

        let count: i64 = query_results
            .next()
            .await?
            .ok_or(DbError::MappingError("count sin fila".into()))?
            .get(0)?;
        Ok(count as u32)
    }

    /**
     * Génesis atómico: inserta la plantilla, su versión 1 y gira el puntero
     * vigente en una sola transacción.
     *
     * # Errors:
     * - `DbError::Conflict`: nombre duplicado para el tenant.
     */
    #[instrument(skip(self, payload, secrets_encrypted), fields(name = %payload.name))]
    pub async fn insert_environment_with_version(
        &self,
        user_id: Uuid,
        payload: &CreateEnvironmentPayload,
        cpu: f64,
        memory_mb: u32,
        secrets_encrypted: &HashMap<String, String>,
    ) -> Result<(Environment, EnvironmentVersion), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let environment_identifier = Uuid::new_v4();
        let version_identifier = Uuid::new_v4();
        let genesis_stamp = now_rfc3339();

        database_transaction
            .execute(
                "INSERT INTO environments (id, user_id, name, current_version_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?4)",
                params![
                    environment_identifier.to_string(),
                    user_id.to_string(),
                    payload.name.clone(),
                    genesis_stamp.clone()
                ],
            )
            .await?;

        database_transaction
            .execute(
                "INSERT INTO environment_versions
                 (id, environment_id, version, image, dockerfile, build_files, command,
                  cpu, memory_mb, ports, env, secrets_encrypted, mounts, created_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    version_identifier.to_string(),
                    environment_identifier.to_string(),
                    payload.image.clone(),
                    payload.dockerfile.clone(),
                    encode_json(&payload.build_files)?,
                    payload.command.as_ref().map(encode_json).transpose()?,
                    cpu,
                    memory_mb as i64,
                    encode_json(&payload.ports)?,
                    encode_json(&payload.env)?,
                    encode_json(secrets_encrypted)?,
                    encode_json(&payload.mounts)?,
                    genesis_stamp.clone()
                ],
            )
            .await?;

        database_transaction
            .execute(
                "UPDATE environments SET current_version_id = ?2 WHERE id = ?1",
                params![environment_identifier.to_string(), version_identifier.to_string()],
            )
            .await?;

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        info!("🏗️ [ENV_GENESIS]: Environment [{}] crystallized at version 1.", payload.name);

        let genesis_instant = parse_ledger_timestamp(&genesis_stamp).unwrap_or_else(Utc::now);
        let environment = Environment {
            id: environment_identifier,
            user_id,
            name: payload.name.clone(),
            current_version_id: Some(version_identifier),
            created_at: genesis_instant,
            updated_at: genesis_instant,
        };
        let version = self.find_version(version_identifier).await?.ok_or(DbError::NotFound)?;

        Ok((environment, version))
    }

    /// Localiza una plantilla del tenant (opacidad absoluta entre tenants).
    pub async fn find_by_id(
        &self,
        user_id: Uuid,
        environment_id: Uuid,
    ) -> Result<Option<Environment>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, user_id, name, current_version_id, created_at, updated_at
                 FROM environments WHERE id = ?1 AND user_id = ?2",
                params![environment_id.to_string(), user_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(self.map_row_to_environment(data_row)?)),
            None => Ok(None),
        }
    }

    /// Inventario completo de plantillas del tenant.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Environment>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, user_id, name, current_version_id, created_at, updated_at
                 FROM environments WHERE user_id = ?1 ORDER BY created_at DESC",
                params![user_id.to_string()],
            )
            .await?;

        let mut environments_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            environments_collection.push(self.map_row_to_environment(data_row)?);
        }
        Ok(environments_collection)
    }

    /// Localiza una versión por su identificador soberano.
    pub async fn find_version(
        &self,
        version_id: Uuid,
    ) -> Result<Option<EnvironmentVersion>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                &format!("SELECT {VERSION_COLUMNS} FROM environment_versions WHERE id = ?1"),
                params![version_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(self.map_row_to_version(data_row)?)),
            None => Ok(None),
        }
    }

    /// Localiza una versión verificando su pertenencia al linaje indicado.
    pub async fn find_version_of_environment(
        &self,
        environment_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<EnvironmentVersion>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM environment_versions
                     WHERE id = ?1 AND environment_id = ?2"
                ),
                params![version_id.to_string(), environment_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(self.map_row_to_version(data_row)?)),
            None => Ok(None),
        }
    }

    /// Versión vigente de una plantilla (puntero 'current_version_id').
    pub async fn current_version(
        &self,
        environment: &Environment,
    ) -> Result<Option<EnvironmentVersion>, DbError> {
        match environment.current_version_id {
            Some(version_id) => self.find_version(version_id).await,
            None => Ok(None),
        }
    }

    /**
     * Acuña la siguiente versión del linaje con herencia de campos.
     *
     * # Logic:
     * 1. Lee la versión vigente DENTRO de la transacción.
     * 2. Construye 'version + 1' heredando los campos no parcheados y
     *    reteniendo el mapa de secretos cifrados existente.
     * 3. Inserta la nueva versión y gira 'current_version_id'.
     */
    #[instrument(skip(self, patch))]
    pub async fn mint_next_version(
        &self,
        environment_id: Uuid,
        patch: &UpdateEnvironmentPayload,
    ) -> Result<EnvironmentVersion, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        // FASE 1: Lectura de la versión vigente bajo el túnel transaccional
        let mut current_version_results = database_transaction
            .query(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM environment_versions v
                     JOIN environments e ON e.current_version_id = v.id
                     WHERE e.id = ?1"
                ),
                params![environment_id.to_string()],
            )
            .await?;

        let current_version = match current_version_results.next().await? {
            Some(data_row) => self.map_row_to_version(data_row)?,
            None => return Err(DbError::NotFound),
        };

        // FASE 2: Acuñado de la sucesora con herencia right-biased del parche
        let minted_identifier = Uuid::new_v4();
        let minted_stamp = now_rfc3339();
        let minted_version_number = current_version.version + 1;

        let next_image = patch.image.clone().or_else(|| current_version.image.clone());
        let next_dockerfile = patch.dockerfile.clone().or_else(|| current_version.dockerfile.clone());
        let next_build_files = patch.build_files.clone().unwrap_or_else(|| current_version.build_files.clone());
        let next_command = patch.command.clone().or_else(|| current_version.command.clone());
        let next_cpu = patch.cpu.unwrap_or(current_version.cpu);
        let next_memory = patch.memory.unwrap_or(current_version.memory_mb);
        let next_ports = patch.ports.clone().unwrap_or_else(|| current_version.ports.clone());
        let next_env = patch.env.clone().unwrap_or_else(|| current_version.env.clone());
        let next_mounts = patch.mounts.clone().unwrap_or_else(|| current_version.mounts.clone());

        database_transaction
            .execute(
                "INSERT INTO environment_versions
                 (id, environment_id, version, image, dockerfile, build_files, command,
                  cpu, memory_mb, ports, env, secrets_encrypted, mounts, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    minted_identifier.to_string(),
                    environment_id.to_string(),
                    minted_version_number as i64,
                    next_image,
                    next_dockerfile,
                    encode_json(&next_build_files)?,
                    next_command.as_ref().map(encode_json).transpose()?,
                    next_cpu,
                    next_memory as i64,
                    encode_json(&next_ports)?,
                    encode_json(&next_env)?,
                    encode_json(&current_version.secrets_encrypted)?,
                    encode_json(&next_mounts)?,
                    minted_stamp
                ],
            )
            .await?;

        database_transaction
            .execute(
                "UPDATE environments SET current_version_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![environment_id.to_string(), minted_identifier.to_string(), now_rfc3339()],
            )
            .await?;

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        info!(
            "📜 [LINEAGE_MINT]: Environment {} advanced to version {}.",
            environment_id, minted_version_number
        );

        self.find_version(minted_identifier).await?.ok_or(DbError::NotFound)
    }

    /**
     * Sella el mapa de secretos cifrados de la versión VIGENTE in-place.
     * Único metadato tardío del linaje (ver DESIGN.md D1).
     */
    #[instrument(skip(self, sealed_secrets))]
    pub async fn set_current_secrets(
        &self,
        environment_id: Uuid,
        sealed_secrets: &HashMap<String, String>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected_count = database_connection
            .execute(
                "UPDATE environment_versions SET secrets_encrypted = ?2
                 WHERE id = (SELECT current_version_id FROM environments WHERE id = ?1)",
                params![environment_id.to_string(), encode_json(sealed_secrets)?],
            )
            .await?;

        if rows_affected_count == 0 {
            return Err(DbError::NotFound);
        }

        database_connection
            .execute(
                "UPDATE environments SET updated_at = ?2 WHERE id = ?1",
                params![environment_id.to_string(), now_rfc3339()],
            )
            .await?;

        Ok(())
    }

    /**
     * Incineración en cascada: logs → sandboxes → versiones → plantilla.
     * Los contenedores vivos deben haberse destruido antes en L4.
     */
    #[instrument(skip(self))]
    pub async fn delete_environment(
        &self,
        user_id: Uuid,
        environment_id: Uuid,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        database_transaction
            .execute(
                "DELETE FROM sandbox_logs WHERE sandbox_id IN
                 (SELECT id FROM sandboxes WHERE environment_id = ?1 AND user_id = ?2)",
                params![environment_id.to_string(), user_id.to_string()],
            )
            .await?;
        database_transaction
            .execute(
                "DELETE FROM sandboxes WHERE environment_id = ?1 AND user_id = ?2",
                params![environment_id.to_string(), user_id.to_string()],
            )
            .await?;
        database_transaction
            .execute(
                "DELETE FROM environment_versions WHERE environment_id = ?1
                 AND EXISTS (SELECT 1 FROM environments WHERE id = ?1 AND user_id = ?2)",
                params![environment_id.to_string(), user_id.to_string()],
            )
            .await?;
        let rows_affected_count = database_transaction
            .execute(
                "DELETE FROM environments WHERE id = ?1 AND user_id = ?2",
                params![environment_id.to_string(), user_id.to_string()],
            )
            .await?;

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        if rows_affected_count == 0 {
            warn!("🗑️ [ENV_PURGE]: Environment {} void or foreign; nothing incinerated.", environment_id);
        } else {
            info!("🗑️ [ENV_PURGE]: Environment {} and descendants incinerated.", environment_id);
        }
        Ok(rows_affected_count > 0)
    }

    // --- ESTRATO DE MAPEO (PRIVATE SSoT) ---

    fn map_row_to_environment(&self, data_row: Row) -> Result<Environment, DbError> {
        Ok(Environment {
            id: parse_uuid(&data_row.get::<String>(0)?)?,
            user_id: parse_uuid(&data_row.get::<String>(1)?)?,
            name: data_row.get(2)?,
            current_version_id: data_row
                .get::<Option<String>>(3)?
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            created_at: parse_ledger_timestamp(&data_row.get::<String>(4)?)
                .unwrap_or_else(Utc::now),
            updated_at: parse_ledger_timestamp(&data_row.get::<String>(5)?)
                .unwrap_or_else(Utc::now),
        })
    }

    fn map_row_to_version(&self, data_row: Row) -> Result<EnvironmentVersion, DbError> {
        Ok(EnvironmentVersion {
            id: parse_uuid(&data_row.get::<String>(0)?)?,
            environment_id: parse_uuid(&data_row.get::<String>(1)?)?,
            version: data_row.get::<i64>(2)? as u32,
            image: data_row.get(3)?,
            dockerfile: data_row.get(4)?,
            build_files: decode_json(&data_row.get::<String>(5)?)?,
            command: data_row
                .get::<Option<String>>(6)?
                .as_deref()
                .map(decode_json)
                .transpose()?,
            cpu: data_row.get(7)?,
            memory_mb: data_row.get::<i64>(8)? as u32,
            ports: decode_json(&data_row.get::<String>(9)?)?,
            env: decode_json(&data_row.get::<String>(10)?)?,
            secrets_encrypted: decode_json(&data_row.get::<String>(11)?)?,
            mounts: decode_json(&data_row.get::<String>(12)?)?,
            created_at: parse_ledger_timestamp(&data_row.get::<String>(13)?)
                .unwrap_or_else(Utc::now),
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::MappingError(format!("uuid: {e}")))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|e| DbError::MappingError(format!("encode: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, DbError> {
    serde_json::from_str(raw).map_err(|e| DbError::MappingError(format!("decode: {e}")))
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/environment.rs]
