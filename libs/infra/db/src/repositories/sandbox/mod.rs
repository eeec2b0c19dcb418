// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/sandbox/mod.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX REPOSITORY (V21.0 - LIFECYCLE LEDGER GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA ATÓMICA DE LA MÁQUINA DE ESTADOS
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. GUARDED SQL: Cada transición viaja como UPDATE con guarda de
 *    estado origen (ver queries.rs); cero filas => IllegalTransition.
 * 2. IDEMPOTENCY SHIELD: La carrera de creadores concurrentes colapsa
 *    en el índice UNIQUE y el perdedor relee la fila ganadora.
 * 3. TENANT OPACITY: Toda lectura de superficie viaja con user_id.
 *
 * # Mathematical Proof (Serialized Writers):
 * Al encapsular la guarda dentro del WHERE del UPDATE, el motor actúa
 * como semáforo por fila: dos transiciones simultáneas sobre el mismo
 * sandbox jamás observan ambas la misma coordenada origen.
 * =================================================================
 */

pub mod queries;

use crate::errors::DbError;
use crate::repositories::sandbox::queries as sql_registry;
use crate::{parse_ledger_timestamp, to_ledger_timestamp, StoreClient};
use chrono::{DateTime, Utc};
use crisol_domain_models::{PortMapping, Sandbox, SandboxPhase, SandboxStatus};
use libsql::{params, Row};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Repositorio de autoridad única para instancias de sandbox.
pub struct SandboxRepository {
    database_client: StoreClient,
}

impl SandboxRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /// Censo de cuota: instancias no terminales del tenant.
    pub async fn count_live_for_user(&self, user_id: Uuid) -> Result<u32, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(sql_registry::COUNT_LIVE_FOR_QUOTA, params![user_id.to_string()])
            .await?;

        let count: i64 = query_results
            .next()
            .await?
            .ok_or(DbError::MappingError("count sin fila".into()))?
            .get(0)?;
        Ok(count as u32)
    }

    /// Instancias vivas ancladas a un Environment (veto de incineración).
    pub async fn count_live_for_environment(&self, environment_id: Uuid) -> Result<u32, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(sql_registry::COUNT_LIVE_FOR_ENVIRONMENT, params![environment_id.to_string()])
            .await?;

        let count: i64 = query_results
            .next()
            .await?
            .ok_or(DbError::MappingError("count sin fila".into()))?
            .get(0)?;
        Ok(count as u32)
    }

    /**
     * Génesis de la fila en coordenadas `pending/creating`.
     *
     * # Errors:
     * - `DbError::Conflict`: la llave de idempotencia ya está acuñada
     *   (el llamador debe releer a la ganadora).
     */
    #[instrument(skip(self, sandbox), fields(name = %sandbox.name))]
    pub async fn insert_pending(&self, sandbox: &Sandbox) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                sql_registry::INSERT_PENDING_SANDBOX,
                params![
                    sandbox.id.to_string(),
                    sandbox.user_id.to_string(),
                    sandbox.environment_id.to_string(),
                    sandbox.environment_version_id.to_string(),
                    sandbox.name.clone(),
                    encode_ports(&sandbox.ports)?,
                    to_ledger_timestamp(sandbox.created_at),
                    sandbox.expires_at.map(to_ledger_timestamp)
                ],
            )
            .await?;

        info!("📦 [SANDBOX_GENESIS]: Row {} crystallized as pending/creating.", sandbox.id);
        Ok(())
    }

    /// Localiza por llave de idempotencia `(user, environment, name)`.
    pub async fn find_by_identity(
        &self,
        user_id: Uuid,
        environment_id: Uuid,
        name: &str,
    ) -> Result<Option<Sandbox>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM sandboxes
                     WHERE user_id = ?1 AND environment_id = ?2 AND name = ?3",
                    sql_registry::SANDBOX_COLUMNS
                ),
                params![user_id.to_string(), environment_id.to_string(), name],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_sandbox(data_row)?)),
            None => Ok(None),
        }
    }

    /// Localiza una instancia del tenant (opacidad absoluta entre tenants).
    pub async fn find_by_id(
        &self,
        user_id: Uuid,
        sandbox_id: Uuid,
    ) -> Result<Option<Sandbox>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM sandboxes WHERE id = ?1 AND user_id = ?2",
                    sql_registry::SANDBOX_COLUMNS
                ),
                params![sandbox_id.to_string(), user_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_sandbox(data_row)?)),
            None => Ok(None),
        }
    }

    /// Recarga interna sin filtro de tenant (provisioner y daemons C8).
    pub async fn reload(&self, sandbox_id: Uuid) -> Result<Option<Sandbox>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM sandboxes WHERE id = ?1",
                    sql_registry::SANDBOX_COLUMNS
                ),
                params![sandbox_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_sandbox(data_row)?)),
            None => Ok(None),
        }
    }

    /// Inventario filtrable del tenant (status / environment).
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status_filter: Option<SandboxStatus>,
        environment_filter: Option<Uuid>,
    ) -> Result<Vec<Sandbox>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_statement = format!(
            "SELECT {} FROM sandboxes WHERE user_id = ?1",
            sql_registry::SANDBOX_COLUMNS
        );
        if status_filter.is_some() {
            query_statement.push_str(" AND status = ?2");
        }
        if environment_filter.is_some() {
            query_statement.push_str(if status_filter.is_some() {
                " AND environment_id = ?3"
            } else {
                " AND environment_id = ?2"
            });
        }
        query_statement.push_str(" ORDER BY created_at DESC");

        let mut query_results = match (status_filter, environment_filter) {
            (Some(status), Some(environment_id)) => {
                database_connection
                    .query(
                        &query_statement,
                        params![user_id.to_string(), status.as_str(), environment_id.to_string()],
                    )
                    .await?
            }
            (Some(status), None) => {
                database_connection
                    .query(&query_statement, params![user_id.to_string(), status.as_str()])
                    .await?
            }
            (None, Some(environment_id)) => {
                database_connection
                    .query(&query_statement, params![user_id.to_string(), environment_id.to_string()])
                    .await?
            }
            (None, None) => {
                database_connection
                    .query(&query_statement, params![user_id.to_string()])
                    .await?
            }
        };

        let mut sandboxes_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            sandboxes_collection.push(map_row_to_sandbox(data_row)?);
        }
        Ok(sandboxes_collection)
    }

    // --- ESTRATO DE TRANSICIONES GUARDADAS ---

    /// Sella la referencia física del contenedor (solo en `pending`).
    pub async fn attach_container_ref(
        &self,
        sandbox_id: Uuid,
        container_ref: &str,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::ATTACH_CONTAINER_REF,
            params![sandbox_id.to_string(), container_ref],
        )
        .await
    }

    /// Avance de aprovisionamiento (el estrangulado Δ ≥ 5% ocurre en L4).
    pub async fn record_progress(
        &self,
        sandbox_id: Uuid,
        progress: u8,
        status_text: &str,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                sql_registry::RECORD_PROVISION_PROGRESS,
                params![sandbox_id.to_string(), progress as i64, status_text],
            )
            .await?;
        Ok(())
    }

    /// pending/creating → pending/starting.
    pub async fn mark_starting(&self, sandbox_id: Uuid) -> Result<(), DbError> {
        self.execute_guarded(sql_registry::MARK_STARTING, params![sandbox_id.to_string()]).await
    }

    /// pending/starting → running/healthy.
    pub async fn mark_running_from_starting(
        &self,
        sandbox_id: Uuid,
        started_at: DateTime<Utc>,
        status_text: &str,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::MARK_RUNNING_FROM_STARTING,
            params![sandbox_id.to_string(), to_ledger_timestamp(started_at), status_text],
        )
        .await
    }

    /// stopped/stopped → running/healthy.
    pub async fn mark_running_from_stopped(
        &self,
        sandbox_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::MARK_RUNNING_FROM_STOPPED,
            params![sandbox_id.to_string(), to_ledger_timestamp(started_at)],
        )
        .await
    }

    /// running/healthy → stopped/stopped.
    pub async fn mark_stopped(
        &self,
        sandbox_id: Uuid,
        stopped_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::MARK_STOPPED_FROM_RUNNING,
            params![sandbox_id.to_string(), to_ledger_timestamp(stopped_at)],
        )
        .await
    }

    /// Colapso no terminal → error/failed.
    pub async fn mark_failed(&self, sandbox_id: Uuid, reason: &str) -> Result<(), DbError> {
        warn!("💀 [LIFECYCLE_COLLAPSE]: Sandbox {} descending to error/failed: {}", sandbox_id, reason);
        self.execute_guarded(sql_registry::MARK_FAILED, params![sandbox_id.to_string(), reason])
            .await
    }

    /// pending|running → expired/stopped (barrido TTL).
    pub async fn mark_expired(
        &self,
        sandbox_id: Uuid,
        stopped_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::MARK_EXPIRED,
            params![sandbox_id.to_string(), to_ledger_timestamp(stopped_at)],
        )
        .await
    }

    /// Re-estampa la ignición tras un restart.
    pub async fn restamp_started(
        &self,
        sandbox_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.execute_guarded(
            sql_registry::RESTAMP_STARTED,
            params![sandbox_id.to_string(), to_ledger_timestamp(started_at)],
        )
        .await
    }

    /// Candidatas vencidas para el barrido TTL.
    pub async fn select_expired(&self, horizon: DateTime<Utc>) -> Result<Vec<Sandbox>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(sql_registry::SELECT_EXPIRED_CANDIDATES, params![to_ledger_timestamp(horizon)])
            .await?;

        let mut expired_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            expired_collection.push(map_row_to_sandbox(data_row)?);
        }
        Ok(expired_collection)
    }

    /**
     * Incineración física (fila + logs descendientes) en una transacción.
     * Retorna `false` si la fila no existía o pertenece a otro tenant;
     * las destrucciones concurrentes deduplican aquí.
     */
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, sandbox_id: Uuid) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        database_transaction
            .execute(sql_registry::DELETE_SANDBOX_LOGS, params![sandbox_id.to_string()])
            .await?;

        let mut delete_results = database_transaction
            .query(sql_registry::DELETE_SANDBOX, params![sandbox_id.to_string(), user_id.to_string()])
            .await?;
        let row_existed = delete_results.next().await?.is_some();

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        if row_existed {
            info!("🗑️ [SANDBOX_PURGE]: Row {} incinerated with descendants.", sandbox_id);
        }
        Ok(row_existed)
    }

    /// Censo por estado para los medidores del plano de control.
    pub async fn count_by_status(&self) -> Result<HashMap<String, u64>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection.query(sql_registry::COUNT_BY_STATUS, ()).await?;

        let mut census = HashMap::new();
        while let Some(data_row) = query_results.next().await? {
            let status_label: String = data_row.get(0)?;
            let count: i64 = data_row.get(1)?;
            census.insert(status_label, count as u64);
        }
        Ok(census)
    }

    // --- ESTRATO DE DESPACHO GUARDADO (PRIVATE SSoT) ---

    /**
     * Ejecuta un UPDATE guardado con contrato RETURNING.
     *
     * # Errors:
     * `DbError::IllegalTransition` cuando la guarda no alcanza filas:
     * el estado origen esperado ya no rige sobre la fila.
     */
    async fn execute_guarded(
        &self,
        guarded_statement: &str,
        bound_params: impl libsql::params::IntoParams,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut guarded_results = database_connection.query(guarded_statement, bound_params).await?;

        if guarded_results.next().await?.is_none() {
            debug!("⚪ [GUARD_MISS]: Guarded transition reached zero rows.");
            return Err(DbError::IllegalTransition);
        }
        Ok(())
    }
}

// --- ESTRATO DE MAPEO (SSoT COMPARTIDO DEL MÓDULO) ---

pub(crate) fn map_row_to_sandbox(data_row: Row) -> Result<Sandbox, DbError> {
    let status_raw: String = data_row.get(6)?;
    let phase_raw: String = data_row.get(7)?;

    Ok(Sandbox {
        id: parse_uuid(&data_row.get::<String>(0)?)?,
        user_id: parse_uuid(&data_row.get::<String>(1)?)?,
        environment_id: parse_uuid(&data_row.get::<String>(2)?)?,
        environment_version_id: parse_uuid(&data_row.get::<String>(3)?)?,
        name: data_row.get(4)?,
        container_ref: data_row.get(5)?,
        status: SandboxStatus::parse(&status_raw)
            .ok_or_else(|| DbError::MappingError(format!("status desconocido: {status_raw}")))?,
        phase: SandboxPhase::parse(&phase_raw)
            .ok_or_else(|| DbError::MappingError(format!("phase desconocida: {phase_raw}")))?,
        ports: decode_ports(&data_row.get::<String>(8)?)?,
        created_at: parse_ledger_timestamp(&data_row.get::<String>(9)?).unwrap_or_else(Utc::now),
        started_at: data_row.get::<Option<String>>(10)?.as_deref().and_then(parse_ledger_timestamp),
        stopped_at: data_row.get::<Option<String>>(11)?.as_deref().and_then(parse_ledger_timestamp),
        expires_at: data_row.get::<Option<String>>(12)?.as_deref().and_then(parse_ledger_timestamp),
        provision_progress: data_row.get::<i64>(13)? as u8,
        provision_status_text: data_row.get(14)?,
    })
}

fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::MappingError(format!("uuid: {e}")))
}

fn encode_ports(ports: &[PortMapping]) -> Result<String, DbError> {
    serde_json::to_string(ports).map_err(|e| DbError::MappingError(format!("ports encode: {e}")))
}

fn decode_ports(raw: &str) -> Result<Vec<PortMapping>, DbError> {
    serde_json::from_str(raw).map_err(|e| DbError::MappingError(format!("ports decode: {e}")))
}

// FIN DEL ARCHIVO [libs/infra/db/src/repositories/sandbox/mod.rs]
