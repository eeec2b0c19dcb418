// INICIO DEL ARCHIVO [libs/infra/db/src/repositories/user.rs]
/*!
 * =================================================================
 * APARATO: USER REPOSITORY (V11.0 - TENANT ROOT)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE LA RAÍZ DE PROPIEDAD DEL TENANT
 *
 * VISION HIPER-HOLÍSTICA:
 * El email viaja siempre case-folded desde el dominio L2; la unicidad
 * física la sella el índice UNIQUE del Ledger y se proyecta como
 * 'Conflict' semántico hacia el perímetro.
 * =================================================================
 */

use crate::errors::DbError;
use crate::{now_rfc3339, parse_ledger_timestamp, StoreClient};
use crisol_domain_models::User;
use chrono::Utc;
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;

/// Repositorio de autoridad única para la raíz de tenants.
pub struct UserRepository {
    database_client: StoreClient,
}

impl UserRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Registra un nuevo tenant. El email debe llegar ya normalizado.
     *
     * # Errors:
     * - `DbError::Conflict`: email ya registrado.
     */
    #[instrument(skip(self, password_verifier), fields(email = %email))]
    pub async fn insert_user(&self, email: &str, password_verifier: &str) -> Result<User, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let user_identifier = Uuid::new_v4();
        let created_at_stamp = now_rfc3339();

        database_connection
            .execute(
                "INSERT INTO users (id, email, password_verifier, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_identifier.to_string(), email, password_verifier, created_at_stamp.clone()],
            )
            .await?;

        info!("👤 [TENANT_GENESIS]: User [{}] registered.", email);

        Ok(User {
            id: user_identifier,
            email: email.to_string(),
            password_verifier: password_verifier.to_string(),
            created_at: parse_ledger_timestamp(&created_at_stamp).unwrap_or_else(Utc::now),
        })
    }

    /// Localiza un tenant por su email canónico.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, email, password_verifier, created_at FROM users WHERE email = ?1",
                params![email],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(self.map_row_to_user(data_row)?)),
            None => Ok(None),
        }
    }

    /// Localiza un tenant por su identificador soberano.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, email, password_verifier, created_at FROM users WHERE id = ?1",
                params![user_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(self.map_row_to_user(data_row)?)),
            None => Ok(None),
        }
    }

    // --- ESTRATO DE MAPEO (PRIVATE SSoT) ---

    fn map_row_to_user(&self, data_row: Row) -> Result<User, DbError> {
        Ok(User {
            id: Uuid::parse_str(&data_row.get::<String>(0)?)
                .map_err(|e| DbError::MappingError(format!("user id: {e}")))?,
            email: data_row.get(1)?,
            password_verifier: data_row.get(2)?,
            created_at: parse_ledger_timestamp(&data_row.get::<String>(3)?)
                .unwrap_or_else(Utc::now),
        })
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/repositories/user.rs]
