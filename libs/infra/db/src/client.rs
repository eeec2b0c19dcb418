// INICIO DEL ARCHIVO [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: LEDGER CONNECTION CLIENT (V25.1 - CONTROL PLANE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES TÁCTICOS Y PERSISTENCIA ACID
 *
 * # Mathematical Proof (In-Memory Consistency):
 * En modo RAM el cliente aplica el ancla de persistencia ANTES del
 * bootstrap del esquema, garantizando que las tablas residan en un
 * segmento de memoria compartido visible entre hilos de prueba.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_control_plane_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Cliente del Ledger del plano de control. Los handles de conexión son
/// baratos: cada operación adquiere el suyo y jamás lo retiene a través
/// de streams de larga vida.
#[derive(Clone)]
pub struct StoreClient {
    internal_database_driver: Arc<Database>,
    /// Mantiene la base viva en memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl StoreClient {
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, DbError> {
        if database_connection_url.is_empty() {
            return Err(DbError::ConfigurationError("DATABASE_URL_UNDEFINED".into()));
        }

        info!("🔌 [LEDGER]: Initiating tactical link synchronization to [{}]", database_connection_url);

        let is_remote = database_connection_url.starts_with("libsql://")
            || database_connection_url.starts_with("https://");

        let is_memory = database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory");

        let database_driver = if is_remote {
            let token = database_access_token.ok_or_else(|| {
                DbError::ConfigurationError("Remote access denied (Token missing)".into())
            })?;
            Builder::new_remote(database_connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_connection_url).build().await
        }
        .map_err(|e| DbError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {e}")))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // En modo memoria, el ancla se abre ANTES que cualquier otra operación
            let anchor_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("ANCHOR_FAULT: {e}")))?;

            apply_control_plane_schema(&anchor_connection)
                .await
                .map_err(|e| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {e}")))?;

            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [LEDGER]: Memory strata solidified and anchored.");
        } else {
            // En modo Disco/Remoto, una conexión temporal ejecuta el bootstrap
            let bootstrap_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("BOOTSTRAP_LINK_FAULT: {e}")))?;
            apply_control_plane_schema(&bootstrap_connection)
                .await
                .map_err(|e| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {e}")))?;
        }

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    /// Adquiere un handle de conexión fresco para una operación puntual.
    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.internal_database_driver.connect().map_err(|e| {
            error!("⚠️ [POOL_FAULT]: Connection allocation failed: {e}");
            DbError::ConnectionError(e.to_string())
        })
    }
}
// FIN DEL ARCHIVO [libs/infra/db/src/client.rs]
