// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: LEDGER ERROR CATALOG (V8.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. GUARDED TRANSITIONS: 'IllegalTransition' señala que un UPDATE
 *    guardado no alcanzó ninguna fila: el estado origen ya no rige.
 * 2. TENANT OPACITY: 'NotFound' cubre tanto la ausencia física como
 *    la propiedad ajena; el perímetro jamás distingue ambas.
 * 3. PANOPTICON COMPLIANCE: Prefijos de estrato para el renderizado
 *    cromático en el Dashboard.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    /// El recurso no existe o pertenece a otro tenant (opacidad absoluta).
    #[error("[L3_LEDGER_FAULT]: RESOURCE_NOT_FOUND")]
    NotFound,

    /// Violación de unicidad (nombre duplicado, llave de idempotencia).
    #[error("[L3_LEDGER_FAULT]: UNIQUENESS_VIOLATION -> {0}")]
    Conflict(String),

    /// Un UPDATE guardado no alcanzó filas: el estado origen ya no rige.
    #[error("[L3_LEDGER_FAULT]: ILLEGAL_STATE_TRANSITION")]
    IllegalTransition,
}

impl From<libsql::Error> for DbError {
    /// Clasifica las violaciones de unicidad como 'Conflict' semántico;
    /// el resto del catálogo libSQL fluye como 'QueryError'.
    fn from(database_fault: libsql::Error) -> Self {
        let rendered_fault = database_fault.to_string();
        if rendered_fault.contains("UNIQUE constraint failed") {
            DbError::Conflict(rendered_fault)
        } else {
            DbError::QueryError(database_fault)
        }
    }
}
