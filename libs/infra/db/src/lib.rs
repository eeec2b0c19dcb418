// [libs/infra/db/src/lib.rs]
pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::StoreClient;
pub use errors::DbError;

use chrono::{DateTime, SecondsFormat, Utc};

/// Marca temporal canónica del Ledger: RFC3339 UTC con milisegundos fijos.
/// El ancho constante garantiza que la comparación lexicográfica en SQL
/// coincida con el orden cronológico.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serializa una marca temporal arbitraria al formato canónico del Ledger.
pub fn to_ledger_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rehidrata una marca temporal canónica del Ledger.
pub fn parse_ledger_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
