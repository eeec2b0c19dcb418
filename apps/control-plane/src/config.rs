// INICIO DEL ARCHIVO [apps/control-plane/src/config.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE CONFIGURATION (V6.0 - ENV SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: HIDRATACIÓN ÚNICA DE COORDENADAS DE ENTORNO
 *
 * VISION HIPER-HOLÍSTICA:
 * Toda variable de entorno se lee UNA vez en la ignición; el resto
 * del plano consume esta estructura inmutable. La llave maestra de
 * secretos se hidrata aparte en la Bóveda L1 (jamás viaja aquí).
 * =================================================================
 */

use crisol_domain_models::limits;
use std::env;

/// Coordenadas operativas del plano de control.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub database_url: String,
    pub database_auth_token: Option<String>,
    pub listen_port: u16,
    /// Secreto de firma HS256 de los tokens de sesión.
    pub session_signing_secret: String,
    pub session_ttl_hours: i64,
    pub runtime_socket_path: Option<String>,
    pub cors_allowed_origin: Option<String>,
    pub requests_per_minute: u32,
    pub sandbox_creates_per_minute: u32,
    pub auth_attempts_per_window: u32,
    pub auth_window_minutes: u64,
    pub sandbox_log_retention_rows: u32,
    pub log_retention_days: i64,
    pub audit_retention_days: i64,
}

impl ControlPlaneConfig {
    /**
     * Hidrata la configuración desde el entorno del proceso.
     *
     * # Panics:
     * La ausencia de DATABASE_URL o SESSION_SIGNING_SECRET aborta la
     * ignición: el plano no puede operar sin Ledger ni firma de sesión.
     */
    pub fn from_environment() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment."),
            database_auth_token: env::var("TURSO_AUTH_TOKEN").ok(),
            listen_port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            session_signing_secret: env::var("SESSION_SIGNING_SECRET")
                .expect("CRITICAL_FAULT: SESSION_SIGNING_SECRET not defined."),
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", 24),
            runtime_socket_path: env::var("RUNTIME_SOCKET_PATH").ok(),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
            requests_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 100),
            sandbox_creates_per_minute: parse_env("SANDBOX_CREATES_PER_MINUTE", 10),
            auth_attempts_per_window: parse_env("AUTH_ATTEMPTS_PER_WINDOW", 20),
            auth_window_minutes: parse_env("AUTH_WINDOW_MINUTES", 15),
            sandbox_log_retention_rows: parse_env(
                "SANDBOX_LOG_RETENTION",
                limits::SANDBOX_LOG_RETENTION_ROWS,
            ),
            log_retention_days: parse_env("LOG_RETENTION_DAYS", limits::LOG_RETENTION_DAYS),
            audit_retention_days: parse_env("AUDIT_RETENTION_DAYS", limits::AUDIT_RETENTION_DAYS),
        }
    }

    /// Coordenadas deterministas para el Proving Grounds (sin entorno).
    pub fn proving_grounds(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            database_auth_token: None,
            listen_port: 0,
            session_signing_secret: "proving-grounds-signing-secret".to_string(),
            session_ttl_hours: 24,
            runtime_socket_path: None,
            cors_allowed_origin: None,
            requests_per_minute: 100,
            sandbox_creates_per_minute: 10,
            auth_attempts_per_window: 20,
            auth_window_minutes: 15,
            sandbox_log_retention_rows: limits::SANDBOX_LOG_RETENTION_ROWS,
            log_retention_days: limits::LOG_RETENTION_DAYS,
            audit_retention_days: limits::AUDIT_RETENTION_DAYS,
        }
    }
}

fn parse_env<T: std::str::FromStr>(variable_name: &str, default_value: T) -> T {
    env::var(variable_name)
        .ok()
        .and_then(|raw_value| raw_value.parse().ok())
        .unwrap_or(default_value)
}
// FIN DEL ARCHIVO [apps/control-plane/src/config.rs]
