// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: CONTROL PLANE DATABASE SCHEMA (V7.0 - TENANT STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. OWNERSHIP CHAIN: users → environments → versions → sandboxes → logs.
 * 2. IDEMPOTENCY KEYS: UNIQUE(user_id, environment_id, name) en
 *    sandboxes; UNIQUE(environment_id, version) en versiones.
 * 3. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 4. PERFORMANCE: Índices de aceleración para barridos TTL y colas.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del plano de control Crisol.
 */
const CONTROL_PLANE_TABLES: &[(&str, &str)] = &[
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_verifier TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_API_KEYS", r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            prefix TEXT NOT NULL,
            hashed_secret TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used_at TEXT,
            revoked_at TEXT
        );
    "#),
    ("TABLE_ENVIRONMENTS", r#"
        CREATE TABLE IF NOT EXISTS environments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            current_version_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, name)
        );
    "#),
    ("TABLE_ENVIRONMENT_VERSIONS", r#"
        CREATE TABLE IF NOT EXISTS environment_versions (
            id TEXT PRIMARY KEY,
            environment_id TEXT NOT NULL REFERENCES environments(id),
            version INTEGER NOT NULL,
            image TEXT,
            dockerfile TEXT,
            build_files TEXT NOT NULL DEFAULT '{}',
            command TEXT,
            cpu REAL NOT NULL,
            memory_mb INTEGER NOT NULL,
            ports TEXT NOT NULL DEFAULT '[]',
            env TEXT NOT NULL DEFAULT '{}',
            secrets_encrypted TEXT NOT NULL DEFAULT '{}',
            mounts TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            UNIQUE(environment_id, version)
        );
    "#),
    ("TABLE_SANDBOXES", r#"
        CREATE TABLE IF NOT EXISTS sandboxes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            environment_id TEXT NOT NULL REFERENCES environments(id),
            environment_version_id TEXT NOT NULL REFERENCES environment_versions(id),
            name TEXT NOT NULL,
            container_ref TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            phase TEXT NOT NULL DEFAULT 'creating',
            ports TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            started_at TEXT,
            stopped_at TEXT,
            expires_at TEXT,
            provision_progress INTEGER NOT NULL DEFAULT 0,
            provision_status TEXT NOT NULL DEFAULT '',
            UNIQUE(user_id, environment_id, name)
        );
    "#),
    ("TABLE_SANDBOX_LOGS", r#"
        CREATE TABLE IF NOT EXISTS sandbox_logs (
            id TEXT PRIMARY KEY,
            sandbox_id TEXT NOT NULL REFERENCES sandboxes(id),
            stream TEXT NOT NULL,
            text TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
    "#),
    ("TABLE_AUDIT_LOGS", r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            action TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            client_ip TEXT,
            client_agent TEXT,
            created_at TEXT NOT NULL
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que despliegues previos adquieran las columnas nuevas.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("SANDBOX_PROGRESS", "ALTER TABLE sandboxes ADD COLUMN provision_progress INTEGER NOT NULL DEFAULT 0"),
    ("SANDBOX_PROGRESS_TEXT", "ALTER TABLE sandboxes ADD COLUMN provision_status TEXT NOT NULL DEFAULT ''"),
    ("SANDBOX_EXPIRY", "ALTER TABLE sandboxes ADD COLUMN expires_at TEXT"),
    ("API_KEY_REVOCATION", "ALTER TABLE api_keys ADD COLUMN revoked_at TEXT"),
    ("VERSION_MOUNTS", "ALTER TABLE environment_versions ADD COLUMN mounts TEXT NOT NULL DEFAULT '[]'"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza barridos TTL, colas de logs y búsquedas por prefijo.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_API_KEYS_PREFIX", "CREATE INDEX IF NOT EXISTS idx_api_keys_prefix ON api_keys(prefix);"),
    ("IDX_ENVIRONMENTS_OWNER", "CREATE INDEX IF NOT EXISTS idx_environments_owner ON environments(user_id);"),
    ("IDX_VERSIONS_LINEAGE", "CREATE INDEX IF NOT EXISTS idx_versions_lineage ON environment_versions(environment_id, version);"),
    ("IDX_SANDBOXES_OWNER", "CREATE INDEX IF NOT EXISTS idx_sandboxes_owner ON sandboxes(user_id, status);"),
    ("IDX_SANDBOXES_EXPIRY", "CREATE INDEX IF NOT EXISTS idx_sandboxes_expiry ON sandboxes(expires_at) WHERE expires_at IS NOT NULL;"),
    ("IDX_LOGS_TAIL", "CREATE INDEX IF NOT EXISTS idx_logs_tail ON sandbox_logs(sandbox_id, timestamp);"),
    ("IDX_AUDIT_OWNER", "CREATE INDEX IF NOT EXISTS idx_audit_owner ON audit_logs(user_id, created_at);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con el motor libSQL.
 */
#[instrument(skip(database_connection))]
pub async fn apply_control_plane_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V7.0...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Control Plane Ledger V7.0 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in CONTROL_PLANE_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {identifier}"))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {identifier}"))?;
    }
    Ok(())
}
