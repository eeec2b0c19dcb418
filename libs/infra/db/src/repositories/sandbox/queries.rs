// [libs/infra/db/src/repositories/sandbox/queries.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX SQL QUERIES (V14.0 - GUARDED TRANSITIONS)
 * CLASIFICACIÓN: INFRASTRUCTURE SQL (ESTRATO L3)
 * RESPONSABILIDAD: ACCESOS ATÓMICOS DE LA MÁQUINA DE ESTADOS
 *
 * VISION HIPER-HOLÍSTICA:
 * Implementa la física de estados del ciclo de vida. Cada transición
 * encapsula su guarda de estado origen dentro del WHERE del UPDATE:
 * la base de datos actúa como semáforo de exclusión mutua a nivel de
 * fila y los observadores solo presencian progresiones monótonas.
 *
 * # Contrato de Retorno:
 * Toda transición devuelve la fila completa post-actualización para
 * mapeo inmediato en L3. Cero filas => el estado origen ya no rige.
 * =================================================================
 */

/// Columnas canónicas de la entidad en orden de mapeo nominal.
pub const SANDBOX_COLUMNS: &str = "id, user_id, environment_id, environment_version_id, name, \
     container_ref, status, phase, ports, created_at, started_at, stopped_at, expires_at, \
     provision_progress, provision_status";

/// Génesis de la fila en coordenadas iniciales `pending/creating`.
/// El índice UNIQUE(user_id, environment_id, name) sella la idempotencia.
pub const INSERT_PENDING_SANDBOX: &str = r#"
    INSERT INTO sandboxes
        (id, user_id, environment_id, environment_version_id, name,
         status, phase, ports, created_at, expires_at, provision_progress, provision_status)
    VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 'creating', ?6, ?7, ?8, 0, '')
"#;

/// Censo de cuota: instancias del tenant fuera de estados terminales.
pub const COUNT_LIVE_FOR_QUOTA: &str = r#"
    SELECT COUNT(*) FROM sandboxes
    WHERE user_id = ?1 AND status NOT IN ('stopped', 'expired', 'error')
"#;

/// Sella la referencia física del contenedor durante el aprovisionamiento.
pub const ATTACH_CONTAINER_REF: &str = r#"
    UPDATE sandboxes SET container_ref = ?2
    WHERE id = ?1 AND status = 'pending'
    RETURNING id
"#;

/// Avance de aprovisionamiento (escrituras estranguladas en L4: Δ ≥ 5%).
pub const RECORD_PROVISION_PROGRESS: &str = r#"
    UPDATE sandboxes SET provision_progress = ?2, provision_status = ?3
    WHERE id = ?1 AND status = 'pending'
"#;

/// Transición guardada: pending/creating → pending/starting.
pub const MARK_STARTING: &str = r#"
    UPDATE sandboxes SET phase = 'starting'
    WHERE id = ?1 AND status = 'pending' AND phase = 'creating'
    RETURNING id
"#;

/// Transición guardada: pending/starting → running/healthy (salud certificada).
pub const MARK_RUNNING_FROM_STARTING: &str = r#"
    UPDATE sandboxes SET
        status = 'running', phase = 'healthy', started_at = ?2,
        provision_progress = 100, provision_status = ?3
    WHERE id = ?1 AND status = 'pending' AND phase = 'starting'
    RETURNING id
"#;

/// Transición guardada: stopped/stopped → running/healthy (start de usuario).
pub const MARK_RUNNING_FROM_STOPPED: &str = r#"
    UPDATE sandboxes SET
        status = 'running', phase = 'healthy', started_at = ?2, stopped_at = NULL
    WHERE id = ?1 AND status = 'stopped'
    RETURNING id
"#;

/// Transición guardada: running/healthy → stopped/stopped.
pub const MARK_STOPPED_FROM_RUNNING: &str = r#"
    UPDATE sandboxes SET status = 'stopped', phase = 'stopped', stopped_at = ?2
    WHERE id = ?1 AND status = 'running'
    RETURNING id
"#;

/// Colapso a error/failed desde cualquier coordenada no terminal.
pub const MARK_FAILED: &str = r#"
    UPDATE sandboxes SET status = 'error', phase = 'failed', provision_status = ?2
    WHERE id = ?1 AND status IN ('pending', 'running')
    RETURNING id
"#;

/// Expiración TTL: pending|running → expired/stopped.
pub const MARK_EXPIRED: &str = r#"
    UPDATE sandboxes SET status = 'expired', phase = 'stopped', stopped_at = ?2
    WHERE id = ?1 AND status IN ('pending', 'running')
    RETURNING id
"#;

/// Re-estampado de ignición tras un restart (el estado no muta).
pub const RESTAMP_STARTED: &str = r#"
    UPDATE sandboxes SET started_at = ?2
    WHERE id = ?1 AND status = 'running'
    RETURNING id
"#;

/// Candidatas del barrido TTL: vencidas y aún fuera de estados terminales.
pub const SELECT_EXPIRED_CANDIDATES: &str = r#"
    SELECT id, user_id, environment_id, environment_version_id, name,
           container_ref, status, phase, ports, created_at, started_at, stopped_at, expires_at,
           provision_progress, provision_status
    FROM sandboxes
    WHERE expires_at IS NOT NULL AND expires_at < ?1
      AND status NOT IN ('expired', 'stopped', 'error')
"#;

/// Incineración física de la fila (tenant-scoped). RETURNING deduplica
/// destrucciones concurrentes: solo un llamador observa la fila.
pub const DELETE_SANDBOX: &str = r#"
    DELETE FROM sandboxes WHERE id = ?1 AND user_id = ?2
    RETURNING id
"#;

/// Purga de logs descendientes previa a la incineración de la fila.
pub const DELETE_SANDBOX_LOGS: &str = r#"
    DELETE FROM sandbox_logs WHERE sandbox_id = ?1
"#;

/// Censo por estado para los medidores del plano de control (C8).
pub const COUNT_BY_STATUS: &str = r#"
    SELECT status, COUNT(*) FROM sandboxes GROUP BY status
"#;

/// Detección de instancias vivas que bloquean la incineración de un Environment.
pub const COUNT_LIVE_FOR_ENVIRONMENT: &str = r#"
    SELECT COUNT(*) FROM sandboxes
    WHERE environment_id = ?1 AND status NOT IN ('stopped', 'expired', 'error')
"#;
