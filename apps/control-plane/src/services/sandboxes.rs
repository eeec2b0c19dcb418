// INICIO DEL ARCHIVO [apps/control-plane/src/services/sandboxes.rs]
/*!
 * =================================================================
 * APARATO: SANDBOX LIFECYCLE SERVICE (V24.0 - STATE SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CORAZÓN DEL PLANO: CICLO DE VIDA, CUOTA,
 *                  IDEMPOTENCIA, RÉPLICA, RECONCILIACIÓN Y TTL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IDEMPOTENT GENESIS: (user, environment, name) es la llave de
 *    idempotencia; el perdedor de la carrera relee a la ganadora y
 *    jamás despliega un segundo provisioner.
 * 2. CROSS-STATE NO-OPS: Las órdenes sobre estados ajenos retornan la
 *    fila vigente sin efectos secundarios.
 * 3. RECONCILIATION: 'reconcile' alinea la fila con la verdad física
 *    del runtime (running/exited/dead/ausente) en lecturas de detalle.
 * 4. BEST-EFFORT SWEEP: El barrido TTL traga fallos por sandbox y el
 *    siguiente ciclo reintenta.
 * =================================================================
 */

use crate::config::ControlPlaneConfig;
use crate::errors::ApiError;
use crate::middleware::AuthenticatedIdentity;
use crate::services::log_hub::LogHub;
use crate::services::provisioner::TaskRegistry;
use chrono::{Duration, Utc};
use crisol_core_vault::SecretsVault;
use crisol_domain_models::{
    limits, validation, AuditAction, CreateSandboxPayload, ExecCommandPayload, ExecCommandReport,
    PortMapping, ReplicateSandboxPayload, Sandbox, SandboxDetailResponse, SandboxPhase,
    SandboxStatus,
};
use crisol_infra_db::repositories::{
    AuditRepository, EnvironmentRepository, SandboxLogRepository, SandboxRepository,
};
use crisol_infra_db::DbError;
use crisol_infra_runtime::{ContainerRuntime, ProbeStatus};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Gracia soberana de detención ordenada (segundos).
const STOP_GRACE_SECONDS: i64 = 10;
/// Gracia reducida del barrido TTL (mejor esfuerzo).
const SWEEP_STOP_GRACE_SECONDS: i64 = 5;
/// Intentos máximos de sondeo de puerto host en la réplica.
const PORT_PROBE_MAX_ATTEMPTS: u16 = 100;

pub struct SandboxService {
    pub(crate) sandbox_repository: Arc<SandboxRepository>,
    pub(crate) environment_repository: Arc<EnvironmentRepository>,
    pub(crate) log_repository: Arc<SandboxLogRepository>,
    pub(crate) audit_repository: Arc<AuditRepository>,
    pub(crate) secrets_vault: Arc<SecretsVault>,
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) log_hub: Arc<LogHub>,
    pub(crate) provisioners: Arc<TaskRegistry>,
    pub(crate) collectors: Arc<TaskRegistry>,
    pub(crate) config: Arc<ControlPlaneConfig>,
}

impl SandboxService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sandbox_repository: Arc<SandboxRepository>,
        environment_repository: Arc<EnvironmentRepository>,
        log_repository: Arc<SandboxLogRepository>,
        audit_repository: Arc<AuditRepository>,
        secrets_vault: Arc<SecretsVault>,
        runtime: Arc<dyn ContainerRuntime>,
        log_hub: Arc<LogHub>,
        config: Arc<ControlPlaneConfig>,
    ) -> Self {
        Self {
            sandbox_repository,
            environment_repository,
            log_repository,
            audit_repository,
            secrets_vault,
            runtime,
            log_hub,
            provisioners: Arc::new(TaskRegistry::new()),
            collectors: Arc::new(TaskRegistry::new()),
            config,
        }
    }

    // --- ESTRATO DE GÉNESIS (CREATE / REPLICATE) ---

    /**
     * Génesis asíncrono: valida, acuña la fila en pending/creating y
     * encola el provisioner. El llamador recibe la fila inmediatamente.
     */
    #[instrument(skip(self, identity, payload), fields(tenant = %identity.user_id))]
    pub async fn create_sandbox(
        self: &Arc<Self>,
        identity: &AuthenticatedIdentity,
        payload: CreateSandboxPayload,
    ) -> Result<Sandbox, ApiError> {
        // 1. CUOTA: instancias no terminales del tenant
        let live_census = self.sandbox_repository.count_live_for_user(identity.user_id).await?;
        if live_census >= limits::MAX_LIVE_SANDBOXES_PER_USER {
            return Err(ApiError::QuotaExceeded(format!(
                "sandbox quota reached ({} live instances)",
                limits::MAX_LIVE_SANDBOXES_PER_USER
            )));
        }

        // 2. RESOLUCIÓN DE PLANTILLA Y VERSIÓN
        let environment = self
            .environment_repository
            .find_by_id(identity.user_id, payload.environment_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let version = match payload.version_id {
            Some(version_id) => self
                .environment_repository
                .find_version_of_environment(environment.id, version_id)
                .await?
                .ok_or(ApiError::NotFound)?,
            None => self
                .environment_repository
                .current_version(&environment)
                .await?
                .ok_or(ApiError::NotFound)?,
        };

        // 3. DERIVACIÓN DE NOMBRE (sufijo de 8 hex si el tenant calla)
        let sandbox_name = match payload.name {
            Some(explicit_name) => {
                validation::validate_resource_name(&explicit_name)?;
                explicit_name
            }
            None => format!("{}-{:08x}", environment.name, rand::random::<u32>()),
        };

        // 4. IDEMPOTENCIA: la llave (user, environment, name) manda
        if let Some(existing_row) = self
            .sandbox_repository
            .find_by_identity(identity.user_id, environment.id, &sandbox_name)
            .await?
        {
            info!("♻️ [IDEMPOTENT_HIT]: Returning existing sandbox {}.", existing_row.id);
            return Ok(existing_row);
        }

        // 5. VENCIMIENTO TTL
        let expires_at = match payload.ttl_seconds {
            Some(ttl_seconds) => {
                validation::validate_ttl_seconds(ttl_seconds)?;
                Some(Utc::now() + Duration::seconds(ttl_seconds as i64))
            }
            None => None,
        };

        // 6. PUERTOS EFECTIVOS (override ?? versión)
        let effective_ports = match payload.ports {
            Some(override_ports) => {
                validation::validate_port_mappings(&override_ports)?;
                override_ports
            }
            None => version.ports.clone(),
        };

        // 7. GÉNESIS DE LA FILA
        let sandbox_row = Sandbox {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            environment_id: environment.id,
            environment_version_id: version.id,
            name: sandbox_name.clone(),
            container_ref: None,
            status: SandboxStatus::Pending,
            phase: SandboxPhase::Creating,
            ports: effective_ports,
            created_at: Utc::now(),
            started_at: None,
            stopped_at: None,
            expires_at,
            provision_progress: 0,
            provision_status_text: String::new(),
        };

        match self.sandbox_repository.insert_pending(&sandbox_row).await {
            Ok(()) => {}
            Err(DbError::Conflict(_)) => {
                // Perdedor de la carrera: releer a la ganadora, cero provisioners
                let winning_row = self
                    .sandbox_repository
                    .find_by_identity(identity.user_id, environment.id, &sandbox_name)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Internal("idempotency winner vanished mid-race".into())
                    })?;
                info!("♻️ [RACE_DEDUP]: Returning winning sandbox {}.", winning_row.id);
                return Ok(winning_row);
            }
            Err(other_fault) => return Err(other_fault.into()),
        }

        // 8. DESPLIEGUE DEL PROVISIONER (single-flight por id)
        self.enqueue_provisioner(sandbox_row.id, payload.env);

        self.audit_with_identity(
            identity,
            AuditAction::SandboxCreated,
            "sandbox",
            &sandbox_row.id.to_string(),
            serde_json::json!({ "name": sandbox_name, "environmentId": environment.id }),
        )
        .await;

        Ok(sandbox_row)
    }

    /**
     * Réplica: deriva nombre y puertos frescos y recorre el pipeline
     * completo de génesis sobre la misma versión del origen.
     */
    #[instrument(skip(self, identity, payload))]
    pub async fn replicate_sandbox(
        self: &Arc<Self>,
        identity: &AuthenticatedIdentity,
        origin_id: Uuid,
        payload: ReplicateSandboxPayload,
    ) -> Result<Sandbox, ApiError> {
        let origin_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, origin_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let replica_name = payload
            .name
            .unwrap_or_else(|| format!("{}-replica-{:04x}", origin_row.name, rand::random::<u16>()));

        let replica_ports = match payload.ports {
            Some(override_ports) => override_ports,
            None => derive_replica_ports(&origin_row.ports)?,
        };

        let replica_row = self
            .create_sandbox(
                identity,
                CreateSandboxPayload {
                    environment_id: origin_row.environment_id,
                    version_id: Some(origin_row.environment_version_id),
                    name: Some(replica_name),
                    ttl_seconds: None,
                    ports: Some(replica_ports),
                    env: Default::default(),
                },
            )
            .await?;

        self.audit_with_identity(
            identity,
            AuditAction::SandboxReplicated,
            "sandbox",
            &replica_row.id.to_string(),
            serde_json::json!({ "originId": origin_id }),
        )
        .await;

        Ok(replica_row)
    }

    // --- ESTRATO DE ÓRDENES DE CICLO DE VIDA ---

    /// start: válido desde stopped; idempotente en running; no-op cruzado.
    #[instrument(skip(self, identity))]
    pub async fn start_sandbox(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<Sandbox, ApiError> {
        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        match sandbox_row.status {
            SandboxStatus::Running => Ok(sandbox_row),
            SandboxStatus::Stopped => {
                let container_ref =
                    sandbox_row.container_ref.clone().ok_or(ApiError::NoContainer)?;

                self.runtime.start_container(&container_ref).await?;
                self.sandbox_repository
                    .mark_running_from_stopped(sandbox_id, Utc::now())
                    .await?;
                self.spawn_log_collector_internal(sandbox_id, container_ref);

                self.audit_with_identity(
                    identity,
                    AuditAction::SandboxStarted,
                    "sandbox",
                    &sandbox_id.to_string(),
                    serde_json::Value::Null,
                )
                .await;

                self.reload_or_fault(sandbox_id).await
            }
            // Orden cruzada: la fila vigente, cero efectos
            _ => Ok(sandbox_row),
        }
    }

    /// stop: válido desde running; idempotente en stopped; no-op cruzado.
    #[instrument(skip(self, identity))]
    pub async fn stop_sandbox(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<Sandbox, ApiError> {
        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        match sandbox_row.status {
            SandboxStatus::Stopped => Ok(sandbox_row),
            SandboxStatus::Running => {
                // El sifón de logs muere antes que el contenedor
                self.collectors.cancel(sandbox_id);

                if let Some(container_ref) = &sandbox_row.container_ref {
                    self.runtime.stop_container(container_ref, STOP_GRACE_SECONDS).await?;
                }
                self.sandbox_repository.mark_stopped(sandbox_id, Utc::now()).await?;

                self.audit_with_identity(
                    identity,
                    AuditAction::SandboxStopped,
                    "sandbox",
                    &sandbox_id.to_string(),
                    serde_json::Value::Null,
                )
                .await;

                self.reload_or_fault(sandbox_id).await
            }
            _ => Ok(sandbox_row),
        }
    }

    /// restart: válido desde running; re-estampa la ignición.
    #[instrument(skip(self, identity))]
    pub async fn restart_sandbox(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<Sandbox, ApiError> {
        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        if sandbox_row.status != SandboxStatus::Running {
            return Ok(sandbox_row);
        }

        let container_ref = sandbox_row.container_ref.clone().ok_or(ApiError::NoContainer)?;
        self.runtime.restart_container(&container_ref, STOP_GRACE_SECONDS).await?;
        self.sandbox_repository.restamp_started(sandbox_id, Utc::now()).await?;
        // El restart corta el stream previo: sifón fresco con reemplazo
        self.spawn_log_collector_internal(sandbox_id, container_ref);

        self.audit_with_identity(
            identity,
            AuditAction::SandboxRestarted,
            "sandbox",
            &sandbox_id.to_string(),
            serde_json::Value::Null,
        )
        .await;

        self.reload_or_fault(sandbox_id).await
    }

    /**
     * destroy: remoción física del contenedor + incineración de la fila.
     * Retorna si la fila existía (las carreras deduplican en el Ledger).
     */
    #[instrument(skip(self, identity))]
    pub async fn destroy_sandbox(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<bool, ApiError> {
        let Some(sandbox_row) =
            self.sandbox_repository.find_by_id(identity.user_id, sandbox_id).await?
        else {
            return Ok(false);
        };

        self.provisioners.cancel(sandbox_id);
        self.collectors.cancel(sandbox_id);

        if let Some(container_ref) = &sandbox_row.container_ref {
            if let Err(engine_fault) = self.runtime.remove_container(container_ref).await {
                warn!("⚠️ [DESTROY]: Container removal incomplete: {engine_fault}");
            }
        }

        let row_existed = self.sandbox_repository.delete(identity.user_id, sandbox_id).await?;
        self.log_hub.retire(sandbox_id);

        if row_existed {
            self.audit_with_identity(
                identity,
                AuditAction::SandboxDestroyed,
                "sandbox",
                &sandbox_id.to_string(),
                serde_json::Value::Null,
            )
            .await;
        }
        Ok(row_existed)
    }

    // --- ESTRATO DE LECTURA Y RECONCILIACIÓN ---

    pub async fn list_sandboxes(
        &self,
        identity: &AuthenticatedIdentity,
        status_filter: Option<SandboxStatus>,
        environment_filter: Option<Uuid>,
    ) -> Result<Vec<Sandbox>, ApiError> {
        Ok(self
            .sandbox_repository
            .list_for_user(identity.user_id, status_filter, environment_filter)
            .await?)
    }

    /// Detalle con auto-reconciliación y cola de logs reciente.
    pub async fn get_sandbox_detail(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<SandboxDetailResponse, ApiError> {
        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let reconciled_row = if sandbox_row.container_ref.is_some() {
            self.reconcile(sandbox_row).await?
        } else {
            sandbox_row
        };

        let logs_preview = self.log_repository.recent(sandbox_id, 10).await?;
        Ok(SandboxDetailResponse { sandbox: reconciled_row, logs_preview })
    }

    /**
     * Reconciliación: alinea la fila con la verdad física del runtime.
     * running → running/healthy; exited → stopped/stopped (o error si
     * ocurrió durante el aprovisionamiento); dead|ausente → error/failed.
     */
    pub async fn reconcile(&self, sandbox_row: Sandbox) -> Result<Sandbox, ApiError> {
        let Some(container_ref) = sandbox_row.container_ref.clone() else {
            return Ok(sandbox_row);
        };

        let probe = match self.runtime.inspect(&container_ref).await {
            Ok(probe) => probe,
            Err(engine_fault) => {
                // Motor inalcanzable: la lectura no colapsa, la fila manda
                warn!("⚠️ [RECONCILE]: Engine probe failed: {engine_fault}");
                return Ok(sandbox_row);
            }
        };

        let sandbox_id = sandbox_row.id;
        match probe {
            None => {
                if matches!(sandbox_row.status, SandboxStatus::Pending | SandboxStatus::Running) {
                    let _ = self
                        .sandbox_repository
                        .mark_failed(sandbox_id, "container vanished from runtime")
                        .await;
                }
            }
            Some(physical) if physical.running => match sandbox_row.status {
                SandboxStatus::Stopped => {
                    let _ = self
                        .sandbox_repository
                        .mark_running_from_stopped(sandbox_id, Utc::now())
                        .await;
                }
                SandboxStatus::Pending => {
                    if sandbox_row.phase == SandboxPhase::Creating {
                        let _ = self.sandbox_repository.mark_starting(sandbox_id).await;
                    }
                    let _ = self
                        .sandbox_repository
                        .mark_running_from_starting(sandbox_id, Utc::now(), "Reconciled running")
                        .await;
                }
                _ => {}
            },
            Some(physical) if physical.status == ProbeStatus::Exited => {
                match sandbox_row.status {
                    SandboxStatus::Running => {
                        let _ = self.sandbox_repository.mark_stopped(sandbox_id, Utc::now()).await;
                    }
                    SandboxStatus::Pending => {
                        let _ = self
                            .sandbox_repository
                            .mark_failed(sandbox_id, "container exited during provisioning")
                            .await;
                    }
                    _ => {}
                }
            }
            Some(physical) if physical.status == ProbeStatus::Dead => {
                if !sandbox_row.status.is_terminal() {
                    let _ = self
                        .sandbox_repository
                        .mark_failed(sandbox_id, "container reported dead by runtime")
                        .await;
                }
            }
            Some(_) => {}
        }

        self.reload_or_fault(sandbox_id).await
    }

    // --- ESTRATO DE TELEMETRÍA Y EJECUCIÓN ---

    pub async fn sample_metrics(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<crisol_domain_models::ContainerMetrics, ApiError> {
        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let container_ref = sandbox_row.container_ref.as_deref().ok_or(ApiError::NoContainer)?;
        if sandbox_row.status != SandboxStatus::Running {
            return Err(ApiError::NotRunning);
        }

        self.runtime
            .sample_metrics(container_ref)
            .await?
            .ok_or(ApiError::MetricsUnavailable)
    }

    pub async fn exec_command(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
        payload: ExecCommandPayload,
    ) -> Result<ExecCommandReport, ApiError> {
        if payload.command.is_empty() {
            return Err(ApiError::Validation("command vector must not be empty".into()));
        }

        let sandbox_row = self
            .sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        if sandbox_row.status != SandboxStatus::Running {
            return Err(ApiError::NotRunning);
        }
        let container_ref = sandbox_row.container_ref.as_deref().ok_or(ApiError::NoContainer)?;

        let outcome = self.runtime.exec_batch(container_ref, &payload.command).await?;
        Ok(ExecCommandReport { exit_code: outcome.exit_code, output: outcome.combined_output })
    }

    /// Cola reciente acotada del Ledger (GET /sandboxes/{id}/logs).
    pub async fn recent_logs(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
        tail: u32,
    ) -> Result<Vec<crisol_domain_models::SandboxLogEntry>, ApiError> {
        self.sandbox_repository
            .find_by_id(identity.user_id, sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        Ok(self.log_repository.recent(sandbox_id, tail.clamp(1, 1000)).await?)
    }

    /// Carga tenant-scoped para el hub WebSocket (C6).
    pub async fn load_for_viewer(
        &self,
        identity: &AuthenticatedIdentity,
        sandbox_id: Uuid,
    ) -> Result<Option<Sandbox>, ApiError> {
        Ok(self.sandbox_repository.find_by_id(identity.user_id, sandbox_id).await?)
    }

    // --- ESTRATO DE BARRIDO TTL (DAEMON C8) ---

    /**
     * Barrido de vencidas: stop + remove con mejor esfuerzo y transición
     * a expired/stopped. Los fallos se registran y el próximo ciclo
     * reintenta. Retorna el censo de expiraciones selladas.
     */
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> u32 {
        let expired_candidates = match self.sandbox_repository.select_expired(Utc::now()).await {
            Ok(candidates) => candidates,
            Err(ledger_fault) => {
                warn!("⚠️ [TTL_SWEEP]: Candidate census failed: {ledger_fault}");
                return 0;
            }
        };

        let mut sealed_count = 0u32;
        for candidate in expired_candidates {
            self.provisioners.cancel(candidate.id);
            self.collectors.cancel(candidate.id);

            if let Some(container_ref) = &candidate.container_ref {
                if let Err(engine_fault) =
                    self.runtime.stop_container(container_ref, SWEEP_STOP_GRACE_SECONDS).await
                {
                    warn!("⚠️ [TTL_SWEEP]: Stop incomplete for {}: {engine_fault}", candidate.id);
                }
                if let Err(engine_fault) = self.runtime.remove_container(container_ref).await {
                    warn!("⚠️ [TTL_SWEEP]: Removal incomplete for {}: {engine_fault}", candidate.id);
                    continue; // El próximo barrido reintenta
                }
            }

            match self.sandbox_repository.mark_expired(candidate.id, Utc::now()).await {
                Ok(()) => {
                    sealed_count += 1;
                    info!("⏳ [TTL_SWEEP]: Sandbox {} sealed as expired.", candidate.id);
                    self.append_audit_trail(
                        candidate.user_id,
                        AuditAction::SandboxExpired,
                        "sandbox",
                        &candidate.id.to_string(),
                        serde_json::Value::Null,
                    )
                    .await;
                }
                Err(transition_fault) => {
                    warn!("⚠️ [TTL_SWEEP]: Expiry seal skipped for {}: {transition_fault}", candidate.id);
                }
            }
        }
        sealed_count
    }

    // --- ESTRATO DE SOPORTE (PRIVATE SSoT) ---

    async fn reload_or_fault(&self, sandbox_id: Uuid) -> Result<Sandbox, ApiError> {
        self.sandbox_repository
            .reload(sandbox_id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    /// Rastro forense con identidad del perímetro (jamás bloquea).
    pub(crate) async fn audit_with_identity(
        &self,
        identity: &AuthenticatedIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        metadata: serde_json::Value,
    ) {
        if let Err(audit_fault) = self
            .audit_repository
            .append(
                identity.user_id,
                action,
                resource_type,
                resource_id,
                metadata,
                identity.client_ip.as_deref(),
                identity.client_agent.as_deref(),
            )
            .await
        {
            warn!("⚠️ [AUDIT_SKIP]: Trail append failed: {audit_fault}");
        }
    }

    /// Rastro forense desde daemons (sin identidad de perímetro).
    pub(crate) async fn append_audit_trail(
        &self,
        user_id: Uuid,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        metadata: serde_json::Value,
    ) {
        if let Err(audit_fault) = self
            .audit_repository
            .append(user_id, action, resource_type, resource_id, metadata, None, None)
            .await
        {
            warn!("⚠️ [AUDIT_SKIP]: Trail append failed: {audit_fault}");
        }
    }
}

/**
 * Deriva puertos host frescos para una réplica sondeando disponibilidad
 * local desde `origen + 1` (máximo 100 intentos por mapeo).
 *
 * La ventana sondeo→creación no es atómica: el runtime puede devolver
 * 'Conflict' igualmente y el llamador lo proyecta como retriable.
 */
fn derive_replica_ports(origin_ports: &[PortMapping]) -> Result<Vec<PortMapping>, ApiError> {
    let mut claimed_ports: HashSet<u16> = HashSet::new();
    let mut replica_ports = Vec::with_capacity(origin_ports.len());

    for origin_mapping in origin_ports {
        let fresh_host_port = probe_free_host_port(origin_mapping.host, &claimed_ports)?;
        claimed_ports.insert(fresh_host_port);
        replica_ports.push(PortMapping { container: origin_mapping.container, host: fresh_host_port });
    }
    Ok(replica_ports)
}

fn probe_free_host_port(
    origin_host_port: u16,
    claimed_ports: &HashSet<u16>,
) -> Result<u16, ApiError> {
    for attempt_offset in 1..=PORT_PROBE_MAX_ATTEMPTS {
        let candidate_port = match origin_host_port.checked_add(attempt_offset) {
            Some(candidate) => candidate,
            None => break,
        };
        if claimed_ports.contains(&candidate_port) {
            continue;
        }
        if std::net::TcpListener::bind(("0.0.0.0", candidate_port)).is_ok() {
            return Ok(candidate_port);
        }
    }
    Err(ApiError::Conflict(format!(
        "no free host port within {PORT_PROBE_MAX_ATTEMPTS} attempts above {origin_host_port}"
    )))
}

// FIN DEL ARCHIVO [apps/control-plane/src/services/sandboxes.rs]
