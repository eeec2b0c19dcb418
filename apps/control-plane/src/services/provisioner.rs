// INICIO DEL ARCHIVO [apps/control-plane/src/services/provisioner.rs]
/*!
 * =================================================================
 * APARATO: ASYNC PROVISIONER ENGINE (V15.0 - SINGLE FLIGHT)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: MATERIALIZACIÓN ASÍNCRONA DE SANDBOXES
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. SINGLE FLIGHT: El TaskRegistry garantiza a lo sumo UN provisioner
 *    vivo por sandbox id; las creaciones idempotentes jamás duplican
 *    la tarea.
 * 2. STORE-ONLY CHANNEL: El provisioner comunica su avance únicamente
 *    a través de la fila del Ledger (progreso estrangulado Δ ≥ 5%).
 * 3. FAIL IN PLACE: Todo colapso transiciona la fila a error/failed
 *    sin borrar fila ni contenedor (el operador decide la destrucción).
 *
 * # Mathematical Proof (Throttled Progress):
 * El drenador persiste un avance p sólo si p ≥ último + 5 o p = 100;
 * el número de escrituras queda acotado por 21 por aprovisionamiento.
 * =================================================================
 */

use crate::services::sandboxes::SandboxService;
use chrono::Utc;
use crisol_domain_models::AuditAction;
use crisol_infra_runtime::{ContainerSpec, ProgressSink, LABEL_PLATFORM, LABEL_SANDBOX_ID, LABEL_USER_ID};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Ventana soberana de espera de salud tras la ignición (pull + start).
const HEALTH_WAIT_WINDOW: Duration = Duration::from_secs(30);

/**
 * Registro de tareas vivas por sandbox id (provisioners y colectores).
 * El candado cubre la decisión y la inscripción: cero double-spawn.
 */
#[derive(Default)]
pub struct TaskRegistry {
    active_tasks: Mutex<HashMap<Uuid, AbortHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Inscribe la tarea construida por `spawn_task` si el id está libre.
     * Retorna `false` (sin construir nada) si ya existe una tarea viva.
     */
    pub fn register_if_vacant<F>(&self, task_identifier: Uuid, spawn_task: F) -> bool
    where
        F: FnOnce() -> AbortHandle,
    {
        let mut registry_guard = self.active_tasks.lock().expect("registro envenenado");
        if registry_guard.contains_key(&task_identifier) {
            return false;
        }
        let abort_handle = spawn_task();
        registry_guard.insert(task_identifier, abort_handle);
        true
    }

    /// Inscripción con reemplazo: cancela la tarea previa si existía.
    pub fn register_replacing<F>(&self, task_identifier: Uuid, spawn_task: F)
    where
        F: FnOnce() -> AbortHandle,
    {
        let mut registry_guard = self.active_tasks.lock().expect("registro envenenado");
        if let Some(previous_handle) = registry_guard.remove(&task_identifier) {
            previous_handle.abort();
        }
        let abort_handle = spawn_task();
        registry_guard.insert(task_identifier, abort_handle);
    }

    /// Baja voluntaria al finalizar la tarea (no aborta).
    pub fn release(&self, task_identifier: Uuid) {
        self.active_tasks.lock().expect("registro envenenado").remove(&task_identifier);
    }

    /// Cancelación dirigida (stop / destroy).
    pub fn cancel(&self, task_identifier: Uuid) {
        if let Some(abort_handle) =
            self.active_tasks.lock().expect("registro envenenado").remove(&task_identifier)
        {
            abort_handle.abort();
        }
    }

    /// Cancelación total (apagado C9).
    pub fn cancel_all(&self) {
        let mut registry_guard = self.active_tasks.lock().expect("registro envenenado");
        for (_, abort_handle) in registry_guard.drain() {
            abort_handle.abort();
        }
    }

    /// Censo de tareas vivas (diagnóstico).
    pub fn live_count(&self) -> usize {
        self.active_tasks.lock().expect("registro envenenado").len()
    }
}

impl SandboxService {
    /**
     * Encola el provisioner del sandbox con garantía single-flight.
     * El override de entorno viaja como parámetro inmutable de la tarea.
     */
    pub(crate) fn enqueue_provisioner(
        self: &Arc<Self>,
        sandbox_id: Uuid,
        env_override: HashMap<String, String>,
    ) -> bool {
        let service_reference = Arc::clone(self);

        self.provisioners.register_if_vacant(sandbox_id, || {
            let service_for_task = Arc::clone(&service_reference);
            let task_handle = tokio::spawn(async move {
                service_for_task.run_provisioner(sandbox_id, env_override).await;
                service_for_task.provisioners.release(sandbox_id);
            });
            task_handle.abort_handle()
        })
    }

    /**
     * Cuerpo del provisioner: decrypt → pull → create → start → salud.
     */
    #[instrument(skip(self, env_override), fields(sandbox = %sandbox_id))]
    pub(crate) async fn run_provisioner(
        &self,
        sandbox_id: Uuid,
        env_override: HashMap<String, String>,
    ) {
        info!("⚙️ [PROVISIONER]: Materialization sequence starting for {}.", sandbox_id);

        // --- 0. CANAL DE AVANCE ESTRANGULADO (Ledger Writer) ---
        let (progress_sender, mut progress_receiver) =
            mpsc::unbounded_channel::<(u8, String)>();
        let progress_repository = Arc::clone(&self.sandbox_repository);
        let drain_task = tokio::spawn(async move {
            let mut last_persisted_percent: i16 = -5;
            while let Some((percent, status_line)) = progress_receiver.recv().await {
                if i16::from(percent) >= last_persisted_percent + 5 || percent == 100 {
                    last_persisted_percent = i16::from(percent);
                    if let Err(ledger_fault) = progress_repository
                        .record_progress(sandbox_id, percent, &status_line)
                        .await
                    {
                        debug!("⚪ [PROVISIONER]: Progress write skipped: {ledger_fault}");
                    }
                }
            }
        });

        let progress_sink: ProgressSink = Arc::new(move |percent: u8, status_line: &str| {
            let _ = progress_sender.send((percent, status_line.to_string()));
        });

        let provisioning_outcome = self.materialize_sandbox(sandbox_id, env_override, &progress_sink).await;

        // Sellado del canal de avance antes del veredicto final
        drop(progress_sink);
        let _ = drain_task.await;

        if let Err(collapse_reason) = provisioning_outcome {
            error!("💀 [PROVISIONER_COLLAPSE]: Sandbox {} failed: {}", sandbox_id, collapse_reason);

            if let Err(transition_fault) =
                self.sandbox_repository.mark_failed(sandbox_id, &collapse_reason).await
            {
                debug!("⚪ [PROVISIONER]: Failure transition skipped: {transition_fault}");
            }

            if let Some(failed_row) = self.sandbox_repository.reload(sandbox_id).await.ok().flatten() {
                self.append_audit_trail(
                    failed_row.user_id,
                    AuditAction::SandboxProvisionFailed,
                    "sandbox",
                    &sandbox_id.to_string(),
                    serde_json::json!({ "reason": collapse_reason }),
                )
                .await;
            }
        }
    }

    /// Secuencia de materialización; cualquier Err colapsa a error/failed.
    async fn materialize_sandbox(
        &self,
        sandbox_id: Uuid,
        env_override: HashMap<String, String>,
        progress_sink: &ProgressSink,
    ) -> Result<(), String> {
        // 1. RECARGA DE LA FILA SOBERANA
        let sandbox_row = self
            .sandbox_repository
            .reload(sandbox_id)
            .await
            .map_err(|fault| fault.to_string())?
            .ok_or_else(|| "sandbox row vanished before provisioning".to_string())?;

        // 2. RESOLUCIÓN DE LA VERSIÓN INMUTABLE
        let version = self
            .environment_repository
            .find_version(sandbox_row.environment_version_id)
            .await
            .map_err(|fault| fault.to_string())?
            .ok_or_else(|| "environment version vanished".to_string())?;

        // 3. APERTURA DE SECRETOS (Bóveda L1; el claro jamás se persiste)
        let opened_secrets = self
            .secrets_vault
            .decrypt_map(&version.secrets_encrypted)
            .map_err(|fault| format!("secret decryption collapsed: {fault}"))?;

        // 4. PRESENCIA DE IMAGEN CON AVANCE AGREGADO
        let effective_image = version.image.clone().unwrap_or_else(|| {
            // Versiones con dockerfile: el primitivo de build externo debe
            // haber acuñado este tag derivado (ver DESIGN.md).
            format!("crisol-env-{}-v{}", version.environment_id, version.version)
        });
        self.runtime
            .ensure_image(&effective_image, Arc::clone(progress_sink))
            .await
            .map_err(|fault| format!("image acquisition collapsed: {fault}"))?;

        // 5. FUSIÓN DE ENTORNO (versión ⊕ secretos ⊕ override ⊕ identidad)
        let mut merged_environment = version.env.clone();
        merged_environment.extend(opened_secrets);
        merged_environment.extend(env_override);
        merged_environment.insert("SANDBOX_ID".to_string(), sandbox_id.to_string());

        let mut environment_vector: Vec<String> = merged_environment
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        environment_vector.sort();

        // 6. MATERIALIZACIÓN FÍSICA
        let container_spec = ContainerSpec {
            name: format!("crisol-{sandbox_id}"),
            image: effective_image,
            command: version.command.clone(),
            env: environment_vector,
            ports: sandbox_row.ports.clone(),
            cpu: version.cpu,
            memory_mb: version.memory_mb,
            labels: HashMap::from([
                (LABEL_PLATFORM.to_string(), "true".to_string()),
                (LABEL_SANDBOX_ID.to_string(), sandbox_id.to_string()),
                (LABEL_USER_ID.to_string(), sandbox_row.user_id.to_string()),
            ]),
            mounts: version.mounts.clone(),
        };

        let emit_progress = progress_sink.as_ref();
        emit_progress(95, "Creating container");
        let container_ref = self
            .runtime
            .create_container(&container_spec)
            .await
            .map_err(|fault| format!("container creation collapsed: {fault}"))?;

        self.sandbox_repository
            .attach_container_ref(sandbox_id, &container_ref)
            .await
            .map_err(|fault| fault.to_string())?;
        self.sandbox_repository
            .mark_starting(sandbox_id)
            .await
            .map_err(|fault| fault.to_string())?;

        // 7. IGNICIÓN Y VENTANA DE SALUD
        emit_progress(98, "Starting container");
        self.runtime
            .start_container(&container_ref)
            .await
            .map_err(|fault| format!("container ignition collapsed: {fault}"))?;

        let reached_health = self
            .runtime
            .wait_running(&container_ref, HEALTH_WAIT_WINDOW)
            .await
            .map_err(|fault| format!("health probe collapsed: {fault}"))?;

        if !reached_health {
            return Err("container did not reach running state within the health window".into());
        }

        // 8. CERTIFICACIÓN DE SALUD Y COLECTOR DE LOGS
        self.sandbox_repository
            .mark_running_from_starting(sandbox_id, Utc::now(), "Sandbox healthy")
            .await
            .map_err(|fault| fault.to_string())?;

        self.spawn_log_collector_internal(sandbox_id, container_ref.clone());

        info!("✅ [PROVISIONER]: Sandbox {} certified running/healthy.", sandbox_id);
        Ok(())
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/services/provisioner.rs]
