// INICIO DEL ARCHIVO [libs/infra/runtime/src/mock.rs]
/*!
 * =================================================================
 * APARATO: MOCK RUNTIME ENGINE (V8.0 - PROVING GROUNDS)
 * CLASIFICACIÓN: TEST INFRASTRUCTURE (ESTRATO L3)
 * RESPONSABILIDAD: MOTOR SIMULADO PARA CERTIFICACIÓN SIN DOCKER
 *
 * VISION HIPER-HOLÍSTICA:
 * Satisface el contrato ContainerRuntime con un censo en RAM y
 * palancas de fallo deterministas (creación, salud) para certificar
 * el provisioner, el barrido TTL y el apagado sin daemon físico.
 * =================================================================
 */

use crate::adapter::{ContainerRuntime, InteractiveShell, LogEventStream, ProgressSink};
use crate::errors::RuntimeError;
use crate::spec::{BatchExecOutcome, ContainerProbe, ContainerSpec, LogEvent, ProbeStatus};
use async_trait::async_trait;
use crisol_domain_models::ContainerMetrics;
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Registro en RAM de un contenedor simulado.
#[derive(Debug, Clone)]
pub struct MockContainerRecord {
    pub spec_name: String,
    pub image: String,
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
    pub running: bool,
    pub removed: bool,
}

/// Motor simulado del Proving Grounds.
#[derive(Default)]
pub struct MockRuntime {
    /// Censo de contenedores simulados: container_ref → registro.
    pub containers: Mutex<HashMap<String, MockContainerRecord>>,
    /// Palanca: la creación de contenedores colapsa con 'Unavailable'.
    pub fail_container_creation: AtomicBool,
    /// Palanca: veredicto de salud devuelto por 'wait_running'.
    pub deny_health: AtomicBool,
    /// Eventos de log pre-escritos servidos por 'stream_logs'.
    pub scripted_log_events: Mutex<Vec<LogEvent>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantánea del registro de un contenedor simulado.
    pub fn snapshot(&self, container_ref: &str) -> Option<MockContainerRecord> {
        self.containers.lock().expect("censo envenenado").get(container_ref).cloned()
    }

    /// Censo de contenedores aún no removidos.
    pub fn live_count(&self) -> usize {
        self.containers
            .lock()
            .expect("censo envenenado")
            .values()
            .filter(|record| !record.removed)
            .count()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ensure_image(&self, _image: &str, progress: ProgressSink) -> Result<(), RuntimeError> {
        let emit_progress = progress.as_ref();
        emit_progress(40, "Pulling layers");
        emit_progress(100, "Image already present");
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        if self.fail_container_creation.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unavailable("simulated engine outage".into()));
        }

        let container_ref = format!("mock-{}", Uuid::new_v4());
        self.containers.lock().expect("censo envenenado").insert(
            container_ref.clone(),
            MockContainerRecord {
                spec_name: spec.name.clone(),
                image: spec.image.clone(),
                env: spec.env.clone(),
                labels: spec.labels.clone(),
                running: false,
                removed: false,
            },
        );
        Ok(container_ref)
    }

    async fn start_container(&self, container_ref: &str) -> Result<(), RuntimeError> {
        let mut census = self.containers.lock().expect("censo envenenado");
        match census.get_mut(container_ref) {
            Some(record) if !record.removed => {
                record.running = true;
                Ok(())
            }
            _ => Err(RuntimeError::NotFound(container_ref.to_string())),
        }
    }

    async fn stop_container(&self, container_ref: &str, _grace_seconds: i64) -> Result<(), RuntimeError> {
        let mut census = self.containers.lock().expect("censo envenenado");
        if let Some(record) = census.get_mut(container_ref) {
            // 'Ya detenido' es éxito por contrato
            record.running = false;
        }
        Ok(())
    }

    async fn restart_container(&self, container_ref: &str, _grace_seconds: i64) -> Result<(), RuntimeError> {
        let mut census = self.containers.lock().expect("censo envenenado");
        match census.get_mut(container_ref) {
            Some(record) if !record.removed => {
                record.running = true;
                Ok(())
            }
            _ => Err(RuntimeError::NotFound(container_ref.to_string())),
        }
    }

    async fn remove_container(&self, container_ref: &str) -> Result<(), RuntimeError> {
        let mut census = self.containers.lock().expect("censo envenenado");
        if let Some(record) = census.get_mut(container_ref) {
            record.running = false;
            record.removed = true;
        }
        // 'No encontrado' es éxito por contrato
        Ok(())
    }

    async fn inspect(&self, container_ref: &str) -> Result<Option<ContainerProbe>, RuntimeError> {
        let census = self.containers.lock().expect("censo envenenado");
        Ok(census.get(container_ref).filter(|record| !record.removed).map(|record| {
            ContainerProbe {
                status: if record.running { ProbeStatus::Running } else { ProbeStatus::Exited },
                running: record.running,
                exit_code: if record.running { None } else { Some(0) },
            }
        }))
    }

    async fn wait_running(&self, container_ref: &str, _deadline: Duration) -> Result<bool, RuntimeError> {
        if self.deny_health.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self
            .snapshot(container_ref)
            .map(|record| record.running && !record.removed)
            .unwrap_or(false))
    }

    async fn sample_metrics(&self, container_ref: &str) -> Result<Option<ContainerMetrics>, RuntimeError> {
        Ok(self.snapshot(container_ref).filter(|record| !record.removed).map(|_| {
            ContainerMetrics {
                cpu_percent: 1.25,
                memory_usage_bytes: 32 * 1_048_576,
                memory_limit_bytes: 512 * 1_048_576,
                memory_percent: 6.25,
                ..Default::default()
            }
        }))
    }

    async fn stream_logs(&self, _container_ref: &str, _since_unix: i64) -> Result<LogEventStream, RuntimeError> {
        let scripted_events: Vec<Result<LogEvent, RuntimeError>> = self
            .scripted_log_events
            .lock()
            .expect("eventos envenenados")
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(stream::iter(scripted_events)))
    }

    async fn fetch_logs(&self, _container_ref: &str, tail: u32) -> Result<Vec<LogEvent>, RuntimeError> {
        let scripted = self.scripted_log_events.lock().expect("eventos envenenados");
        let skip_count = scripted.len().saturating_sub(tail as usize);
        Ok(scripted.iter().skip(skip_count).cloned().collect())
    }

    async fn exec_batch(&self, container_ref: &str, argv: &[String]) -> Result<BatchExecOutcome, RuntimeError> {
        if self.snapshot(container_ref).filter(|record| record.running).is_none() {
            return Err(RuntimeError::NotFound(container_ref.to_string()));
        }
        Ok(BatchExecOutcome { exit_code: 0, combined_output: format!("mock exec: {}", argv.join(" ")) })
    }

    async fn exec_interactive(
        &self,
        _container_ref: &str,
        _initial_cols: u16,
        _initial_rows: u16,
    ) -> Result<InteractiveShell, RuntimeError> {
        Err(RuntimeError::Unavailable("mock engine has no PTY strata".into()))
    }

    async fn list_owned(&self) -> Result<Vec<String>, RuntimeError> {
        let census = self.containers.lock().expect("censo envenenado");
        Ok(census
            .iter()
            .filter(|(_, record)| !record.removed)
            .map(|(container_ref, _)| container_ref.clone())
            .collect())
    }
}
// FIN DEL ARCHIVO [libs/infra/runtime/src/mock.rs]
