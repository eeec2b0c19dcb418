// INICIO DEL ARCHIVO [libs/infra/runtime/src/adapter.rs]
/*!
 * =================================================================
 * APARATO: CONTAINER RUNTIME TRAIT (V11.0 - SOVEREIGN SEAM)
 * CLASIFICACIÓN: INFRASTRUCTURE SEAM (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATO ÚNICO DEL MOTOR DE CONTENEDORES
 *
 * VISION HIPER-HOLÍSTICA:
 * El trait es la costura soberana entre el Servicio de Sandboxes L4
 * y el motor físico: la implementación Docker (bollard) y el motor
 * simulado del Proving Grounds satisfacen el mismo contrato.
 *
 * # Mathematical Proof (Poll Convergence):
 * 'wait_running' sondea a intervalos ≤ 500ms; converge al primer
 * 'running=true', a 'exited|dead' o al vencer la ventana, lo que
 * ocurra primero.
 * =================================================================
 */

use crate::errors::RuntimeError;
use crate::spec::{BatchExecOutcome, ContainerProbe, ContainerSpec, LogEvent, ProbeStatus};
use async_trait::async_trait;
use bytes::Bytes;
use crisol_domain_models::ContainerMetrics;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Receptor de avance de aprovisionamiento (porcentaje 0-100 + estado).
pub type ProgressSink = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Secuencia perezosa de eventos de log; finita cuando el contenedor muere.
pub type LogEventStream = Pin<Box<dyn Stream<Item = Result<LogEvent, RuntimeError>> + Send>>;

/// Mando fuera-de-banda de una sesión PTY viva.
#[async_trait]
pub trait PtyControl: Send + Sync {
    /// Redimensiona la pseudo-terminal a las coordenadas indicadas.
    async fn resize(&self, cols: u16, rows: u16) -> Result<(), RuntimeError>;
}

/// Sesión interactiva desmembrada en sus tres conductos independientes:
/// salida (stream), entrada (sink de bytes) y mando (resize).
pub struct InteractiveShell {
    pub output: Pin<Box<dyn Stream<Item = Result<Bytes, RuntimeError>> + Send>>,
    pub input: Pin<Box<dyn AsyncWrite + Send>>,
    pub control: Box<dyn PtyControl>,
}

/// Contrato soberano del motor de contenedores.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Sondeo de vida del motor (perímetro /health/ready).
    async fn ping(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /**
     * Garantiza la presencia local de la imagen.
     * Presente => no-op con avance 100%. Ausente => pull con agregación
     * de progreso por capa hacia un único porcentaje 0-100.
     */
    async fn ensure_image(&self, image: &str, progress: ProgressSink) -> Result<(), RuntimeError>;

    /// Materializa el contenedor con el perfil de aislamiento soberano.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn start_container(&self, container_ref: &str) -> Result<(), RuntimeError>;

    /// 'Ya detenido' se trata como éxito.
    async fn stop_container(&self, container_ref: &str, grace_seconds: i64) -> Result<(), RuntimeError>;

    async fn restart_container(&self, container_ref: &str, grace_seconds: i64) -> Result<(), RuntimeError>;

    /// Remoción forzada; 'no encontrado' se trata como éxito.
    async fn remove_container(&self, container_ref: &str) -> Result<(), RuntimeError>;

    /// Sonda puntual; `None` cuando el contenedor no existe.
    async fn inspect(&self, container_ref: &str) -> Result<Option<ContainerProbe>, RuntimeError>;

    /**
     * Sondeo de salud con ventana acotada (intervalo ≤ 500ms).
     * `true` al primer running; `false` ante exited|dead o deadline.
     */
    async fn wait_running(&self, container_ref: &str, deadline: Duration) -> Result<bool, RuntimeError> {
        let polling_interval = Duration::from_millis(500);
        let deadline_instant = tokio::time::Instant::now() + deadline;

        loop {
            match self.inspect(container_ref).await? {
                Some(ContainerProbe { running: true, .. }) => return Ok(true),
                Some(ContainerProbe { status: ProbeStatus::Exited | ProbeStatus::Dead, .. }) => {
                    return Ok(false)
                }
                _ => {}
            }

            if tokio::time::Instant::now() >= deadline_instant {
                return Ok(false);
            }
            tokio::time::sleep(polling_interval).await;
        }
    }

    /// Muestra one-shot de métricas; `None` si el motor no puede muestrear.
    async fn sample_metrics(&self, container_ref: &str) -> Result<Option<ContainerMetrics>, RuntimeError>;

    /// Cola viva de logs desde `since_unix` (decodificado multiplexado).
    async fn stream_logs(&self, container_ref: &str, since_unix: i64) -> Result<LogEventStream, RuntimeError>;

    /// Cola acotada de logs recientes (mismo decodificado, sin follow).
    async fn fetch_logs(&self, container_ref: &str, tail: u32) -> Result<Vec<LogEvent>, RuntimeError>;

    /// Ejecución batch bloqueante con salida combinada.
    async fn exec_batch(&self, container_ref: &str, argv: &[String]) -> Result<BatchExecOutcome, RuntimeError>;

    /// Shell PTY `/bin/sh` bidireccional con mando de resize.
    async fn exec_interactive(
        &self,
        container_ref: &str,
        initial_cols: u16,
        initial_rows: u16,
    ) -> Result<InteractiveShell, RuntimeError>;

    /// Enumera contenedores con la etiqueta de plataforma (apagado C9).
    async fn list_owned(&self) -> Result<Vec<String>, RuntimeError>;
}
// FIN DEL ARCHIVO [libs/infra/runtime/src/adapter.rs]
