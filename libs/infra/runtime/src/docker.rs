// INICIO DEL ARCHIVO [libs/infra/runtime/src/docker.rs]
/*!
 * =================================================================
 * APARATO: DOCKER RUNTIME ADAPTER (V16.0 - BOLLARD ENGINE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MATERIALIZACIÓN FÍSICA DE SANDBOXES EN DOCKER
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ISOLATION PROFILE: cap-drop ALL + {CHOWN,SETUID,SETGID},
 *    no-new-privileges, swap = memoria, red bridge, cero binds.
 * 2. PROGRESS AGGREGATION: El pull reduce el avance por capa a un
 *    único porcentaje 0-100 con línea de estado humana.
 * 3. SHARED SOCKET: El cliente bollard es clonable y concurrente;
 *    el adaptador jamás serializa llamadas simultáneas.
 * =================================================================
 */

use crate::adapter::{ContainerRuntime, InteractiveShell, LogEventStream, ProgressSink, PtyControl};
use crate::errors::RuntimeError;
use crate::spec::{
    BatchExecOutcome, ContainerProbe, ContainerSpec, LogEvent, ProbeStatus,
    CPU_PERIOD_MICROSECONDS, LABEL_PLATFORM, RETAINED_CAPABILITIES,
};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, Stats, StatsOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, ResizeExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerStateStatusEnum, HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::Docker;
use chrono::{DateTime, Utc};
use crisol_domain_models::{ContainerMetrics, LogStreamKind};
use futures_util::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Adaptador soberano sobre el Docker Engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    engine_client: Docker,
}

impl DockerRuntime {
    /**
     * Establece el enlace con el daemon: socket explícito o defaults locales.
     */
    pub fn connect(runtime_socket_path: Option<&str>) -> Result<Self, RuntimeError> {
        let engine_client = match runtime_socket_path {
            Some(socket_path) => {
                Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)?
            }
            None => Docker::connect_with_local_defaults()?,
        };
        info!("🐳 [RUNTIME]: Engine uplink established.");
        Ok(Self { engine_client })
    }

    /// Sondeo de vida del daemon (health/ready y apagado C9).
    pub async fn probe_engine(&self) -> Result<(), RuntimeError> {
        self.engine_client.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.probe_engine().await
    }

    #[instrument(skip(self, progress))]
    async fn ensure_image(&self, image: &str, progress: ProgressSink) -> Result<(), RuntimeError> {
        let emit_progress = progress.as_ref();

        // Presencia local => no-op con avance completo
        if self.engine_client.inspect_image(image).await.is_ok() {
            emit_progress(100, "Image already present");
            return Ok(());
        }

        info!("⬇️ [RUNTIME_PULL]: Acquiring image [{}] from registry.", image);
        let mut pull_stream = self.engine_client.create_image(
            Some(CreateImageOptions { from_image: image.to_string(), ..Default::default() }),
            None,
            None,
        );

        // Agregación por capa: layer_id → (bytes actuales, bytes totales)
        let mut layer_progress_census: HashMap<String, (i64, i64)> = HashMap::new();

        while let Some(pull_event) = pull_stream.next().await {
            let info = pull_event?;

            if let (Some(layer_identifier), Some(detail)) = (&info.id, &info.progress_detail) {
                if let (Some(current), Some(total)) = (detail.current, detail.total) {
                    if total > 0 {
                        layer_progress_census.insert(layer_identifier.clone(), (current, total));
                    }
                }
            }

            let aggregated_percent = aggregate_pull_percent(&layer_progress_census);
            let status_line = info.status.as_deref().unwrap_or("Pulling layers");
            emit_progress(aggregated_percent, status_line);
        }

        emit_progress(100, "Image pull complete");
        Ok(())
    }

    #[instrument(skip(self, spec), fields(name = %spec.name, image = %spec.image))]
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();

        for mapping in &spec.ports {
            let container_port_key = format!("{}/tcp", mapping.container);
            exposed_ports.insert(container_port_key.clone(), HashMap::new());
            port_bindings.insert(
                container_port_key,
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(mapping.host.to_string()),
                }]),
            );
        }

        // Rutas tmpfs internas; el invariante de cero binds del host se
        // materializa dejando 'binds' vacío por construcción.
        let tmpfs_mounts: Vec<Mount> = spec
            .mounts
            .iter()
            .map(|target_path| Mount {
                target: Some(target_path.clone()),
                typ: Some(MountTypeEnum::TMPFS),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            memory: Some(spec.memory_limit_bytes()),
            // swap = memoria => swap efectivo cero
            memory_swap: Some(spec.memory_limit_bytes()),
            cpu_period: Some(CPU_PERIOD_MICROSECONDS),
            cpu_quota: Some(spec.cpu_quota_microseconds()),
            network_mode: Some("bridge".to_string()),
            port_bindings: Some(port_bindings),
            cap_drop: Some(vec!["ALL".to_string()]),
            cap_add: Some(RETAINED_CAPABILITIES.iter().map(|c| c.to_string()).collect()),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            mounts: if tmpfs_mounts.is_empty() { None } else { Some(tmpfs_mounts) },
            ..Default::default()
        };

        let container_config = Config {
            image: Some(spec.image.clone()),
            cmd: spec.command.clone(),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed_ports),
            labels: Some(spec.labels.clone()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let creation_response = self
            .engine_client
            .create_container(
                Some(CreateContainerOptions { name: spec.name.clone(), platform: None }),
                container_config,
            )
            .await?;

        info!("📦 [RUNTIME_CREATE]: Container {} materialized.", creation_response.id);
        Ok(creation_response.id)
    }

    async fn start_container(&self, container_ref: &str) -> Result<(), RuntimeError> {
        self.engine_client
            .start_container(container_ref, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, container_ref: &str, grace_seconds: i64) -> Result<(), RuntimeError> {
        match self
            .engine_client
            .stop_container(container_ref, Some(StopContainerOptions { t: grace_seconds }))
            .await
        {
            Ok(()) => Ok(()),
            // 304: ya detenido => éxito por contrato
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }) => {
                debug!("⚪ [RUNTIME_STOP]: Container {} already stopped.", container_ref);
                Ok(())
            }
            Err(engine_fault) => Err(engine_fault.into()),
        }
    }

    async fn restart_container(&self, container_ref: &str, grace_seconds: i64) -> Result<(), RuntimeError> {
        self.engine_client
            .restart_container(
                container_ref,
                Some(RestartContainerOptions { t: grace_seconds as isize }),
            )
            .await?;
        Ok(())
    }

    async fn remove_container(&self, container_ref: &str) -> Result<(), RuntimeError> {
        match self
            .engine_client
            .remove_container(
                container_ref,
                Some(RemoveContainerOptions { force: true, ..Default::default() }),
            )
            .await
        {
            Ok(()) => Ok(()),
            // No encontrado => éxito por contrato (idempotencia de remoción)
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                debug!("⚪ [RUNTIME_REMOVE]: Container {} already gone.", container_ref);
                Ok(())
            }
            Err(engine_fault) => Err(engine_fault.into()),
        }
    }

    async fn inspect(&self, container_ref: &str) -> Result<Option<ContainerProbe>, RuntimeError> {
        let inspection = match self.engine_client.inspect_container(container_ref, None).await {
            Ok(inspection) => inspection,
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                return Ok(None)
            }
            Err(engine_fault) => return Err(engine_fault.into()),
        };

        let physical_state = inspection.state.unwrap_or_default();
        Ok(Some(ContainerProbe {
            status: map_engine_status(physical_state.status),
            running: physical_state.running.unwrap_or(false),
            exit_code: physical_state.exit_code,
        }))
    }

    async fn sample_metrics(&self, container_ref: &str) -> Result<Option<ContainerMetrics>, RuntimeError> {
        let mut stats_stream = self.engine_client.stats(
            container_ref,
            Some(StatsOptions { stream: false, one_shot: true }),
        );

        match stats_stream.next().await {
            Some(Ok(stats_sample)) => Ok(Some(reduce_stats_sample(&stats_sample))),
            Some(Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            })) => Ok(None),
            Some(Err(engine_fault)) => Err(engine_fault.into()),
            None => Ok(None),
        }
    }

    async fn stream_logs(&self, container_ref: &str, since_unix: i64) -> Result<LogEventStream, RuntimeError> {
        let raw_log_stream = self.engine_client.logs(
            container_ref,
            Some(LogsOptions::<String> {
                follow: true,
                stdout: true,
                stderr: true,
                since: since_unix,
                timestamps: true,
                tail: "all".to_string(),
                ..Default::default()
            }),
        );

        let decoded_stream = raw_log_stream.filter_map(|frame_result| async move {
            match frame_result {
                Ok(frame) => decode_log_frame(frame).map(Ok),
                Err(engine_fault) => Some(Err(RuntimeError::from(engine_fault))),
            }
        });

        Ok(Box::pin(decoded_stream))
    }

    async fn fetch_logs(&self, container_ref: &str, tail: u32) -> Result<Vec<LogEvent>, RuntimeError> {
        let mut raw_log_stream = self.engine_client.logs(
            container_ref,
            Some(LogsOptions::<String> {
                follow: false,
                stdout: true,
                stderr: true,
                timestamps: true,
                tail: tail.to_string(),
                ..Default::default()
            }),
        );

        let mut decoded_events = Vec::new();
        while let Some(frame_result) = raw_log_stream.next().await {
            if let Some(event) = decode_log_frame(frame_result?) {
                decoded_events.push(event);
            }
        }
        Ok(decoded_events)
    }

    #[instrument(skip(self))]
    async fn exec_batch(&self, container_ref: &str, argv: &[String]) -> Result<BatchExecOutcome, RuntimeError> {
        let exec_handle = self
            .engine_client
            .create_exec(
                container_ref,
                CreateExecOptions::<String> {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut combined_output = String::new();
        if let StartExecResults::Attached { mut output, .. } =
            self.engine_client.start_exec(&exec_handle.id, None).await?
        {
            while let Some(frame_result) = output.next().await {
                match frame_result {
                    Ok(frame) => combined_output.push_str(&String::from_utf8_lossy(&frame.into_bytes())),
                    Err(engine_fault) => {
                        warn!("⚠️ [RUNTIME_EXEC]: Output stream severed: {engine_fault}");
                        break;
                    }
                }
            }
        }

        let exec_inspection = self.engine_client.inspect_exec(&exec_handle.id).await?;
        Ok(BatchExecOutcome {
            exit_code: exec_inspection.exit_code.unwrap_or(-1),
            combined_output,
        })
    }

    #[instrument(skip(self))]
    async fn exec_interactive(
        &self,
        container_ref: &str,
        initial_cols: u16,
        initial_rows: u16,
    ) -> Result<InteractiveShell, RuntimeError> {
        let exec_handle = self
            .engine_client
            .create_exec(
                container_ref,
                CreateExecOptions::<String> {
                    cmd: Some(vec!["/bin/sh".to_string()]),
                    attach_stdin: Some(true),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let started_session = self
            .engine_client
            .start_exec(
                &exec_handle.id,
                Some(StartExecOptions { detach: false, ..Default::default() }),
            )
            .await?;

        let (raw_output, raw_input) = match started_session {
            StartExecResults::Attached { output, input } => (output, input),
            StartExecResults::Detached => {
                return Err(RuntimeError::Other("exec session detached unexpectedly".into()))
            }
        };

        // Geometría inicial de la pseudo-terminal (80×24 por defecto en L4)
        self.engine_client
            .resize_exec(
                &exec_handle.id,
                ResizeExecOptions { height: initial_rows, width: initial_cols },
            )
            .await?;

        let byte_output = raw_output.map(|frame_result| {
            frame_result
                .map(|frame| frame.into_bytes())
                .map_err(RuntimeError::from)
        });

        info!("⌨️ [RUNTIME_PTY]: Interactive shell attached to {}.", container_ref);

        Ok(InteractiveShell {
            output: Box::pin(byte_output),
            input: raw_input,
            control: Box::new(DockerPtyControl {
                engine_client: self.engine_client.clone(),
                exec_identifier: exec_handle.id,
            }),
        })
    }

    async fn list_owned(&self) -> Result<Vec<String>, RuntimeError> {
        let mut label_filters = HashMap::new();
        label_filters.insert("label".to_string(), vec![format!("{LABEL_PLATFORM}=true")]);

        let owned_containers = self
            .engine_client
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                filters: label_filters,
                ..Default::default()
            }))
            .await?;

        Ok(owned_containers.into_iter().filter_map(|summary| summary.id).collect())
    }
}

/// Mando de resize sobre una sesión exec viva.
struct DockerPtyControl {
    engine_client: Docker,
    exec_identifier: String,
}

#[async_trait]
impl PtyControl for DockerPtyControl {
    async fn resize(&self, cols: u16, rows: u16) -> Result<(), RuntimeError> {
        self.engine_client
            .resize_exec(&self.exec_identifier, ResizeExecOptions { height: rows, width: cols })
            .await?;
        Ok(())
    }
}

// --- ESTRATO DE REDUCCIÓN Y DECODIFICACIÓN (PRIVATE SSoT) ---

/// Reduce el censo por capa a un único porcentaje 0-100.
fn aggregate_pull_percent(layer_census: &HashMap<String, (i64, i64)>) -> u8 {
    let (downloaded_sum, total_sum) = layer_census
        .values()
        .fold((0i64, 0i64), |(current_acc, total_acc), (current, total)| {
            (current_acc + current, total_acc + total)
        });

    if total_sum <= 0 {
        return 0;
    }
    ((downloaded_sum as f64 / total_sum as f64) * 100.0).clamp(0.0, 100.0) as u8
}

fn map_engine_status(status: Option<ContainerStateStatusEnum>) -> ProbeStatus {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ProbeStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ProbeStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ProbeStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ProbeStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ProbeStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ProbeStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ProbeStatus::Dead,
        _ => ProbeStatus::Unknown,
    }
}

/// Reduce una muestra cruda del motor a las métricas del dominio.
fn reduce_stats_sample(stats_sample: &Stats) -> ContainerMetrics {
    let cpu_delta = stats_sample.cpu_stats.cpu_usage.total_usage as f64
        - stats_sample.precpu_stats.cpu_usage.total_usage as f64;
    let system_delta = stats_sample.cpu_stats.system_cpu_usage.unwrap_or(0) as f64
        - stats_sample.precpu_stats.system_cpu_usage.unwrap_or(0) as f64;
    let online_cpu_count = stats_sample.cpu_stats.online_cpus.unwrap_or(1) as f64;

    let cpu_percent = if system_delta > 0.0 && cpu_delta >= 0.0 {
        (cpu_delta / system_delta) * online_cpu_count * 100.0
    } else {
        0.0
    };

    let memory_usage = stats_sample.memory_stats.usage.unwrap_or(0);
    let memory_limit = stats_sample.memory_stats.limit.unwrap_or(0);
    let memory_percent = if memory_limit > 0 {
        (memory_usage as f64 / memory_limit as f64) * 100.0
    } else {
        0.0
    };

    // Suma de todas las interfaces de red
    let (network_rx, network_tx) = stats_sample
        .networks
        .as_ref()
        .map(|interfaces| {
            interfaces.values().fold((0u64, 0u64), |(rx_acc, tx_acc), interface| {
                (rx_acc + interface.rx_bytes, tx_acc + interface.tx_bytes)
            })
        })
        .unwrap_or((0, 0));

    // Suma de entradas recursivas de I/O de bloque
    let (block_read, block_write) = stats_sample
        .blkio_stats
        .io_service_bytes_recursive
        .as_ref()
        .map(|entries| {
            entries.iter().fold((0u64, 0u64), |(read_acc, write_acc), entry| {
                if entry.op.eq_ignore_ascii_case("read") {
                    (read_acc + entry.value, write_acc)
                } else if entry.op.eq_ignore_ascii_case("write") {
                    (read_acc, write_acc + entry.value)
                } else {
                    (read_acc, write_acc)
                }
            })
        })
        .unwrap_or((0, 0));

    ContainerMetrics {
        cpu_percent,
        memory_usage_bytes: memory_usage,
        memory_limit_bytes: memory_limit,
        memory_percent,
        network_rx_bytes: network_rx,
        network_tx_bytes: network_tx,
        block_read_bytes: block_read,
        block_write_bytes: block_write,
    }
}

/**
 * Decodifica una trama multiplexada del motor a un evento del dominio.
 * El prefijo RFC3339 (timestamps=true) se extrae cuando está presente.
 */
fn decode_log_frame(frame: LogOutput) -> Option<LogEvent> {
    let (stream_kind, payload) = match frame {
        LogOutput::StdOut { message } | LogOutput::Console { message } => {
            (LogStreamKind::Stdout, message)
        }
        LogOutput::StdErr { message } => (LogStreamKind::Stderr, message),
        LogOutput::StdIn { .. } => return None,
    };

    let rendered_line = String::from_utf8_lossy(&payload);
    let trimmed_line = rendered_line.trim_end_matches(['\r', '\n']);
    let (timestamp, text) = split_timestamp_prefix(trimmed_line);

    Some(LogEvent { stream: stream_kind, text: text.to_string(), timestamp })
}

/// Separa el prefijo temporal RFC3339 de una línea de log del motor.
fn split_timestamp_prefix(line: &str) -> (DateTime<Utc>, &str) {
    if let Some((candidate_prefix, remainder)) = line.split_once(' ') {
        if let Ok(parsed_timestamp) = DateTime::parse_from_rfc3339(candidate_prefix) {
            return (parsed_timestamp.with_timezone(&Utc), remainder);
        }
    }
    (Utc::now(), line)
}

// FIN DEL ARCHIVO [libs/infra/runtime/src/docker.rs]
