// INICIO DEL ARCHIVO [apps/control-plane/src/handlers/stream.rs]
/*!
 * =================================================================
 * APARATO: LOG & TERMINAL SOCKET HUB (V22.0 - TRIPLE TASK)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: ENLACES WEBSOCKET DE LOGS VIVOS Y PTY
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. TRIPLE TASK: Cada enlace despliega Downstream, Upstream y un
 *    Sifón (hub o PTY); el primero en morir colapsa a los otros dos
 *    con AbortHandles deterministas.
 * 2. CLOSE CODES: 4004 = sandbox ausente o ajeno; 4003 = precondición
 *    de terminal violada; 1009 = visor rezagado (backpressure).
 * 3. EXACTLY ONCE: La suscripción al hub precede al replay y los ids
 *    ya replayados se filtran del flujo vivo.
 * =================================================================
 */

use crate::middleware::{authenticate_bearer, AuthenticatedIdentity};
use crate::state::AppState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use crisol_domain_models::{LogSocketFrame, SandboxStatus, TerminalControlFrame};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Intervalo de latido (Keep-Alive): 25s.
/// Sintonizado para prevenir cierres por inactividad en proxies Capa 7.
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;
/// Capacidad del canal de salida unificado por visor.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;
/// Replay histórico al conectar: las N entradas más recientes.
const REPLAY_WINDOW_ENTRIES: u32 = 100;

/// Cierre por sandbox ausente o perteneciente a otro tenant.
const CLOSE_CODE_FOREIGN: u16 = 4004;
/// Cierre por precondición de terminal violada (no running / sin contenedor).
const CLOSE_CODE_PRECONDITION: u16 = 4003;
/// Cierre por visor rezagado (bound de backpressure excedido).
const CLOSE_CODE_BACKPRESSURE: u16 = 1009;

#[derive(Debug, Deserialize)]
pub struct SocketAuthQuery {
    pub token: Option<String>,
}

/// Trama de control entrante del endpoint de logs.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LogSocketClientFrame {
    Ping,
}

// --- ESTRATO DE NEGOCIACIÓN (UPGRADE + AUTENTICACIÓN) ---

/**
 * Punto de entrada del enlace de logs: /ws/sandboxes/{id}/logs.
 */
#[instrument(skip(application_state, websocket_upgrade, auth_query, request_headers))]
pub async fn establish_log_stream(
    State(application_state): State<AppState>,
    Path(sandbox_id): Path<Uuid>,
    Query(auth_query): Query<SocketAuthQuery>,
    request_headers: HeaderMap,
    websocket_upgrade: WebSocketUpgrade,
) -> Response {
    let identity =
        match authenticate_socket(&application_state, &auth_query, &request_headers).await {
            Ok(identity) => identity,
            Err(rejection) => return rejection,
        };

    debug!("🔌 [SOCKET_UPGRADE]: Log link negotiation for sandbox {}.", sandbox_id);
    websocket_upgrade.on_upgrade(move |socket| {
        drive_log_socket(socket, application_state, identity, sandbox_id)
    })
}

/**
 * Punto de entrada del enlace de terminal: /ws/sandboxes/{id}/terminal.
 */
#[instrument(skip(application_state, websocket_upgrade, auth_query, request_headers))]
pub async fn establish_terminal_stream(
    State(application_state): State<AppState>,
    Path(sandbox_id): Path<Uuid>,
    Query(auth_query): Query<SocketAuthQuery>,
    request_headers: HeaderMap,
    websocket_upgrade: WebSocketUpgrade,
) -> Response {
    let identity =
        match authenticate_socket(&application_state, &auth_query, &request_headers).await {
            Ok(identity) => identity,
            Err(rejection) => return rejection,
        };

    debug!("🔌 [SOCKET_UPGRADE]: Terminal link negotiation for sandbox {}.", sandbox_id);
    websocket_upgrade.on_upgrade(move |socket| {
        drive_terminal_socket(socket, application_state, identity, sandbox_id)
    })
}

async fn authenticate_socket(
    application_state: &AppState,
    auth_query: &SocketAuthQuery,
    request_headers: &HeaderMap,
) -> Result<AuthenticatedIdentity, Response> {
    let bearer_token = auth_query
        .token
        .clone()
        .or_else(|| {
            request_headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .ok_or_else(|| {
            crate::errors::ApiError::Unauthorized("missing socket credential".into())
                .into_response()
        })?;

    authenticate_bearer(application_state, &bearer_token, None, None)
        .await
        .map_err(IntoResponse::into_response)
}

// --- ESTRATO DE LOGS VIVOS (REPLAY + TAIL) ---

/**
 * Orquestador del enlace de logs: estado inicial, replay histórico y
 * cola viva multiplexada desde el broker del sandbox.
 */
async fn drive_log_socket(
    socket: WebSocket,
    application_state: AppState,
    identity: AuthenticatedIdentity,
    sandbox_id: Uuid,
) {
    // Verificación de propiedad: opacidad absoluta entre tenants
    let sandbox_row = match application_state
        .sandbox_service
        .load_for_viewer(&identity, sandbox_id)
        .await
    {
        Ok(Some(row)) => row,
        _ => {
            close_socket(socket, CLOSE_CODE_FOREIGN, "sandbox not found").await;
            return;
        }
    };

    let session_identifier = Uuid::new_v4().to_string();
    info!("⚡ [LOG_UPLINK]: Viewer session {} attached to {}.", session_identifier, sandbox_id);

    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (outbound_sender, mut outbound_receiver) =
        mpsc::channel::<Message>(OUTBOUND_CHANNEL_CAPACITY);

    // Suscripción ANTES del replay: cero eventos perdidos en el intersticio
    let mut live_subscription = application_state.log_hub.subscribe(sandbox_id);

    // 1. TRAMA DE ESTADO INICIAL
    enqueue_frame(
        &outbound_sender,
        &LogSocketFrame::Status {
            status: sandbox_row.status.as_str().to_string(),
            phase: sandbox_row.phase.as_str().to_string(),
        },
    )
    .await;

    // 2. REPLAY HISTÓRICO (orden cronológico, ids censados para dedup)
    let replayed_entries = application_state
        .log_repository
        .recent(sandbox_id, REPLAY_WINDOW_ENTRIES)
        .await
        .unwrap_or_default();
    let replayed_identifiers: HashSet<Uuid> =
        replayed_entries.iter().map(|entry| entry.id).collect();
    for entry in replayed_entries {
        enqueue_frame(&outbound_sender, &LogSocketFrame::Log(entry)).await;
    }

    // --- TAREA 1: DOWNSTREAM (canal -> socket + latido físico) ---
    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));
        loop {
            tokio::select! {
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                },
                outbound_frame = outbound_receiver.recv() => {
                    match outbound_frame {
                        Some(frame) => {
                            let is_terminal_frame = matches!(frame, Message::Close(_));
                            if socket_sender.send(frame).await.is_err() || is_terminal_frame {
                                break;
                            }
                        },
                        None => {
                            let _ = socket_sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                },
            }
        }
    });

    // --- TAREA 2: SIFÓN DEL BROKER (hub -> canal) ---
    let siphon_outbound = outbound_sender.clone();
    let mut siphon_task = tokio::spawn(async move {
        loop {
            match live_subscription.recv().await {
                Ok(live_entry) => {
                    // Dedup contra el replay ya entregado
                    if replayed_identifiers.contains(&live_entry.id) {
                        continue;
                    }
                    let frame = LogSocketFrame::Log(live_entry);
                    let rendered = match serde_json::to_string(&frame) {
                        Ok(rendered) => rendered,
                        Err(_) => continue,
                    };
                    if siphon_outbound.send(Message::Text(rendered)).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed_count)) => {
                    warn!("🐢 [LOG_UPLINK]: Viewer lagged {} frames; closing 1009.", missed_count);
                    let _ = siphon_outbound
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_CODE_BACKPRESSURE,
                            reason: "viewer backpressure bound exceeded".into(),
                        })))
                        .await;
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    // Broker retirado (destroy / apagado): cierre ordenado
                    let _ = siphon_outbound.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // --- TAREA 3: UPSTREAM (cliente -> ping/pong) ---
    let upstream_outbound = outbound_sender.clone();
    let mut upstream_task = tokio::spawn(async move {
        while let Some(Ok(inbound_message)) = socket_receiver.next().await {
            match inbound_message {
                Message::Text(raw_text) => {
                    if let Ok(LogSocketClientFrame::Ping) =
                        serde_json::from_str::<LogSocketClientFrame>(&raw_text)
                    {
                        let _ = upstream_outbound
                            .send(Message::Text(r#"{"type":"pong"}"#.to_string()))
                            .await;
                    }
                    // Otros mensajes se descartan en este estrato
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    drop(outbound_sender);

    // --- LIMPIEZA ATÓMICA DE ESTRATO (PROTOCOL TRINITY) ---
    tokio::select! {
        _ = (&mut downstream_task) => {
            siphon_task.abort();
            upstream_task.abort();
        },
        _ = (&mut siphon_task) => {
            // El Close ya viajó por el canal; el downstream lo entrega
            upstream_task.abort();
            let _ = downstream_task.await;
        },
        _ = (&mut upstream_task) => {
            siphon_task.abort();
            downstream_task.abort();
        },
    }

    info!("💀 [LOG_UPLINK]: Viewer session {} released.", session_identifier);
}

// --- ESTRATO DE TERMINAL INTERACTIVA (PTY) ---

/**
 * Orquestador del enlace de terminal: shell PTY 80×24 bidireccional
 * con tramas de control JSON (resize / ping).
 */
async fn drive_terminal_socket(
    socket: WebSocket,
    application_state: AppState,
    identity: AuthenticatedIdentity,
    sandbox_id: Uuid,
) {
    let sandbox_row = match application_state
        .sandbox_service
        .load_for_viewer(&identity, sandbox_id)
        .await
    {
        Ok(Some(row)) => row,
        _ => {
            close_socket(socket, CLOSE_CODE_FOREIGN, "sandbox not found").await;
            return;
        }
    };

    // Precondición dura: running + contenedor físico
    let container_ref = match (&sandbox_row.status, &sandbox_row.container_ref) {
        (SandboxStatus::Running, Some(container_ref)) => container_ref.clone(),
        _ => {
            close_socket(socket, CLOSE_CODE_PRECONDITION, "sandbox is not running").await;
            return;
        }
    };

    let interactive_shell = match application_state
        .runtime
        .exec_interactive(&container_ref, 80, 24)
        .await
    {
        Ok(shell) => shell,
        Err(engine_fault) => {
            warn!("⚠️ [TERMINAL]: PTY allocation collapsed: {engine_fault}");
            close_socket(socket, CLOSE_CODE_PRECONDITION, "pty allocation failed").await;
            return;
        }
    };

    let session_identifier = Uuid::new_v4().to_string();
    info!("⌨️ [TERMINAL_UPLINK]: PTY session {} attached to {}.", session_identifier, sandbox_id);

    let crisol_infra_runtime::InteractiveShell { output: mut pty_output, input: mut pty_input, control: pty_control } =
        interactive_shell;

    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (outbound_sender, mut outbound_receiver) =
        mpsc::channel::<Message>(OUTBOUND_CHANNEL_CAPACITY);

    // Señal de preparación del enlace
    let _ = outbound_sender.send(Message::Text(r#"{"type":"ready"}"#.to_string())).await;

    // --- TAREA 1: DOWNSTREAM (canal -> socket + latido físico) ---
    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));
        loop {
            tokio::select! {
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                },
                outbound_frame = outbound_receiver.recv() => {
                    match outbound_frame {
                        Some(frame) => {
                            let is_terminal_frame = matches!(frame, Message::Close(_));
                            if socket_sender.send(frame).await.is_err() || is_terminal_frame {
                                break;
                            }
                        },
                        None => {
                            let _ = socket_sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                },
            }
        }
    });

    // --- TAREA 2: SIFÓN DEL PTY (shell -> canal, binario) ---
    let pty_outbound = outbound_sender.clone();
    let mut pty_siphon_task = tokio::spawn(async move {
        while let Some(chunk_result) = pty_output.next().await {
            match chunk_result {
                Ok(chunk) => {
                    if pty_outbound.send(Message::Binary(chunk.to_vec())).await.is_err() {
                        break;
                    }
                }
                Err(engine_fault) => {
                    debug!("⚪ [TERMINAL]: PTY stream severed: {engine_fault}");
                    break;
                }
            }
        }
        // Fin de flujo del PTY => cierre ordenado 1000
        let _ = pty_outbound
            .send(Message::Close(Some(CloseFrame { code: 1000, reason: "pty closed".into() })))
            .await;
    });

    // --- TAREA 3: UPSTREAM (cliente -> PTY stdin + control JSON) ---
    let control_outbound = outbound_sender.clone();
    let mut upstream_task = tokio::spawn(async move {
        while let Some(Ok(inbound_message)) = socket_receiver.next().await {
            match inbound_message {
                Message::Binary(input_bytes) => {
                    if pty_input.write_all(&input_bytes).await.is_err() {
                        break;
                    }
                    let _ = pty_input.flush().await;
                }
                Message::Text(raw_text) => {
                    // Texto iniciando en '{' se interpreta como control JSON;
                    // todo fallo de parseo cae como bytes de entrada.
                    if raw_text.trim_start().starts_with('{') {
                        if let Ok(control_frame) =
                            serde_json::from_str::<TerminalControlFrame>(&raw_text)
                        {
                            match control_frame {
                                TerminalControlFrame::Resize { cols, rows } => {
                                    if let Err(engine_fault) = pty_control.resize(cols, rows).await {
                                        debug!("⚪ [TERMINAL]: Resize skipped: {engine_fault}");
                                    }
                                }
                                TerminalControlFrame::Ping => {
                                    let _ = control_outbound
                                        .send(Message::Text(r#"{"type":"pong"}"#.to_string()))
                                        .await;
                                }
                            }
                            continue;
                        }
                    }
                    if pty_input.write_all(raw_text.as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = pty_input.flush().await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        // El drop de pty_input sella stdin y propaga el cierre al shell
    });

    drop(outbound_sender);

    // --- LIMPIEZA ATÓMICA DE ESTRATO (PROTOCOL TRINITY) ---
    tokio::select! {
        _ = (&mut downstream_task) => {
            pty_siphon_task.abort();
            upstream_task.abort();
        },
        _ = (&mut pty_siphon_task) => {
            upstream_task.abort();
            let _ = downstream_task.await;
        },
        _ = (&mut upstream_task) => {
            pty_siphon_task.abort();
            downstream_task.abort();
        },
    }

    info!("💀 [TERMINAL_UPLINK]: PTY session {} released.", session_identifier);
}

// --- ESTRATO DE SOPORTE (PRIVATE SSoT) ---

async fn enqueue_frame(outbound_sender: &mpsc::Sender<Message>, frame: &LogSocketFrame) {
    if let Ok(rendered) = serde_json::to_string(frame) {
        let _ = outbound_sender.send(Message::Text(rendered)).await;
    }
}

async fn close_socket(mut socket: WebSocket, close_code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame { code: close_code, reason: reason.into() })))
        .await;
}
// FIN DEL ARCHIVO [apps/control-plane/src/handlers/stream.rs]
