// INICIO DEL ARCHIVO [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: MODELS SERIALIZATION TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar paridad bit-perfecta de los contratos de wire.
 * =================================================================
 */

use crisol_domain_models::{
    LifecycleState, LogSocketFrame, LogStreamKind, PortMapping, RedactedSecret, SandboxLogEntry,
    SandboxPhase, SandboxStatus, TerminalControlFrame,
};
use chrono::Utc;
use uuid::Uuid;

#[test]
fn certify_status_and_phase_wire_labels() {
    // El Dashboard consume etiquetas minúsculas bit-exactas.
    assert_eq!(serde_json::to_string(&SandboxStatus::Pending).unwrap(), "\"pending\"");
    assert_eq!(serde_json::to_string(&SandboxStatus::Expired).unwrap(), "\"expired\"");
    assert_eq!(serde_json::to_string(&SandboxPhase::Healthy).unwrap(), "\"healthy\"");
    assert_eq!(serde_json::to_string(&SandboxPhase::Failed).unwrap(), "\"failed\"");

    // Paridad de ida y vuelta con el Ledger L3 (as_str / parse).
    for status in ["pending", "running", "stopped", "error", "expired"] {
        assert_eq!(SandboxStatus::parse(status).unwrap().as_str(), status);
    }
    for phase in ["creating", "starting", "healthy", "stopping", "stopped", "failed"] {
        assert_eq!(SandboxPhase::parse(phase).unwrap().as_str(), phase);
    }
}

#[test]
fn certify_log_socket_frame_envelope() {
    let entry = SandboxLogEntry {
        id: Uuid::new_v4(),
        sandbox_id: Uuid::new_v4(),
        stream: LogStreamKind::Stdout,
        text: "listening on 0.0.0.0:80".into(),
        timestamp: Utc::now(),
    };

    let frame = serde_json::to_value(LogSocketFrame::Log(entry)).unwrap();
    assert_eq!(frame["event"], "log");
    assert_eq!(frame["data"]["stream"], "stdout");

    let status_frame = serde_json::to_value(LogSocketFrame::Status {
        status: "running".into(),
        phase: "healthy".into(),
    })
    .unwrap();
    assert_eq!(status_frame["event"], "status");
    assert_eq!(status_frame["data"]["status"], "running");
}

#[test]
fn certify_terminal_control_frames() {
    let resize: TerminalControlFrame =
        serde_json::from_str(r#"{"type":"resize","cols":120,"rows":40}"#).unwrap();
    assert!(matches!(resize, TerminalControlFrame::Resize { cols: 120, rows: 40 }));

    let ping: TerminalControlFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
    assert!(matches!(ping, TerminalControlFrame::Ping));

    // Texto arbitrario NO parsea: cae como bytes de entrada al PTY.
    assert!(serde_json::from_str::<TerminalControlFrame>("ls -la\n").is_err());
}

#[test]
fn certify_redacted_secret_opacity() {
    let veiled = serde_json::to_value(RedactedSecret { key: "API_KEY".into(), redacted: true }).unwrap();
    assert_eq!(veiled["key"], "API_KEY");
    assert_eq!(veiled["redacted"], true);
    // El contrato jamás expone un campo de valor.
    assert!(veiled.get("value").is_none());
}

#[test]
fn certify_port_mapping_shape() {
    let mapping: PortMapping = serde_json::from_str(r#"{"container":80,"host":48080}"#).unwrap();
    assert_eq!(mapping, PortMapping { container: 80, host: 48080 });
}

#[test]
fn certify_initial_lifecycle_coordinates() {
    let initial = LifecycleState::initial();
    assert_eq!(initial.status, SandboxStatus::Pending);
    assert_eq!(initial.phase, SandboxPhase::Creating);
    assert!(!initial.status.is_terminal());
}
// FIN DEL ARCHIVO [libs/domain/models/src/tests_serialization.rs]
