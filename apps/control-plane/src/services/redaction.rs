// INICIO DEL ARCHIVO [apps/control-plane/src/services/redaction.rs]
/*!
 * =================================================================
 * APARATO: SECRET REDACTION ENGINE (V7.0 - PANOPTICON VEIL)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VELADO DE SECRETOS EN TODO TEXTO DE LOG
 *
 * VISION HIPER-HOLÍSTICA:
 * Todo texto de log que toque el Ledger o un WebSocket pasa por este
 * velo: asignaciones estilo variable de entorno y formatos de llave
 * API de la plataforma colapsan a '[REDACTED]' en su posición.
 * =================================================================
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Asignaciones sensibles estilo variable de entorno.
static ASSIGNMENT_VEIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(SECRET_\w+|API_KEY|PASSWORD|TOKEN|PRIVATE_KEY)=\S+")
        .expect("velado: patrón de asignación inválido")
});

/// Formato de llave API de la plataforma (`sk_` + material).
static PLATFORM_KEY_VEIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsk_[A-Za-z0-9_]{8,}").expect("velado: patrón de llave inválido"));

/**
 * Vela todo secreto reconocible dentro de una línea de log.
 * La clave de la asignación sobrevive; el valor colapsa en posición.
 */
pub fn redact_log_text(raw_text: &str) -> String {
    let veiled_assignments = ASSIGNMENT_VEIL.replace_all(raw_text, "$1=[REDACTED]");
    PLATFORM_KEY_VEIL.replace_all(&veiled_assignments, "[REDACTED]").into_owned()
}

// FIN DEL ARCHIVO [apps/control-plane/src/services/redaction.rs]
