// INICIO DEL ARCHIVO [libs/domain/models/src/validation.rs]
/*!
 * =================================================================
 * APARATO: VALIDATION ENGINE (V12.0 - BIT-EXACT CONTRACTS)
 * CLASIFICACIÓN: DOMAIN RULES (ESTRATO L2)
 * RESPONSABILIDAD: REGLAS DE VALIDACIÓN BIT-EXACTAS DE LA API
 *
 * VISION HIPER-HOLÍSTICA:
 * Centraliza los contratos de entrada del perímetro: patrones de
 * imagen y de clave de secreto, rangos de CPU/memoria/puertos/TTL
 * y política de contraseñas. Los handlers L4 consumen este aparato
 * y mapean toda violación a VALIDATION_ERROR (400).
 * =================================================================
 */

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::environment::PortMapping;
use crate::limits::MAX_PORT_MAPPINGS_PER_VERSION;

/// Patrón soberano de referencia de imagen OCI (case-insensitive).
static IMAGE_REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9][a-z0-9._\-/]*(:[\w][\w.\-]*)?$").expect("imagen: patrón inválido")
});

/// Patrón soberano de clave de secreto (estilo variable de entorno).
static SECRET_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("secreto: patrón inválido"));

pub const CPU_MINIMUM: f64 = 0.25;
pub const CPU_MAXIMUM: f64 = 4.0;
pub const CPU_DEFAULT: f64 = 2.0;
pub const MEMORY_MB_MINIMUM: u32 = 128;
pub const MEMORY_MB_MAXIMUM: u32 = 2048;
pub const MEMORY_MB_DEFAULT: u32 = 512;
pub const TTL_SECONDS_MINIMUM: u64 = 60;
pub const TTL_SECONDS_MAXIMUM: u64 = 604_800;
pub const PASSWORD_LENGTH_MINIMUM: usize = 8;
pub const PASSWORD_LENGTH_MAXIMUM: usize = 128;
pub const HOST_PORT_MINIMUM: u16 = 1024;

/// Violación de contrato de entrada; se proyecta como 400 en el perímetro.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationViolation(pub String);

impl ValidationViolation {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Certifica una referencia de imagen OCI (patrón + longitud 1..500).
pub fn validate_image_reference(image_reference: &str) -> Result<(), ValidationViolation> {
    if image_reference.is_empty() || image_reference.len() > 500 {
        return Err(ValidationViolation::new("image reference length must be 1..500"));
    }
    if !IMAGE_REFERENCE_PATTERN.is_match(image_reference) {
        return Err(ValidationViolation::new(format!(
            "image reference '{image_reference}' violates the OCI naming contract"
        )));
    }
    Ok(())
}

/// Certifica una clave de secreto (`^[A-Z_][A-Z0-9_]*$`, longitud 1..100).
pub fn validate_secret_key(secret_key: &str) -> Result<(), ValidationViolation> {
    if secret_key.is_empty() || secret_key.len() > 100 {
        return Err(ValidationViolation::new("secret key length must be 1..100"));
    }
    if !SECRET_KEY_PATTERN.is_match(secret_key) {
        return Err(ValidationViolation::new(format!(
            "secret key '{secret_key}' must match ^[A-Z_][A-Z0-9_]*$"
        )));
    }
    Ok(())
}

/// Certifica la asignación de CPU (0.25..4).
pub fn validate_cpu_allocation(cpu: f64) -> Result<(), ValidationViolation> {
    if !(CPU_MINIMUM..=CPU_MAXIMUM).contains(&cpu) || !cpu.is_finite() {
        return Err(ValidationViolation::new(format!(
            "cpu allocation {cpu} outside the sovereign range {CPU_MINIMUM}..{CPU_MAXIMUM}"
        )));
    }
    Ok(())
}

/// Certifica el límite de memoria en MB (entero 128..2048).
pub fn validate_memory_allocation(memory_mb: u32) -> Result<(), ValidationViolation> {
    if !(MEMORY_MB_MINIMUM..=MEMORY_MB_MAXIMUM).contains(&memory_mb) {
        return Err(ValidationViolation::new(format!(
            "memory {memory_mb}MB outside the sovereign range {MEMORY_MB_MINIMUM}..{MEMORY_MB_MAXIMUM}"
        )));
    }
    Ok(())
}

/**
 * Certifica un conjunto de mapeos de puertos:
 * contenedor 1..65535, host 1024..65535, máximo 10 por versión,
 * sin colisiones de puerto host dentro del conjunto.
 */
pub fn validate_port_mappings(mappings: &[PortMapping]) -> Result<(), ValidationViolation> {
    if mappings.len() > MAX_PORT_MAPPINGS_PER_VERSION {
        return Err(ValidationViolation::new(format!(
            "port mapping count {} exceeds the cap of {MAX_PORT_MAPPINGS_PER_VERSION}",
            mappings.len()
        )));
    }

    let mut seen_host_ports = std::collections::HashSet::new();
    for mapping in mappings {
        if mapping.container == 0 {
            return Err(ValidationViolation::new("container port must be 1..65535"));
        }
        if mapping.host < HOST_PORT_MINIMUM {
            return Err(ValidationViolation::new(format!(
                "host port {} below the non-privileged floor {HOST_PORT_MINIMUM}",
                mapping.host
            )));
        }
        if !seen_host_ports.insert(mapping.host) {
            return Err(ValidationViolation::new(format!(
                "host port {} mapped more than once",
                mapping.host
            )));
        }
    }
    Ok(())
}

/// Certifica un TTL en segundos (60..604800).
pub fn validate_ttl_seconds(ttl_seconds: u64) -> Result<(), ValidationViolation> {
    if !(TTL_SECONDS_MINIMUM..=TTL_SECONDS_MAXIMUM).contains(&ttl_seconds) {
        return Err(ValidationViolation::new(format!(
            "ttl {ttl_seconds}s outside the sovereign range {TTL_SECONDS_MINIMUM}..{TTL_SECONDS_MAXIMUM}"
        )));
    }
    Ok(())
}

/// Certifica la política de contraseñas del registro (8..128).
pub fn validate_password_policy(password: &str) -> Result<(), ValidationViolation> {
    let length = password.chars().count();
    if !(PASSWORD_LENGTH_MINIMUM..=PASSWORD_LENGTH_MAXIMUM).contains(&length) {
        return Err(ValidationViolation::new(format!(
            "password length must be {PASSWORD_LENGTH_MINIMUM}..{PASSWORD_LENGTH_MAXIMUM}"
        )));
    }
    Ok(())
}

/// Pliega el email a su forma canónica (case-folded, sin bordes).
pub fn normalize_email(email: &str) -> Result<String, ValidationViolation> {
    let folded = email.trim().to_lowercase();
    let has_valid_shape = folded
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);

    if !has_valid_shape {
        return Err(ValidationViolation::new(format!("email '{email}' is malformed")));
    }
    Ok(folded)
}

/// Certifica el nombre de un recurso (environment / sandbox).
pub fn validate_resource_name(name: &str) -> Result<(), ValidationViolation> {
    if name.is_empty() || name.len() > 100 {
        return Err(ValidationViolation::new("resource name length must be 1..100"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
        return Err(ValidationViolation::new(format!(
            "resource name '{name}' contains characters outside [a-zA-Z0-9._-]"
        )));
    }
    Ok(())
}
// FIN DEL ARCHIVO [libs/domain/models/src/validation.rs]
