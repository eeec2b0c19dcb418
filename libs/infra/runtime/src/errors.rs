// [libs/infra/runtime/src/errors.rs]
/*!
 * =================================================================
 * APARATO: RUNTIME ERROR CATALOG (V6.0 - CATEGORIZED FAULTS)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL RUNTIME
 *
 * VISION HIPER-HOLÍSTICA:
 * Cuatro categorías soberanas {NotFound, Conflict, Unavailable, Other};
 * el Servicio de Sandboxes L4 las traduce a transiciones del ciclo de
 * vida o a errores retriables del perímetro.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    /// El contenedor o la imagen no existen en el motor.
    #[error("[L3_RUNTIME_FAULT]: RESOURCE_NOT_FOUND -> {0}")]
    NotFound(String),

    /// Colisión de nombre o de puerto host en el motor (retriable).
    #[error("[L3_RUNTIME_FAULT]: ENGINE_CONFLICT -> {0}")]
    Conflict(String),

    /// El socket del motor no responde (daemon caído o saturado).
    #[error("[L3_RUNTIME_FAULT]: ENGINE_UNAVAILABLE -> {0}")]
    Unavailable(String),

    /// Fallo no categorizado del motor o del decodificado de streams.
    #[error("[L3_RUNTIME_FAULT]: ENGINE_FAULT -> {0}")]
    Other(String),
}

impl From<bollard::errors::Error> for RuntimeError {
    /// Proyecta el catálogo de bollard sobre las cuatro categorías soberanas.
    fn from(engine_fault: bollard::errors::Error) -> Self {
        use bollard::errors::Error as EngineFault;
        match engine_fault {
            EngineFault::DockerResponseServerError { status_code: 404, message } => {
                RuntimeError::NotFound(message)
            }
            EngineFault::DockerResponseServerError { status_code: 409, message } => {
                RuntimeError::Conflict(message)
            }
            EngineFault::DockerResponseServerError { status_code, message } => {
                RuntimeError::Other(format!("HTTP {status_code}: {message}"))
            }
            EngineFault::IOError { err } => RuntimeError::Unavailable(err.to_string()),
            EngineFault::RequestTimeoutError => {
                RuntimeError::Unavailable("engine request timeout".into())
            }
            other => RuntimeError::Other(other.to_string()),
        }
    }
}
