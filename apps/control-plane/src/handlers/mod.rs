// [apps/control-plane/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLERS REGISTRY (V4.0)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE ADAPTADORES HTTP/WS
 * =================================================================
 */

pub mod auth;
pub mod environment;
pub mod health;
pub mod sandbox;
pub mod stream;
