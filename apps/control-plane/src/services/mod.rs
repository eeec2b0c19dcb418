// [apps/control-plane/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICES REGISTRY (V4.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO NOMINAL DE SERVICIOS Y DAEMONS
 * =================================================================
 */

pub mod credentials;
pub mod environments;
pub mod gauges;
pub mod log_collector;
pub mod log_hub;
pub mod provisioner;
pub mod rate_limiter;
pub mod reaper;
pub mod redaction;
pub mod retention;
pub mod sandboxes;

pub use environments::EnvironmentService;
pub use log_hub::LogHub;
pub use provisioner::TaskRegistry;
pub use rate_limiter::RateLimiter;
pub use sandboxes::SandboxService;
