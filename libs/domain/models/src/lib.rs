// [libs/domain/models/src/lib.rs]
pub mod audit;
pub mod environment;
pub mod identity;
pub mod sandbox;
pub mod telemetry;
pub mod validation;

pub use audit::{AuditAction, AuditEntry};
pub use environment::{
    CreateEnvironmentPayload, Environment, EnvironmentResponse, EnvironmentVersion, PortMapping,
    RedactedSecret, SetSecretPayload, UpdateEnvironmentPayload,
};
pub use identity::{
    ApiKey, CreateApiKeyPayload, IssuedApiKey, LoginPayload, SessionGrant, SignupPayload, User,
    UserPublicProfile,
};
pub use sandbox::{
    CreateSandboxPayload, ExecCommandPayload, ExecCommandReport, LifecycleState,
    ReplicateSandboxPayload, Sandbox, SandboxDetailResponse, SandboxPhase, SandboxStatus,
};
pub use telemetry::{
    ContainerMetrics, LogSocketFrame, LogStreamKind, PlatformGauges, SandboxLogEntry,
    TerminalControlFrame,
};
pub use validation::ValidationViolation;

/// Cuotas y retenciones soberanas del plano de control.
pub mod limits {
    /// Máximo de Environments por tenant.
    pub const MAX_ENVIRONMENTS_PER_USER: u32 = 5;
    /// Máximo de Sandboxes en estado no-terminal por tenant.
    pub const MAX_LIVE_SANDBOXES_PER_USER: u32 = 10;
    /// Máximo de mapeos de puertos por versión de Environment.
    pub const MAX_PORT_MAPPINGS_PER_VERSION: usize = 10;
    /// Retención por sandbox: filas más recientes conservadas.
    pub const SANDBOX_LOG_RETENTION_ROWS: u32 = 10_000;
    /// Retención global de logs de sandbox en días.
    pub const LOG_RETENTION_DAYS: i64 = 7;
    /// Retención de entradas de auditoría en días.
    pub const AUDIT_RETENTION_DAYS: i64 = 90;
}
