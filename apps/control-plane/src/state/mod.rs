// [apps/control-plane/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V19.0 - CONTROL PLANE)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: PLACA BASE DE REPOSITORIOS, SERVICIOS Y DAEMONS
 *
 * VISION HIPER-HOLÍSTICA:
 * Composition root del plano: el Ledger L3, la Bóveda L1, el Runtime
 * Adapter L3 y los servicios L4 se conectan aquí una sola vez. Todo
 * miembro viaja en 'Arc<T>' para inmutabilidad compartida.
 * =================================================================
 */

use crate::config::ControlPlaneConfig;
use crate::services::{EnvironmentService, LogHub, RateLimiter, SandboxService};
use crisol_core_vault::SecretsVault;
use crisol_domain_models::PlatformGauges;
use crisol_infra_db::repositories::{
    ApiKeyRepository, AuditRepository, EnvironmentRepository, SandboxLogRepository,
    SandboxRepository, UserRepository,
};
use crisol_infra_db::StoreClient;
use crisol_infra_runtime::ContainerRuntime;
use std::sync::{Arc, RwLock};
use tracing::debug;

/**
 * Contenedor de estado compartido (Thread-Safe) del plano de control.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico del Ledger (libSQL).
    pub database_client: StoreClient,
    /// Coordenadas operativas inmutables.
    pub config: Arc<ControlPlaneConfig>,
    /// Bóveda de secretos AES-256-GCM (L1).
    pub secrets_vault: Arc<SecretsVault>,
    /// Costura soberana hacia el motor de contenedores.
    pub runtime: Arc<dyn ContainerRuntime>,
    /// Broker de difusión de logs por sandbox (C6).
    pub log_hub: Arc<LogHub>,
    /// Escudo de ráfagas del perímetro.
    pub rate_limiter: Arc<RateLimiter>,
    /// Medidores del plano refrescados por el daemon C8.
    pub platform_gauges: Arc<RwLock<PlatformGauges>>,

    // --- ESTRATO L3: REPOSITORIOS DE AUTORIDAD ÚNICA ---
    pub user_repository: Arc<UserRepository>,
    pub api_key_repository: Arc<ApiKeyRepository>,
    pub environment_repository: Arc<EnvironmentRepository>,
    pub sandbox_repository: Arc<SandboxRepository>,
    pub log_repository: Arc<SandboxLogRepository>,
    pub audit_repository: Arc<AuditRepository>,

    // --- ESTRATO L4: SERVICIOS DE DOMINIO ---
    pub environment_service: Arc<EnvironmentService>,
    pub sandbox_service: Arc<SandboxService>,
}

impl AppState {
    /**
     * Forja el Estado Maestro inyectando todas las dependencias.
     */
    pub fn new(
        database_client: StoreClient,
        secrets_vault: SecretsVault,
        runtime: Arc<dyn ContainerRuntime>,
        config: ControlPlaneConfig,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V19.0...");

        let config = Arc::new(config);
        let secrets_vault = Arc::new(secrets_vault);
        let log_hub = Arc::new(LogHub::new());

        // Pre-hidratación de repositorios soberanos
        let user_repository = Arc::new(UserRepository::new(database_client.clone()));
        let api_key_repository = Arc::new(ApiKeyRepository::new(database_client.clone()));
        let environment_repository = Arc::new(EnvironmentRepository::new(database_client.clone()));
        let sandbox_repository = Arc::new(SandboxRepository::new(database_client.clone()));
        let log_repository = Arc::new(SandboxLogRepository::new(database_client.clone()));
        let audit_repository = Arc::new(AuditRepository::new(database_client.clone()));

        let environment_service = Arc::new(EnvironmentService::new(
            Arc::clone(&environment_repository),
            Arc::clone(&sandbox_repository),
            Arc::clone(&audit_repository),
            Arc::clone(&secrets_vault),
            Arc::clone(&runtime),
        ));

        let sandbox_service = Arc::new(SandboxService::new(
            Arc::clone(&sandbox_repository),
            Arc::clone(&environment_repository),
            Arc::clone(&log_repository),
            Arc::clone(&audit_repository),
            Arc::clone(&secrets_vault),
            Arc::clone(&runtime),
            Arc::clone(&log_hub),
            Arc::clone(&config),
        ));

        Self {
            database_client,
            config,
            secrets_vault,
            runtime,
            log_hub,
            rate_limiter: Arc::new(RateLimiter::new()),
            platform_gauges: Arc::new(RwLock::new(PlatformGauges::default())),
            user_repository,
            api_key_repository,
            environment_repository,
            sandbox_repository,
            log_repository,
            audit_repository,
            environment_service,
            sandbox_service,
        }
    }
}
