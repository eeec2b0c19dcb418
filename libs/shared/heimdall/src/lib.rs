// [libs/shared/heimdall/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HEIMDALL NEURAL OBSERVER (V26.1 - CONTROL PLANE EDITION)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: GESTIÓN DE TELEMETRÍA, TRAZADO Y CAPTURA DE PÁNICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRATA SILENCE: Clampa el ruido de infraestructura (hyper, tower,
 *    libsql, bollard) a 'warn' para preservar el rastro del dominio.
 * 2. PHOENIX SHIELD: Hook de pánico global con coordenadas de estrato
 *    y volcado forense del payload.
 * 3. DUAL MODE: Consola compacta en desarrollo, JSON plano en
 *    producción para la ingesta del Panóptico.
 * =================================================================
 */

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};
use tracing::{error, info};
use std::panic;

/// Inicializa el sistema de trazas Heimdall con blindaje de pánicos soberano.
///
/// # Comportamiento:
/// - Desarrollo: Logs interactivos compactos con resaltado de color.
/// - Producción: Estructura JSON plana para ingesta estructurada.
/// - `LOG_LEVEL` (o `RUST_LOG`) sobreescribe el filtro por defecto.
///
/// # Errors:
/// Retorna pánico si otro suscriptor global ya fue inicializado en el runtime.
pub fn init_tracing(service_nominal_identifier: &str) {
    // 1. CONFIGURACIÓN DEL FILTRO DINÁMICO (Sovereign Filter)
    // Priorizamos los logs del dominio y silenciamos ruidos de infraestructura.
    let default_severity = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) { "debug".into() } else { "info".into() }
    });

    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{service}={level},tower_http=warn,hyper=warn,libsql=error,bollard=warn",
            service = service_nominal_identifier,
            level = default_severity
        )
        .into()
    });

    let is_production_strata = !cfg!(debug_assertions);

    // 2. CONSTRUCCIÓN DE LA ARQUITECTURA DE SUSCRIPCIÓN (Dual Mode)
    if is_production_strata {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    // 3. PROTOCOLO PHOENIX SHIELD (Global Panic Hook)
    // Captura colapsos en tareas secundarias (provisioners, colectores de logs)
    // antes de la defunción del proceso.
    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata.location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_STRATA_COORDINATES".to_string());

        let panic_payload_message = panic_metadata.payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_metadata.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("UNDEFINED_KERNEL_COLLAPSE_PAYLOAD");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            estrato = %panic_location,
            "🔥 [CRITICAL_PANIC]: Task terminated abruptly. Analysis: {}",
            panic_payload_message
        );
    }));

    info!(
        "👁️  [HEIMDALL_ONLINE]: Observability strata levelized for [{}]. Phoenix Shield ACTIVE.",
        service_nominal_identifier
    );
}
