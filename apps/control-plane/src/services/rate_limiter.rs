// INICIO DEL ARCHIVO [apps/control-plane/src/services/rate_limiter.rs]
/*!
 * =================================================================
 * APARATO: FIXED WINDOW RATE LIMITER (V5.0 - PERIMETER SHIELD)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: CONTENCIÓN DE RÁFAGAS POR TENANT Y POR IP
 *
 * VISION HIPER-HOLÍSTICA:
 * Ventana fija en RAM: clave de alcance → (inicio de ventana, conteo).
 * Tres alcances soberanos: peticiones autenticadas por tenant,
 * creaciones de sandbox por tenant y intentos de autenticación por IP.
 * =================================================================
 */

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Umbral de censo que dispara la poda de ventanas muertas.
const PRUNE_THRESHOLD_ENTRIES: usize = 4096;

#[derive(Default)]
pub struct RateLimiter {
    /// clave de alcance → (epoch de inicio de ventana, conteo acumulado).
    active_windows: Mutex<HashMap<String, (i64, u32)>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Registra un hit y evalúa la ventana del alcance.
     * `true` => autorizado; `false` => la ráfaga excede el límite.
     */
    pub fn check(&self, scope_key: &str, limit: u32, window_seconds: i64) -> bool {
        let now_epoch = Utc::now().timestamp();
        let mut windows_guard = self.active_windows.lock().expect("ventanas envenenadas");

        // Poda oportunista de ventanas muertas ante censos desbordados
        if windows_guard.len() > PRUNE_THRESHOLD_ENTRIES {
            windows_guard.retain(|_, (window_start, _)| now_epoch - *window_start < window_seconds);
        }

        let window_entry = windows_guard.entry(scope_key.to_string()).or_insert((now_epoch, 0));

        if now_epoch - window_entry.0 >= window_seconds {
            // Ventana vencida: reinicio del censo
            *window_entry = (now_epoch, 0);
        }

        window_entry.1 += 1;
        if window_entry.1 > limit {
            warn!("🛡️ [RATE_SHIELD]: Scope [{}] exceeded {} hits per window.", scope_key, limit);
            return false;
        }
        true
    }
}

// FIN DEL ARCHIVO [apps/control-plane/src/services/rate_limiter.rs]
