// [apps/control-plane/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: AUTH GATE & PERIMETER SHIELD (V18.0 - DUAL CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DUAL DE CREDENCIALES E INYECCIÓN
 *                  DE IDENTIDAD DE TENANT EN CADA PETICIÓN
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DUAL CITIZENSHIP: Llaves API `sk_…` (prefijo + digest de tiempo
 *    constante) y tokens de sesión HS256 (firma + expiración).
 * 2. EXTENSION INJECTION: 'AuthenticatedIdentity' viaja en el flujo
 *    asíncrono de la petición para consumo en handlers y servicios.
 * 3. RATE SHIELD: Ventana fija de 100 peticiones/min por tenant sobre
 *    las rutas autenticadas.
 * =================================================================
 */

use crate::errors::ApiError;
use crate::services::credentials;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Identidad soberana extraída del túnel de seguridad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// Identificador unívoco del tenant.
    pub user_id: Uuid,
    /// Llave API empleada, si la ciudadanía fue de larga duración.
    pub api_key_id: Option<Uuid>,
    /// Correlación de rastro por petición.
    pub trace_id: String,
    pub client_ip: Option<String>,
    pub client_agent: Option<String>,
}

/**
 * Guardia de Autenticación: el portero soberano del perímetro.
 *
 * # Logic:
 * 1. Bearer con marcador `sk_` -> ciudadanía de llave API.
 * 2. En otro caso -> token de sesión HS256.
 * 3. Identidad válida -> escudo de ráfagas por tenant -> extensión.
 */
pub async fn auth_gate(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .and_then(|header_value| header_value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer credential".into()))?
        .to_string();

    let client_ip = extract_client_ip(&request);
    let client_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let identity =
        authenticate_bearer(&application_state, &bearer_token, client_ip, client_agent).await?;

    // Escudo de ráfagas por tenant (100 req/min por defecto)
    let authorized = application_state.rate_limiter.check(
        &format!("tenant:{}", identity.user_id),
        application_state.config.requests_per_minute,
        60,
    );
    if !authorized {
        return Err(ApiError::RateLimited("request rate exceeded for tenant".into()));
    }

    debug!("👤 [AUTH]: Tenant {} authenticated (trace {}).", identity.user_id, identity.trace_id);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/**
 * Núcleo de validación dual, compartido con el hub WebSocket (que
 * recibe la credencial vía query param `token`).
 */
pub async fn authenticate_bearer(
    application_state: &AppState,
    bearer_token: &str,
    client_ip: Option<String>,
    client_agent: Option<String>,
) -> Result<AuthenticatedIdentity, ApiError> {
    let trace_id = Uuid::new_v4().to_string();

    // --- ESCENARIO ALFA: LLAVE API DE LARGA DURACIÓN ---
    if let Some(lookup_prefix) = credentials::extract_lookup_prefix(bearer_token) {
        let presented_digest = credentials::digest_api_key(bearer_token);

        let candidate_keys =
            application_state.api_key_repository.find_active_by_prefix(lookup_prefix).await?;

        for candidate in candidate_keys {
            let digests_match = credentials::constant_time_compare(
                presented_digest.as_bytes(),
                candidate.hashed_secret.as_bytes(),
            );
            if digests_match && candidate.is_active() {
                // Estampado de último uso (mejor esfuerzo)
                if let Err(ledger_fault) =
                    application_state.api_key_repository.stamp_last_used(candidate.id).await
                {
                    debug!("⚪ [AUTH]: last_used stamp skipped: {ledger_fault}");
                }
                return Ok(AuthenticatedIdentity {
                    user_id: candidate.user_id,
                    api_key_id: Some(candidate.id),
                    trace_id,
                    client_ip,
                    client_agent,
                });
            }
        }

        warn!("❌ [AUTH_REJECTION]: API key verification collapsed.");
        return Err(ApiError::Unauthorized("invalid api key".into()));
    }

    // --- ESCENARIO BETA: TOKEN DE SESIÓN HS256 ---
    match credentials::verify_session_token(
        &application_state.config.session_signing_secret,
        bearer_token,
    ) {
        Some(user_id) => Ok(AuthenticatedIdentity {
            user_id,
            api_key_id: None,
            trace_id,
            client_ip,
            client_agent,
        }),
        None => {
            warn!("❌ [AUTH_REJECTION]: Invalid session token signature or expiry.");
            Err(ApiError::Unauthorized("invalid or expired session token".into()))
        }
    }
}

/// IP del cliente: cabecera de proxy o ausencia nominal.
pub fn extract_client_ip(request: &Request) -> Option<String> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(|first_hop| first_hop.trim().to_string())
}
