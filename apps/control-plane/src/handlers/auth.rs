// INICIO DEL ARCHIVO [apps/control-plane/src/handlers/auth.rs]
/*!
 * =================================================================
 * APARATO: AUTH & ACCOUNT HANDLER (V14.0 - TENANT GENESIS)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO, SESIONES, LLAVES API Y RASTRO FORENSE
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IP SHIELD: Los intentos de autenticación viajan bajo ventana
 *    fija por IP (20 / 15 min) antes de tocar verificadores.
 * 2. SINGLE REVEAL: El secreto completo de una llave API viaja al
 *    tenant exactamente una vez, en su acuñado.
 * =================================================================
 */

use crate::errors::{envelope_ok, ApiError};
use crate::middleware::AuthenticatedIdentity;
use crate::services::credentials;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use crisol_domain_models::{
    validation, AuditAction, CreateApiKeyPayload, IssuedApiKey, LoginPayload, SessionGrant,
    SignupPayload, UserPublicProfile,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct AuthHandler;

impl AuthHandler {
    /**
     * Registro de tenant: email case-folded único, política 8..128.
     */
    #[instrument(skip(application_state, request_headers, payload))]
    pub async fn handle_signup(
        State(application_state): State<AppState>,
        request_headers: HeaderMap,
        Json(payload): Json<SignupPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        enforce_auth_attempt_shield(&application_state, &request_headers)?;

        let canonical_email = validation::normalize_email(&payload.email)?;
        validation::validate_password_policy(&payload.password)?;

        let password_verifier = credentials::derive_password_verifier(&payload.password);
        let user = application_state
            .user_repository
            .insert_user(&canonical_email, &password_verifier)
            .await
            .map_err(|fault| match fault {
                crisol_infra_db::DbError::Conflict(_) => {
                    ApiError::Conflict("email already registered".into())
                }
                other => other.into(),
            })?;

        append_auth_audit(&application_state, user.id, AuditAction::UserSignup, &request_headers)
            .await;

        let (token, expires_at) = credentials::mint_session_token(
            &application_state.config.session_signing_secret,
            user.id,
            application_state.config.session_ttl_hours,
        );

        info!("👤 [SIGNUP]: Tenant [{}] registered.", canonical_email);
        Ok(envelope_ok(SessionGrant { token, expires_at, user: UserPublicProfile::from(&user) }))
    }

    /**
     * Apertura de sesión: verificación PBKDF2 y acuñado HS256.
     */
    #[instrument(skip(application_state, request_headers, payload))]
    pub async fn handle_login(
        State(application_state): State<AppState>,
        request_headers: HeaderMap,
        Json(payload): Json<LoginPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        enforce_auth_attempt_shield(&application_state, &request_headers)?;

        let canonical_email = validation::normalize_email(&payload.email)
            .map_err(|_| ApiError::Unauthorized("invalid credentials".into()))?;

        let user = application_state
            .user_repository
            .find_by_email(&canonical_email)
            .await?
            .filter(|candidate| credentials::verify_password(&payload.password, &candidate.password_verifier))
            .ok_or_else(|| {
                warn!("❌ [LOGIN_REJECTION]: Credential verification collapsed.");
                ApiError::Unauthorized("invalid credentials".into())
            })?;

        append_auth_audit(&application_state, user.id, AuditAction::UserLogin, &request_headers)
            .await;

        let (token, expires_at) = credentials::mint_session_token(
            &application_state.config.session_signing_secret,
            user.id,
            application_state.config.session_ttl_hours,
        );

        Ok(envelope_ok(SessionGrant { token, expires_at, user: UserPublicProfile::from(&user) }))
    }

    /// Perfil del tenant autenticado.
    pub async fn handle_me(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let user = application_state
            .user_repository
            .find_by_id(identity.user_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(envelope_ok(UserPublicProfile::from(&user)))
    }

    /**
     * Acuñado de llave API: el secreto completo viaja UNA sola vez.
     */
    #[instrument(skip(application_state, identity, payload))]
    pub async fn handle_create_api_key(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Json(payload): Json<CreateApiKeyPayload>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        validation::validate_resource_name(&payload.name)?;

        let minted = credentials::mint_api_key();
        let stored_key = application_state
            .api_key_repository
            .insert_key(identity.user_id, &minted.lookup_prefix, &minted.secret_digest, &payload.name)
            .await?;

        audit_identity_action(
            &application_state,
            &identity,
            AuditAction::ApiKeyCreated,
            "api_key",
            &stored_key.id.to_string(),
        )
        .await;

        Ok(envelope_ok(IssuedApiKey {
            id: stored_key.id,
            name: stored_key.name,
            prefix: stored_key.prefix,
            secret: minted.full_secret,
            created_at: stored_key.created_at,
        }))
    }

    /// Inventario de llaves (metadatos; el digest jamás se proyecta).
    pub async fn handle_list_api_keys(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let keys = application_state.api_key_repository.list_for_user(identity.user_id).await?;
        Ok(envelope_ok(keys))
    }

    /// Revocación de llave del tenant.
    #[instrument(skip(application_state, identity))]
    pub async fn handle_revoke_api_key(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
        Path(key_id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let revoked =
            application_state.api_key_repository.revoke(identity.user_id, key_id).await?;
        if !revoked {
            return Err(ApiError::NotFound);
        }

        audit_identity_action(
            &application_state,
            &identity,
            AuditAction::ApiKeyRevoked,
            "api_key",
            &key_id.to_string(),
        )
        .await;

        Ok(envelope_ok(serde_json::json!({ "revoked": true })))
    }

    /// Rastro forense del tenant (más reciente primero, acotado).
    pub async fn handle_list_audit(
        State(application_state): State<AppState>,
        Extension(identity): Extension<AuthenticatedIdentity>,
    ) -> Result<Json<serde_json::Value>, ApiError> {
        let trail = application_state.audit_repository.list_for_user(identity.user_id, 100).await?;
        Ok(envelope_ok(trail))
    }
}

// --- ESTRATO DE SOPORTE (PRIVATE SSoT) ---

/// Escudo de intentos de autenticación por IP (20 / 15 min).
fn enforce_auth_attempt_shield(
    application_state: &AppState,
    request_headers: &HeaderMap,
) -> Result<(), ApiError> {
    let client_ip = header_client_ip(request_headers).unwrap_or_else(|| "unknown".to_string());
    let window_seconds = (application_state.config.auth_window_minutes * 60) as i64;

    let authorized = application_state.rate_limiter.check(
        &format!("auth:{client_ip}"),
        application_state.config.auth_attempts_per_window,
        window_seconds,
    );
    if !authorized {
        return Err(ApiError::RateLimited("authentication attempt rate exceeded".into()));
    }
    Ok(())
}

fn header_client_ip(request_headers: &HeaderMap) -> Option<String> {
    request_headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(|first_hop| first_hop.trim().to_string())
}

fn header_client_agent(request_headers: &HeaderMap) -> Option<String> {
    request_headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn append_auth_audit(
    application_state: &AppState,
    user_id: Uuid,
    action: AuditAction,
    request_headers: &HeaderMap,
) {
    if let Err(audit_fault) = application_state
        .audit_repository
        .append(
            user_id,
            action,
            "user",
            &user_id.to_string(),
            serde_json::Value::Null,
            header_client_ip(request_headers).as_deref(),
            header_client_agent(request_headers).as_deref(),
        )
        .await
    {
        warn!("⚠️ [AUDIT_SKIP]: Trail append failed: {audit_fault}");
    }
}

async fn audit_identity_action(
    application_state: &AppState,
    identity: &AuthenticatedIdentity,
    action: AuditAction,
    resource_type: &str,
    resource_id: &str,
) {
    if let Err(audit_fault) = application_state
        .audit_repository
        .append(
            identity.user_id,
            action,
            resource_type,
            resource_id,
            serde_json::Value::Null,
            identity.client_ip.as_deref(),
            identity.client_agent.as_deref(),
        )
        .await
    {
        warn!("⚠️ [AUDIT_SKIP]: Trail append failed: {audit_fault}");
    }
}
// FIN DEL ARCHIVO [apps/control-plane/src/handlers/auth.rs]
