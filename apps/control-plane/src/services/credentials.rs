// INICIO DEL ARCHIVO [apps/control-plane/src/services/credentials.rs]
/*!
 * =================================================================
 * APARATO: CREDENTIAL PRIMITIVES (V9.0 - DUAL CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VERIFICADORES PBKDF2, LLAVES API Y SESIONES HS256
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. PBKDF2 SOBERANO: 150.000 iteraciones HMAC-SHA256 con sal fresca
 *    por verificador.
 * 2. CONSTANT TIME: La comparación de digests de llave API pliega XOR
 *    sobre el ancho completo; jamás corta en el primer byte divergente.
 * 3. HS256 SESSIONS: Token de tres segmentos (header.payload.firma)
 *    con verificación de firma y expiración.
 * =================================================================
 */

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Iteraciones soberanas de derivación (sincronizadas con el Dashboard).
const PBKDF2_ITERATIONS: u32 = 150_000;
const VERIFIER_HASH_LENGTH: usize = 32;
const VERIFIER_SALT_LENGTH: usize = 16;

/// Prefijo nominal de las llaves API de la plataforma.
pub const API_KEY_PREFIX_MARKER: &str = "sk_";
/// Longitud del prefijo de localización: `sk_` + 8 hex.
pub const API_KEY_LOOKUP_PREFIX_LENGTH: usize = 11;
/// Entropía del secreto completo en bytes (40 hex tras el marcador).
const API_KEY_SECRET_BYTES: usize = 20;

// --- ESTRATO DE VERIFICADORES DE CONTRASEÑA ---

/**
 * Deriva el verificador persistible: `pbkdf2$iter$salt_b64$hash_b64`.
 */
pub fn derive_password_verifier(password: &str) -> String {
    let mut salt_material = [0u8; VERIFIER_SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt_material);

    let mut derived_hash = [0u8; VERIFIER_HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt_material, PBKDF2_ITERATIONS, &mut derived_hash);

    format!(
        "pbkdf2${PBKDF2_ITERATIONS}${}${}",
        BASE64.encode(salt_material),
        BASE64.encode(derived_hash)
    )
}

/**
 * Certifica una contraseña contra su verificador persistido.
 * Cualquier malformación del verificador colapsa en rechazo.
 */
pub fn verify_password(password: &str, stored_verifier: &str) -> bool {
    let segments: Vec<&str> = stored_verifier.split('$').collect();
    if segments.len() != 4 || segments[0] != "pbkdf2" {
        return false;
    }

    let iterations: u32 = match segments[1].parse() {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    let salt_material = match BASE64.decode(segments[2]) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };
    let expected_hash = match BASE64.decode(segments[3]) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };

    let mut candidate_hash = vec![0u8; expected_hash.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt_material, iterations, &mut candidate_hash);

    constant_time_compare(&candidate_hash, &expected_hash)
}

// --- ESTRATO DE LLAVES API ---

/// Material acuñado de una llave API nueva.
pub struct MintedApiKey {
    /// Secreto completo `sk_…`; viaja al tenant UNA sola vez.
    pub full_secret: String,
    /// Prefijo de localización indexado en el Ledger.
    pub lookup_prefix: String,
    /// Digest SHA-256 (hex) persistido en el Ledger.
    pub secret_digest: String,
}

/// Acuña una llave API con entropía fresca.
pub fn mint_api_key() -> MintedApiKey {
    let mut secret_material = [0u8; API_KEY_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut secret_material);

    let full_secret = format!("{API_KEY_PREFIX_MARKER}{}", hex::encode(secret_material));
    let lookup_prefix = full_secret[..API_KEY_LOOKUP_PREFIX_LENGTH].to_string();
    let secret_digest = digest_api_key(&full_secret);

    MintedApiKey { full_secret, lookup_prefix, secret_digest }
}

/// Digest SHA-256 (hex) de un secreto de llave API completo.
pub fn digest_api_key(full_secret: &str) -> String {
    hex::encode(Sha256::digest(full_secret.as_bytes()))
}

/// Extrae el prefijo de localización de un bearer con marcador `sk_`.
pub fn extract_lookup_prefix(bearer_token: &str) -> Option<&str> {
    if bearer_token.starts_with(API_KEY_PREFIX_MARKER)
        && bearer_token.len() >= API_KEY_LOOKUP_PREFIX_LENGTH
    {
        Some(&bearer_token[..API_KEY_LOOKUP_PREFIX_LENGTH])
    } else {
        None
    }
}

/**
 * Comparación de tiempo constante: pliegue XOR sobre el ancho completo.
 */
pub fn constant_time_compare(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let accumulated_divergence = left
        .iter()
        .zip(right.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    accumulated_divergence == 0
}

// --- ESTRATO DE TOKENS DE SESIÓN (HS256) ---

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// Identificador soberano del tenant.
    sub: String,
    /// Instante de emisión (epoch).
    iat: i64,
    /// Instante de expiración (epoch).
    exp: i64,
}

/**
 * Acuña un token de sesión HS256 de tres segmentos.
 */
pub fn mint_session_token(
    signing_secret: &str,
    user_id: Uuid,
    ttl_hours: i64,
) -> (String, DateTime<Utc>) {
    let issued_at = Utc::now();
    let expires_at = issued_at + Duration::hours(ttl_hours);

    let header_segment = BASE64_URL.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };
    let payload_segment =
        BASE64_URL.encode(serde_json::to_vec(&claims).expect("claims siempre serializan"));

    let signing_input = format!("{header_segment}.{payload_segment}");
    let signature_segment = BASE64_URL.encode(sign_hs256(signing_secret, &signing_input));

    (format!("{signing_input}.{signature_segment}"), expires_at)
}

/**
 * Verifica firma y expiración de un token de sesión.
 * Retorna el sujeto (user id) únicamente ante un token íntegro y vigente.
 */
pub fn verify_session_token(signing_secret: &str, bearer_token: &str) -> Option<Uuid> {
    let segments: Vec<&str> = bearer_token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let signing_input = format!("{}.{}", segments[0], segments[1]);
    let presented_signature = BASE64_URL.decode(segments[2]).ok()?;
    let expected_signature = sign_hs256(signing_secret, &signing_input);

    if !constant_time_compare(&presented_signature, &expected_signature) {
        return None;
    }

    let claims: SessionClaims =
        serde_json::from_slice(&BASE64_URL.decode(segments[1]).ok()?).ok()?;
    if claims.exp <= Utc::now().timestamp() {
        return None;
    }

    Uuid::parse_str(&claims.sub).ok()
}

fn sign_hs256(signing_secret: &str, signing_input: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC acepta llaves de cualquier longitud");
    mac.update(signing_input.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

// FIN DEL ARCHIVO [apps/control-plane/src/services/credentials.rs]
