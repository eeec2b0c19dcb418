// INICIO DEL ARCHIVO [libs/core/vault/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN SECRETS VAULT (V17.2 - MASTER KEY EDITION)
 * CLASIFICACIÓN: CORE SECURITY (ESTRATO L1)
 * RESPONSABILIDAD: CIFRADO AUTENTICADO AES-256-GCM DE SECRETOS
 *
 * VISION HIPER-HOLÍSTICA:
 * Implementa la bóveda simétrica de proceso para los secretos de los
 * Environments. El material en claro jamás abandona este aparato
 * excepto hacia el vector de entorno del contenedor en ignición.
 *
 * # Mathematical Proof (Opacity):
 * Cada sellado usa un nonce fresco de 96 bits; el tag GCM garantiza
 * que cualquier mutación de un solo bit del criptograma colapse el
 * descifrado (fail-closed).
 * =================================================================
 */

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Longitud soberana de la llave maestra (AES-256).
pub const MASTER_KEY_LENGTH_BYTES: usize = 32;
/// Longitud del nonce GCM antepuesto a cada criptograma.
const NONCE_LENGTH_BYTES: usize = 12;
/// Variable de entorno portadora de la llave maestra (Base64).
pub const MASTER_KEY_ENVIRONMENT_VARIABLE: &str = "SECRETS_MASTER_KEY";

#[derive(Error, Debug)]
pub enum VaultError {
    /// La llave maestra está ausente o su material es inválido.
    #[error("[L1_VAULT_KEY_FAULT]: MASTER_KEY_MALFORMED -> {0}")]
    MalformedMasterKey(String),

    /// Fallo de codificación Base64 en el criptograma entrante.
    #[error("[L1_VAULT_ENCODING_FAULT]: {0}")]
    EncodingError(#[from] base64::DecodeError),

    /// El motor GCM rechazó la operación de sellado.
    #[error("[L1_VAULT_SEAL_FAULT]: ENCRYPTION_REJECTED")]
    EncryptionError,

    /// Integridad comprometida o llave maestra incorrecta.
    #[error("[L1_VAULT_OPEN_FAULT]: Integrity compromised or incorrect Master Key")]
    DecryptionError,
}

/**
 * Motor criptográfico de la bóveda de secretos del plano de control.
 */
pub struct SecretsVault {
    cipher_engine: Aes256Gcm,
}

impl SecretsVault {
    /**
     * Forja la bóveda a partir de material de llave crudo de 32 bytes.
     */
    pub fn new(master_key_material: [u8; MASTER_KEY_LENGTH_BYTES]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&master_key_material);
        Self { cipher_engine: Aes256Gcm::new(key) }
    }

    /**
     * Hidrata la bóveda desde el entorno del proceso.
     *
     * # Logic:
     * 1. Producción (release): La ausencia o malformación de la llave es
     *    un fallo fatal de ignición.
     * 2. Desarrollo (debug): Se genera una llave efímera aleatoria con
     *    advertencia prominente; los secretos no sobreviven al reinicio.
     */
    pub fn from_environment() -> Result<Self, VaultError> {
        match std::env::var(MASTER_KEY_ENVIRONMENT_VARIABLE) {
            Ok(encoded_master_key) => {
                let decoded_material = BASE64.decode(encoded_master_key.trim())?;
                let key_material: [u8; MASTER_KEY_LENGTH_BYTES] =
                    decoded_material.try_into().map_err(|material: Vec<u8>| {
                        VaultError::MalformedMasterKey(format!(
                            "expected {} bytes, received {}",
                            MASTER_KEY_LENGTH_BYTES,
                            material.len()
                        ))
                    })?;
                Ok(Self::new(key_material))
            }
            Err(_) if cfg!(debug_assertions) => {
                warn!(
                    "🔓 [VAULT_EPHEMERAL]: {} undefined. Generating RANDOM master key; \
                     sealed secrets will NOT survive a restart. Never run production like this.",
                    MASTER_KEY_ENVIRONMENT_VARIABLE
                );
                let mut ephemeral_key = [0u8; MASTER_KEY_LENGTH_BYTES];
                rand::thread_rng().fill_bytes(&mut ephemeral_key);
                Ok(Self::new(ephemeral_key))
            }
            Err(_) => Err(VaultError::MalformedMasterKey(format!(
                "{} is mandatory in production strata",
                MASTER_KEY_ENVIRONMENT_VARIABLE
            ))),
        }
    }

    /**
     * Sella un secreto en claro: nonce fresco ∥ criptograma+tag, en Base64.
     */
    pub fn encrypt(&self, plaintext_value: &str) -> Result<String, VaultError> {
        let mut nonce_material = [0u8; NONCE_LENGTH_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce_material);
        let nonce = Nonce::from_slice(&nonce_material);

        let sealed_payload = self
            .cipher_engine
            .encrypt(nonce, plaintext_value.as_bytes())
            .map_err(|_| VaultError::EncryptionError)?;

        let mut wire_payload = Vec::with_capacity(NONCE_LENGTH_BYTES + sealed_payload.len());
        wire_payload.extend_from_slice(&nonce_material);
        wire_payload.extend_from_slice(&sealed_payload);

        Ok(BASE64.encode(wire_payload))
    }

    /**
     * Abre un criptograma sellado por esta bóveda.
     *
     * # Errors:
     * `VaultError::DecryptionError` ante cualquier manipulación del payload
     * o llave maestra divergente (verificación de Auth Tag).
     */
    pub fn decrypt(&self, sealed_value: &str) -> Result<String, VaultError> {
        let wire_payload = BASE64.decode(sealed_value)?;
        if wire_payload.len() <= NONCE_LENGTH_BYTES {
            return Err(VaultError::DecryptionError);
        }

        let (nonce_material, sealed_payload) = wire_payload.split_at(NONCE_LENGTH_BYTES);
        let nonce = Nonce::from_slice(nonce_material);

        let opened_bytes = self
            .cipher_engine
            .decrypt(nonce, sealed_payload)
            .map_err(|_| VaultError::DecryptionError)?;

        String::from_utf8(opened_bytes).map_err(|_| VaultError::DecryptionError)
    }

    /**
     * Sella todas las entradas de un mapa de secretos (clave → claro).
     */
    pub fn encrypt_map(
        &self,
        plaintext_entries: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, VaultError> {
        plaintext_entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.encrypt(value)?)))
            .collect()
    }

    /**
     * Abre todas las entradas de un mapa sellado (clave → criptograma).
     */
    pub fn decrypt_map(
        &self,
        sealed_entries: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, VaultError> {
        sealed_entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.decrypt(value)?)))
            .collect()
    }
}

// FIN DEL ARCHIVO [libs/core/vault/src/lib.rs]
