// INICIO DEL ARCHIVO [tests/mirror/libs/core/vault/vault_opacity_integrity.test.rs]
/**
 * =================================================================
 * APARATO: VAULT OPACITY TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar round-trip, fail-closed ante manipulación y
 *           rechazo de llave maestra divergente.
 * =================================================================
 */

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crisol_core_vault::{SecretsVault, MASTER_KEY_LENGTH_BYTES};
use std::collections::HashMap;

#[test]
fn certify_roundtrip_and_opacity() {
    let vault = SecretsVault::new([42u8; MASTER_KEY_LENGTH_BYTES]);

    // 1. ROUND-TRIP: decrypt(encrypt(x)) == x
    let sealed = vault.encrypt("sk_live_ABCDEF").expect("sellado");
    assert_eq!(vault.decrypt(&sealed).expect("apertura"), "sk_live_ABCDEF");

    // 2. OPACIDAD: el criptograma jamás contiene el claro
    assert!(!sealed.contains("sk_live_ABCDEF"));
}

#[test]
fn certify_every_bitflip_collapses() {
    let vault = SecretsVault::new([42u8; MASTER_KEY_LENGTH_BYTES]);
    let sealed = vault.encrypt("classified-material").unwrap();
    let raw_payload = BASE64.decode(&sealed).unwrap();

    // Mutación de UN bit en cada posición del payload: todas deben colapsar
    for byte_index in 0..raw_payload.len() {
        let mut tampered_payload = raw_payload.clone();
        tampered_payload[byte_index] ^= 0b0000_0001;
        let tampered = BASE64.encode(&tampered_payload);

        assert!(
            vault.decrypt(&tampered).is_err(),
            "El bit {byte_index} mutado debería colapsar la apertura"
        );
    }
    println!("✅ VAULT: Fail-closed integrity certified across {} positions.", raw_payload.len());
}

#[test]
fn certify_foreign_key_rejection_and_bulk() {
    let sealing_vault = SecretsVault::new([1u8; MASTER_KEY_LENGTH_BYTES]);
    let foreign_vault = SecretsVault::new([2u8; MASTER_KEY_LENGTH_BYTES]);

    let mut plaintext_map = HashMap::new();
    plaintext_map.insert("API_KEY".to_string(), "sk_live_ABCDEF".to_string());
    plaintext_map.insert("DB_URL".to_string(), "postgres://vault".to_string());

    let sealed_map = sealing_vault.encrypt_map(&plaintext_map).unwrap();
    assert_eq!(sealing_vault.decrypt_map(&sealed_map).unwrap(), plaintext_map);

    // Llave maestra divergente: apertura masiva vetada
    assert!(foreign_vault.decrypt_map(&sealed_map).is_err());
}
// FIN DEL ARCHIVO [tests/mirror/libs/core/vault/vault_opacity_integrity.test.rs]
