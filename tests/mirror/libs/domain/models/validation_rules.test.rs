// INICIO DEL ARCHIVO [tests/mirror/libs/domain/models/validation_rules.test.rs]
/**
 * =================================================================
 * APARATO: VALIDATION RULES TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar los contratos de entrada bit-exactos del
 *           perímetro (imagen, secretos, rangos y política).
 * =================================================================
 */

use crisol_domain_models::validation::*;
use crisol_domain_models::PortMapping;

#[test]
fn certify_image_reference_contract() {
    // Referencias legales del ecosistema OCI
    assert!(validate_image_reference("nginx:alpine").is_ok());
    assert!(validate_image_reference("registry.example.com/team/app:1.2.3").is_ok());
    assert!(validate_image_reference("ubuntu").is_ok());
    assert!(validate_image_reference("NGINX:Alpine").is_ok()); // case-insensitive

    // Violaciones del contrato
    assert!(validate_image_reference("").is_err());
    assert!(validate_image_reference(":tag-only").is_err());
    assert!(validate_image_reference("image;rm -rf /").is_err());
    assert!(validate_image_reference("image`whoami`").is_err());
    assert!(validate_image_reference(&"a".repeat(501)).is_err());
}

#[test]
fn certify_secret_key_contract() {
    assert!(validate_secret_key("API_KEY").is_ok());
    assert!(validate_secret_key("_PRIVATE").is_ok());
    assert!(validate_secret_key("DB_URL_2").is_ok());

    assert!(validate_secret_key("").is_err());
    assert!(validate_secret_key("lowercase").is_err());
    assert!(validate_secret_key("1LEADING_DIGIT").is_err());
    assert!(validate_secret_key("WITH-DASH").is_err());
    assert!(validate_secret_key(&"K".repeat(101)).is_err());
}

#[test]
fn certify_resource_ranges() {
    // CPU 0.25..4 (default 2)
    assert!(validate_cpu_allocation(0.25).is_ok());
    assert!(validate_cpu_allocation(4.0).is_ok());
    assert!(validate_cpu_allocation(CPU_DEFAULT).is_ok());
    assert!(validate_cpu_allocation(0.1).is_err());
    assert!(validate_cpu_allocation(4.5).is_err());
    assert!(validate_cpu_allocation(f64::NAN).is_err());

    // Memoria 128..2048 MB (default 512)
    assert!(validate_memory_allocation(128).is_ok());
    assert!(validate_memory_allocation(2048).is_ok());
    assert!(validate_memory_allocation(MEMORY_MB_DEFAULT).is_ok());
    assert!(validate_memory_allocation(64).is_err());
    assert!(validate_memory_allocation(4096).is_err());

    // TTL 60..604800 segundos
    assert!(validate_ttl_seconds(60).is_ok());
    assert!(validate_ttl_seconds(604_800).is_ok());
    assert!(validate_ttl_seconds(59).is_err());
    assert!(validate_ttl_seconds(604_801).is_err());

    // Contraseña 8..128
    assert!(validate_password_policy("passwordXYZ").is_ok());
    assert!(validate_password_policy("short").is_err());
    assert!(validate_password_policy(&"p".repeat(129)).is_err());
}

#[test]
fn certify_port_mapping_contract() {
    let legal = vec![PortMapping { container: 80, host: 48080 }];
    assert!(validate_port_mappings(&legal).is_ok());

    // Host bajo el piso no privilegiado
    let privileged = vec![PortMapping { container: 80, host: 80 }];
    assert!(validate_port_mappings(&privileged).is_err());

    // Puerto de contenedor nulo
    let void_container = vec![PortMapping { container: 0, host: 48080 }];
    assert!(validate_port_mappings(&void_container).is_err());

    // Colisión de host dentro del conjunto
    let colliding = vec![
        PortMapping { container: 80, host: 48080 },
        PortMapping { container: 81, host: 48080 },
    ];
    assert!(validate_port_mappings(&colliding).is_err());

    // Más de 10 mapeos por versión
    let oversized: Vec<PortMapping> = (0u16..11)
        .map(|offset| PortMapping { container: 80 + offset, host: 48080 + offset })
        .collect();
    assert!(validate_port_mappings(&oversized).is_err());
}

#[test]
fn certify_email_case_folding() {
    assert_eq!(normalize_email("  User@Example.COM ").unwrap(), "user@example.com");
    assert!(normalize_email("not-an-email").is_err());
    assert!(normalize_email("@missing-local.com").is_err());
    assert!(normalize_email("user@no-dot").is_err());
}
// FIN DEL ARCHIVO [tests/mirror/libs/domain/models/validation_rules.test.rs]
