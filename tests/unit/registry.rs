//! Unit tests for the endpoint registry

use std::io::Write;
use tempfile::NamedTempFile;
use wb_report_loader::registry::{EndpointDefinition, EndpointRegistry, ParamShape, RegistryError};
use wb_report_loader::DateRange;

#[test]
fn test_builtin_keys_in_registration_order() {
    let registry = EndpointRegistry::load().unwrap();
    let keys = registry.all_keys();

    assert_eq!(keys.len(), 13);
    assert_eq!(&keys[..3], &["reportDetail", "sales", "orders"]);
    assert_eq!(keys.last(), Some(&"characteristics_change"));
}

#[test]
fn test_builtin_registry_is_shared() {
    let a = EndpointRegistry::load().unwrap();
    let b = EndpointRegistry::load().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn test_lookup_unknown_key() {
    let registry = EndpointRegistry::load().unwrap();
    assert!(matches!(
        registry.lookup("nope"),
        Err(RegistryError::UnknownEndpoint(ref k)) if k == "nope"
    ));
}

#[test]
fn test_custom_registry_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
  "schema_version": "1.0",
  "last_updated": "2025-10-20",
  "endpoints": [
    {{
      "key": "card_stats",
      "display_name": "Card statistics",
      "url_template": "{{base_url}}/api/v1/cards",
      "params": {{ "shape": "date_with_nm_id", "nm_id": 12345 }},
      "static_params": {{ "nmId": "999", "page": "1" }}
    }}
  ]
}}"#
    )
    .unwrap();

    let registry = EndpointRegistry::from_file(file.path()).unwrap();
    let endpoint = registry.lookup("card_stats").unwrap();
    assert_eq!(endpoint.param_shape(), &ParamShape::DateWithNmId { nm_id: 12345 });

    let range = DateRange::parse("2025-10-13", Some("2025-10-19")).unwrap();
    let query = endpoint.build_query(&range);
    // Generated nmId wins over the static one
    assert_eq!(
        query,
        vec![
            ("dateFrom".to_string(), "2025-10-13".to_string()),
            ("dateTo".to_string(), "2025-10-19".to_string()),
            ("nmId".to_string(), "12345".to_string()),
            ("page".to_string(), "1".to_string()),
        ]
    );
    assert_eq!(endpoint.url("https://example.test/"), "https://example.test/api/v1/cards");
}

#[test]
fn test_duplicate_keys_rejected() {
    let result = EndpointRegistry::from_definitions(vec![
        EndpointDefinition::new("a", "A", "{base_url}/a", ParamShape::None),
        EndpointDefinition::new("a", "A again", "{base_url}/a2", ParamShape::Since),
    ]);
    assert!(matches!(result, Err(RegistryError::DuplicateKey(ref k)) if k == "a"));
}

#[test]
fn test_malformed_registry_rejected() {
    assert!(matches!(
        EndpointRegistry::from_json("{ not json"),
        Err(RegistryError::ParseError(_))
    ));
}
