//! Layout files and the builder

use datastore_rs::{
    ConfigError, Datastore, DatastoreBuilder, DatastoreError, InitialValue, Layout, ResourceSpec,
    ResourceType,
};
use std::fs;
use tempfile::TempDir;

const LAYOUT: &str = r#"
[[resource]]
id = 0
name = "temperature"
type = "float"
instances = 4
initial = ["21.5", "21.5", "0", "0"]

[[resource]]
id = 1
name = "ssid"
type = "string"
instances = 1
width = 33

[[resource]]
id = 4
name = "retries"
type = "uint8"
instances = 2
initial = [3]
"#;

#[test]
fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.toml");
    fs::write(&path, LAYOUT).unwrap();

    let layout = Layout::load(&path).unwrap();
    let store = Datastore::new();
    layout.apply(&store).unwrap();

    assert_eq!(store.resource_count(), 3);
    assert_eq!(store.get_name(0).unwrap().as_deref(), Some("temperature"));
    assert_eq!(store.get_name(1).unwrap().as_deref(), Some("ssid"));
    assert_eq!(store.get_float(0, 0).unwrap(), 21.5);
    assert_eq!(store.get_float(0, 3).unwrap(), 0.0);
    assert_eq!(store.resource_size(1).unwrap(), 33);
    assert_eq!(store.get_string(1, 0).unwrap(), "");
    assert_eq!(store.get_uint8(4, 0).unwrap(), 3);
    assert_eq!(store.get_uint8(4, 1).unwrap(), 0);
}

#[test]
fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.json");
    let layout = Layout::from_toml_str(LAYOUT).unwrap();
    fs::write(&path, layout.to_json_string().unwrap()).unwrap();

    assert_eq!(Layout::load(&path).unwrap(), layout);
}

#[test]
fn test_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.yaml");
    fs::write(&path, LAYOUT).unwrap();
    assert!(matches!(Layout::load(&path), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Layout::load(dir.path().join("absent.toml")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_malformed_toml() {
    let err = Layout::from_toml_str("[[resource]]\nid = \"zero\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_unknown_type_name() {
    let text = "[[resource]]\nid = 0\ntype = \"int64\"\ninstances = 1\n";
    assert!(matches!(Layout::from_toml_str(text), Err(ConfigError::Toml(_))));
}

#[test]
fn test_builder_applies_layout() {
    let layout = Layout::new()
        .with_resource(
            ResourceSpec::new(2, ResourceType::Int32, 2)
                .with_name("offset")
                .with_initial(InitialValue::Integer(-5)),
        )
        .with_resource(
            ResourceSpec::new(3, ResourceType::String, 1)
                .with_width(8)
                .with_initial(InitialValue::Text("abc".into())),
        );

    let store = DatastoreBuilder::new().layout(layout).build().unwrap();
    assert_eq!(store.get_int32(2, 0).unwrap(), -5);
    assert_eq!(store.get_string(3, 0).unwrap(), "abc");
    assert_eq!(store.get_name(2).unwrap().as_deref(), Some("offset"));
}

#[test]
fn test_applying_twice_conflicts() {
    let layout = Layout::from_toml_str(LAYOUT).unwrap();
    let store = Datastore::new();
    layout.apply(&store).unwrap();

    let err = layout.apply(&store).unwrap_err();
    assert!(matches!(err, ConfigError::Store(DatastoreError::DuplicateId(0))));
}
