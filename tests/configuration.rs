use std::fs;
use std::path::PathBuf;

use succession::SuccessionError;
use succession::config::EngineConfig;
use succession::engine::Engine;

// Writes `toml` to a file of its own, so tests never share a path.
fn settings_file(test: &str, toml: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("succession-{}-{test}.toml", std::process::id()));
    fs::write(&path, toml).expect("settings file");
    path
}

fn environment(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn setup(toml: &str) -> Engine {
    let config = EngineConfig::from_toml_str(toml).expect("config");
    Engine::with_config(config).expect("engine")
}

#[test]
fn root_name_is_configurable() {
    let engine = setup("root_name = \"Base\"");
    let a = engine.declare("A", &[]).unwrap();
    assert_eq!(engine.precedence_names(a).unwrap(), ["A", "Base"]);
    assert_eq!(engine.find("Base").unwrap(), engine.root());
}

#[test]
fn invalid_root_name_is_refused() {
    let config = EngineConfig::from_toml_str("root_name = \"not valid\"").unwrap();
    let err = Engine::<(), ()>::with_config(config).unwrap_err();
    assert!(matches!(err, SuccessionError::InvalidName(_)));
}

#[test]
fn validated_declaration_refuses_inconsistent_class() {
    let engine = setup("validate_on_declare = true");
    engine.declare("A", &[]).unwrap();
    engine.declare("B", &[]).unwrap();
    engine.declare("X", &["A", "B"]).unwrap();
    engine.declare("Y", &["B", "A"]).unwrap();
    let before = engine.len().unwrap();
    let err = engine.declare("Z", &["X", "Y"]).unwrap_err();
    assert!(matches!(err, SuccessionError::InconsistentHierarchy { ref class, .. } if class == "Z"));
    // the graph is unchanged and the name is still free
    assert_eq!(engine.len().unwrap(), before);
    assert!(engine.find("Z").is_err());
    let z = engine.declare("Z", &["X"]).unwrap();
    assert_eq!(engine.precedence_names(z).unwrap(), ["Z", "X", "A", "B", "object"]);
}

#[test]
fn lazy_declaration_accepts_inconsistent_class() {
    let engine = setup("validate_on_declare = false");
    engine.declare("A", &[]).unwrap();
    engine.declare("F", &["A"]).unwrap();
    let h = engine.declare("H", &["A", "F"]).unwrap();
    assert!(engine.precedence_of(h).is_err());
}

#[test]
fn unknown_parent_is_refused() {
    let engine = setup("");
    let err = engine.declare("A", &["Ghost"]).unwrap_err();
    assert!(matches!(err, SuccessionError::UnknownClass(ref name) if name == "Ghost"));
}

#[test]
fn settings_are_read_from_a_file() {
    let path = settings_file("file", "root_name = \"Base\"\nvalidate_on_declare = true\n");
    let loaded = EngineConfig::load_with_environment(path.to_str(), Some(environment(&[])));
    fs::remove_file(&path).unwrap();
    let config = loaded.unwrap();
    assert_eq!(config.root_name, "Base");
    assert!(config.validate_on_declare);
    let engine: Engine = Engine::with_config(config).unwrap();
    assert_eq!(engine.find("Base").unwrap(), engine.root());
}

#[test]
fn environment_overrides_the_file() {
    let path = settings_file("environment", "root_name = \"Base\"\n");
    let loaded = EngineConfig::load_with_environment(
        path.to_str(),
        Some(environment(&[
            ("SUCCESSION_ROOT_NAME", "Env"),
            ("SUCCESSION_VALIDATE_ON_DECLARE", "true"),
            ("UNRELATED_ROOT_NAME", "Ignored"),
        ])),
    );
    fs::remove_file(&path).unwrap();
    let config = loaded.unwrap();
    assert_eq!(config.root_name, "Env");
    assert!(config.validate_on_declare);
}

#[test]
fn file_values_apply_to_keys_the_environment_leaves_alone() {
    let path = settings_file("partial", "validate_on_declare = true\n");
    let loaded = EngineConfig::load_with_environment(
        path.to_str(),
        Some(environment(&[("SUCCESSION_ROOT_NAME", "Env")])),
    );
    fs::remove_file(&path).unwrap();
    let config = loaded.unwrap();
    assert_eq!(config.root_name, "Env");
    assert!(config.validate_on_declare);
}
