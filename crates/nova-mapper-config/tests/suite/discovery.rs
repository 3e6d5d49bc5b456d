use nova_mapper_config::{discover_config_path, load_for_root, ConfigError, NovaMapperConfig};
use tempfile::tempdir;

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempdir().expect("tempdir");
    let (config, path, diagnostics) = load_for_root(dir.path()).expect("load should succeed");
    assert_eq!(config, NovaMapperConfig::default());
    assert!(path.is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn discovers_the_dotfile_variant() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(".nova-mapper.toml");
    std::fs::write(&path, "[options]\ndeep_cloning = true\n").expect("write config");

    assert_eq!(discover_config_path(dir.path()), Some(path.clone()));
    let (config, found, _diagnostics) = load_for_root(dir.path()).expect("load should succeed");
    assert_eq!(found, Some(path));
    assert_eq!(config.options.deep_cloning, Some(true));
}

#[test]
fn unreadable_paths_report_io_errors() {
    let dir = tempdir().expect("tempdir");
    let err = NovaMapperConfig::load_from_path(dir.path().join("missing.toml"))
        .expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
}
