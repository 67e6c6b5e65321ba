use std::{collections::HashMap, fs, path::Path};

use tempfile::TempDir;
use xreg_config::{
    CONFIG_JSON_VAR, CONFIG_PATH_VAR, ConfigSource, XregConfig,
    load_bucket_metadata,
};
use xreg_model::{Bck, Namespace, Provider};

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config dir");
    }
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_when_nothing_is_configured() {
    let dir = TempDir::new().expect("tempdir");
    let (config, source) =
        XregConfig::load_with(vars(&[]), dir.path()).expect("defaults");

    assert_eq!(source, ConfigSource::Default);
    assert_eq!(config.registry.event_capacity, 256);
    assert!(config.registry.sweep.enabled);
    assert!(config.registry.backends.providers.is_empty());
}

#[test]
fn env_path_wins_over_inline_json_and_default_files() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "xreg.toml", "[registry]\nevent_capacity = 8\n");
    let explicit = write(
        dir.path(),
        "custom.toml",
        "[registry.sweep]\ninterval_ms = 250\ntag = \"nightly\"\n",
    );
    let explicit_str = explicit.to_string_lossy().into_owned();

    let (config, source) = XregConfig::load_with(
        vars(&[
            (CONFIG_PATH_VAR, explicit_str.as_str()),
            (CONFIG_JSON_VAR, r#"{"registry":{"event_capacity":4}}"#),
        ]),
        dir.path(),
    )
    .expect("explicit file");

    assert_eq!(source, ConfigSource::EnvPath(explicit));
    assert_eq!(config.registry.sweep.interval_ms, 250);
    assert_eq!(config.registry.sweep.tag, "nightly");
    assert_eq!(config.registry.event_capacity, 256);
}

#[test]
fn inline_json_with_backends() {
    let dir = TempDir::new().expect("tempdir");
    let (config, source) = XregConfig::load_with(
        vars(&[(
            CONFIG_JSON_VAR,
            r#"{"registry":{"backends":{"providers":{"gcp":{"name":"eu"}}}},"log":{"default_directive":"debug"}}"#,
        )]),
        dir.path(),
    )
    .expect("inline json");

    assert_eq!(source, ConfigSource::EnvInline);
    assert_eq!(
        config.registry.backends.providers.get(&Provider::Gcp),
        Some(&Namespace::new("", "eu"))
    );
    assert_eq!(config.log.default_directive, "debug");
}

#[test]
fn first_existing_default_candidate_is_used() {
    let dir = TempDir::new().expect("tempdir");
    let nested = write(
        dir.path(),
        "config/xreg.json",
        r#"{"registry":{"sweep":{"enabled":false}}}"#,
    );

    let (config, source) =
        XregConfig::load_with(vars(&[]), dir.path()).expect("default file");
    assert_eq!(source, ConfigSource::File(nested));
    assert!(!config.registry.sweep.enabled);
}

#[test]
fn invalid_settings_are_rejected_with_context() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        dir.path(),
        "xreg.toml",
        "[registry.sweep]\ninterval_ms = 0\n",
    );

    let err = XregConfig::load_from_file(&path).expect_err("zero interval");
    let rendered = format!("{err:#}");
    assert!(rendered.contains("interval_ms"), "{rendered}");

    let err = XregConfig::load_with(
        vars(&[(
            CONFIG_JSON_VAR,
            r#"{"registry":{"backends":{"providers":{"ais":{}}}}}"#,
        )]),
        dir.path(),
    )
    .expect_err("local provider is not a backend");
    assert!(err.to_string().contains("not a remote backend"), "{err}");

    assert!(
        XregConfig::load_with(vars(&[(CONFIG_JSON_VAR, "{ nope")]), dir.path())
            .is_err()
    );
}

#[test]
fn extensionless_files_accept_toml_or_json() {
    let dir = TempDir::new().expect("tempdir");
    let toml_path = write(dir.path(), "xreg-a", "[log]\ndefault_directive = \"warn\"\n");
    let json_path = write(dir.path(), "xreg-b", r#"{"log":{"default_directive":"trace"}}"#);

    let from_toml = XregConfig::load_from_file(&toml_path).expect("toml");
    let from_json = XregConfig::load_from_file(&json_path).expect("json");
    assert_eq!(from_toml.log.default_directive, "warn");
    assert_eq!(from_json.log.default_directive, "trace");
}

#[test]
fn bucket_metadata_snapshot_loads_from_json() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        dir.path(),
        "bmd.json",
        r#"{
            "version": 17,
            "buckets": [
                { "bck": { "name": "b1", "provider": "ais" },
                  "props": { "mirror": { "enabled": true, "copies": 3 } } },
                { "bck": { "name": "b2", "provider": "aws", "ns": { "name": "eu" } } }
            ]
        }"#,
    );

    let bmd = load_bucket_metadata(&path).expect("snapshot");
    assert_eq!(bmd.version, 17);
    assert_eq!(bmd.len(), 2);
    let b1 = bmd.get(&Bck::ais("b1")).expect("b1");
    assert!(b1.mirror_enabled());
    assert_eq!(b1.props.mirror.copies, 3);
    let b2 = bmd
        .get(&Bck::new("b2", Provider::Aws, Namespace::new("", "eu")))
        .expect("b2");
    assert!(!b2.mirror_enabled());

    let missing = dir.path().join("absent.json");
    assert!(load_bucket_metadata(&missing).is_err());
}
