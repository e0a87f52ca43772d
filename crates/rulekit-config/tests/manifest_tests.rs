//! Rules manifest tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use rulekit_config::{ConfigError, ConfigLoader, CrateKind, FlagValue, RulesManifest};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_manifest_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let manifest_path = dir.join("rules.toml");
    fs::write(&manifest_path, content).unwrap();
    manifest_path
}

const GENERATED_MANIFEST: &str = r#"
[settings]
default_platform = "x86_64-unknown-linux-gnu"
extra_rustc_flags = ["-Cdebuginfo=1"]

[settings.flags]
pipelined_compilation = true

[[target]]
name = "libc"
srcs = ["**/*.rs"]
crate_root = "src/lib.rs"
edition = "2015"
version = "0.2.153"
features = ["default", "std"]
rustc_flags = ["--cap-lints=allow"]
tags = ["cargo-bazel", "crate-name=libc", "manual", "noclippy", "norustfmt"]
deps = ["build_script_build"]

[target.feature_map]
default = ["std"]
std = []

[target.compatible_with]
"@rules_rust//rust/platform:aarch64-apple-darwin" = []
"@rules_rust//rust/platform:x86_64-unknown-linux-gnu" = []
"//conditions:default" = ["@platforms//:incompatible"]

[[build_script]]
name = "build_script_build"
srcs = ["**/*.rs"]
crate_root = "build.rs"
edition = "2015"
version = "0.2.153"
features = ["default", "std"]
rustc_flags = ["--cap-lints=allow"]
tags = ["manual", "noclippy", "norustfmt"]
data = ["**"]

[build_script.build_script_env]
CARGO_PKG_HOMEPAGE = "https://github.com/rust-lang/libc"
"#;

#[test]
fn test_load_generated_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_manifest_file(temp_dir.path(), GENERATED_MANIFEST);

    let manifest = RulesManifest::load_from_file(&path).unwrap();

    assert_eq!(manifest.targets.len(), 1);
    assert_eq!(manifest.build_scripts.len(), 1);

    let libc = &manifest.targets[0];
    assert_eq!(libc.kind, CrateKind::Library);
    assert_eq!(libc.version.as_deref(), Some("0.2.153"));
    assert_eq!(libc.deps, vec!["build_script_build".to_string()]);
    assert_eq!(libc.compatible_with.as_ref().unwrap().len(), 3);

    let script = &manifest.build_scripts[0];
    assert_eq!(script.target.crate_root.as_deref(), Some(Path::new("build.rs")));
    assert_eq!(script.data, vec!["**".to_string()]);

    assert_eq!(
        manifest.settings.flag("pipelined_compilation"),
        Some(&FlagValue::Bool(true))
    );
}

#[test]
fn test_missing_manifest_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = RulesManifest::load_from_file(&temp_dir.path().join("rules.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_syntax_error_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_manifest_file(temp_dir.path(), "[[target]\nname = ");

    match RulesManifest::load_from_file(&path) {
        Err(ConfigError::TomlParseError { file, .. }) => assert_eq!(file, path),
        other => panic!("expected TomlParseError, got {:?}", other),
    }
}

#[rstest]
#[case("2015", true)]
#[case("2018", true)]
#[case("2021", true)]
#[case("2024", true)]
#[case("2019", false)]
#[case("", false)]
fn test_edition_validation(#[case] edition: &str, #[case] valid: bool) {
    let content = format!(
        "[[target]]\nname = \"foo\"\nsrcs = [\"src/lib.rs\"]\nedition = \"{}\"\n",
        edition
    );
    assert_eq!(RulesManifest::parse(&content).is_ok(), valid);
}

#[test]
fn test_empty_target_name_rejected() {
    let result = RulesManifest::parse("[[target]]\nname = \"\"\n");
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_empty_condition_key_rejected() {
    let result = RulesManifest::parse(
        r#"
[[target]]
name = "foo"

[target.compatible_with]
"" = []
"#,
    );
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_loader_without_manifest_yields_empty_table() {
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_user_config_path(temp_dir.path().join("absent.toml"))
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.manifest.is_empty());
}
