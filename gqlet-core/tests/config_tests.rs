//! Config loading and document discovery against real project trees.

use assert_fs::prelude::*;
use gqlet_core::{
    discover::{binding_for, Discovery},
    Config, ConfigError, DocumentPath, SchemaName,
};
use predicates::prelude::*;
use rstest::rstest;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// 1. Load errors
// ---------------------------------------------------------------------------

#[test]
fn missing_config_returns_not_found() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let err = Config::load_at(root.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains(".gqlet.yml"));
}

#[test]
fn malformed_yaml_reports_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(".gqlet.yml")
        .write_str("schema: [unclosed\n")
        .expect("write");
    let err = Config::load_at(root.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains(".gqlet.yml"));
}

#[test]
fn missing_documents_key_is_parse_error() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(".gqlet.yml")
        .write_str("schema: schema.graphqls\n")
        .expect("write");
    let err = Config::load_at(root.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[rstest]
#[case("schema: s.graphqls\ndocuments: d.graphql\njobs: 0\n", "jobs")]
#[case("schema: []\ndocuments: d.graphql\n", "schema")]
#[case(
    "schema: s.graphqls\ndocuments: d.graphql\nprojects:\n  - name: default\n    schema: a.graphqls\n    documents: a/*.graphql\n",
    "reserved"
)]
fn invalid_values_are_rejected(#[case] yaml: &str, #[case] needle: &str) {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(".gqlet.yml").write_str(yaml).expect("write");
    let err = Config::load_at(root.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains(needle), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Explicit config path
// ---------------------------------------------------------------------------

#[rstest]
#[case(None, ".gqlet.yml")]
#[case(Some("config/gqlet.yml"), "config/gqlet.yml")]
fn config_path_resolves_against_root(#[case] given: Option<&str>, #[case] expected: &str) {
    let root = Path::new("/work/app");
    let resolved = Config::path_at(root, given.map(Path::new));
    assert_eq!(resolved, root.join(expected));
}

#[test]
fn load_from_explicit_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("config/gqlet.yml");
    file.write_str("schema: schema.graphqls\ndocuments: '**/*.graphql'\ngenerated_dir: gen\n")
        .expect("write");
    file.assert(predicate::path::is_file());

    let config = Config::load_at(root.path(), Some(Path::new("config/gqlet.yml"))).unwrap();
    assert_eq!(config.generated_dir, PathBuf::from("gen"));
    assert_eq!(
        config.manifest_path(root.path()),
        root.path().join(".gqlet").join("manifest.json")
    );
}

// ---------------------------------------------------------------------------
// 3. Discovery
// ---------------------------------------------------------------------------

fn project() -> assert_fs::TempDir {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("schema.graphqls").write_str("type Query { a: Int }").unwrap();
    root.child("src/viewer.graphql").write_str("query V { a }").unwrap();
    root.child("src/nested/list.graphql").write_str("query L { a }").unwrap();
    root.child("src/broken.graphql").write_str("query B { a }").unwrap();
    root.child("admin/users.graphql").write_str("query U { a }").unwrap();
    root.child("admin/schema.graphqls").write_str("type Query { u: Int }").unwrap();
    root
}

#[test]
fn discovery_applies_excludes_and_sorts() {
    let root = project();
    let yaml = "schema: schema.graphqls\ndocuments:\n  - 'src/**/*.graphql'\n  - '!src/broken.graphql'\n";
    root.child(".gqlet.yml").write_str(yaml).unwrap();
    let config = Config::load_at(root.path(), None).unwrap();

    let discovery = Discovery::scan(root.path(), &config).unwrap();
    let docs: Vec<String> = discovery
        .documents(&config)
        .unwrap()
        .into_iter()
        .map(|(d, _)| d.0)
        .collect();
    assert_eq!(docs, vec!["src/nested/list.graphql", "src/viewer.graphql"]);

    let schema = discovery.schema_files(&config.schema).unwrap();
    assert_eq!(schema, vec![DocumentPath::from("schema.graphqls")]);
}

#[test]
fn projects_bind_their_own_documents() {
    let root = project();
    let yaml = "\
schema: schema.graphqls
documents: '**/*.graphql'
projects:
  - name: admin
    schema: admin/schema.graphqls
    documents: 'admin/**/*.graphql'
";
    root.child(".gqlet.yml").write_str(yaml).unwrap();
    let config = Config::load_at(root.path(), None).unwrap();

    let discovery = Discovery::scan(root.path(), &config).unwrap();
    let docs = discovery.documents(&config).unwrap();
    let admin: Vec<_> = docs
        .iter()
        .filter(|(_, s)| s.0 == "admin")
        .map(|(d, _)| d.as_str())
        .collect();
    assert_eq!(admin, vec!["admin/users.graphql"]);
    assert_eq!(docs.len(), 4);

    assert_eq!(
        binding_for(&config, &DocumentPath::from("admin/new.graphql")).unwrap(),
        SchemaName::from("admin")
    );
}
