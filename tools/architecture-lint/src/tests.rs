//! Unit tests for the dependency rules.

use std::path::Path;

use rstest::rstest;

use super::*;

fn check_one(path: &str, contents: &str) -> Result<(), LintError> {
    check_sources(&[SourceFile::new(path, contents)])
}

fn violations_of(path: &str, contents: &str) -> Vec<Violation> {
    match check_one(path, contents) {
        Err(LintError::Violations(violations)) => violations,
        other => panic!("expected violations, got {other:?}"),
    }
}

fn references_in(contents: &str) -> Vec<Reference> {
    let file = syn::parse_file(contents).expect("valid rust");
    references::collect(&file).into_iter().collect()
}

#[rstest]
#[case("use tokio::sync::Mutex;", "tokio")]
#[case("#[tokio::test] async fn runs() {}", "tokio")]
#[case("fn read(dir: &cap_std::fs::Dir) { let _ = dir; }", "cap_std")]
#[case("use tracing::debug;", "tracing")]
#[case("use async_trait::async_trait;", "async_trait")]
#[case("extern crate uuid;", "uuid")]
#[case("use {serde::Serialize, rand::Rng};", "rand")]
fn schema_crate_rejects_runtime_crates(#[case] contents: &str, #[case] banned: &str) {
    let violations = violations_of("backend/crates/document-schema/src/value.rs", contents);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].reference, Reference::Crate(banned.to_owned()));
    assert_eq!(violations[0].rule, "document-schema is pure and synchronous");
}

#[rstest]
fn schema_crate_accepts_serialisation_crates() {
    let contents = "use chrono::{DateTime, Utc}; use serde::Serialize; use thiserror::Error; \
        fn parse(raw: &str) -> serde_json::Result<serde_json::Value> { serde_json::from_str(raw) }";
    assert!(check_one("backend/crates/document-schema/src/lib.rs", contents).is_ok());
}

#[rstest]
#[case("backend/src/domain/refid/mod.rs", true)]
#[case("backend/src/domain/refid/tests.rs", true)]
#[case("backend/src/domain/refid_backfill.rs", false)]
#[case("backend/src/outbound/memory.rs", false)]
#[case("backend/src/bin/fleetctl.rs", false)]
fn rand_is_confined_to_refid(#[case] path: &str, #[case] allowed: bool) {
    let result = check_one(path, "use rand::Rng; fn draw(rng: &mut impl Rng) -> u64 { rng.random() }");
    assert_eq!(result.is_ok(), allowed, "{result:?}");
}

#[rstest]
#[case("backend/src/domain/entity_creation.rs", "use crate::outbound::InMemoryDocumentStore;", "outbound")]
#[case("backend/src/domain/entity_creation.rs", "use fleet_backend::inbound::cli;", "inbound")]
#[case("backend/src/domain/schema_cache.rs", "use crate::config::FleetSettings;", "config")]
#[case("backend/src/inbound/cli.rs", "fn open() { let _ = crate::outbound::JsonFileDocumentStore::open; }", "outbound")]
#[case("backend/src/outbound/memory.rs", "use crate::{domain::ports, inbound::CliRequest};", "inbound")]
fn layers_cannot_cross(#[case] path: &str, #[case] contents: &str, #[case] layer: &str) {
    let violations = violations_of(path, contents);
    assert_eq!(
        violations
            .iter()
            .map(|violation| violation.reference.clone())
            .collect::<Vec<_>>(),
        vec![Reference::Layer(layer.to_owned())]
    );
}

#[rstest]
#[case("backend/src/domain/entity_creation.rs", "fn id() { let _ = uuid::Uuid::new_v4(); }")]
#[case("backend/src/domain/error.rs", "use ortho_config::OrthoConfig;")]
#[case("backend/src/inbound/cli.rs", "use cap_std::fs::Dir;")]
#[case("backend/src/inbound/cli.rs", "use tempfile::TempDir;")]
#[case("backend/src/outbound/filesystem/mod.rs", "use clap::Parser;")]
fn adapters_keep_their_crates(#[case] path: &str, #[case] contents: &str) {
    assert!(matches!(
        check_one(path, contents),
        Err(LintError::Violations(violations)) if violations.len() == 1
    ));
}

#[rstest]
#[case("backend/src/domain/entity_creation.rs", "use crate::domain::ports::DocumentStore; use tracing::debug;")]
#[case("backend/src/inbound/cli.rs", "use crate::domain::{EntityKind, ports::DocumentStore}; use clap::Subcommand;")]
#[case("backend/src/outbound/filesystem/mod.rs", "use cap_std::fs::Dir; use uuid::Uuid; use crate::domain::ports;")]
#[case("backend/src/config.rs", "use ortho_config::OrthoConfig; use crate::outbound::JsonFileDocumentStore;")]
#[case("backend/src/bin/fleetctl.rs", "use fleet_backend::{inbound, outbound}; use tracing_subscriber::EnvFilter;")]
fn permitted_references_pass(#[case] path: &str, #[case] contents: &str) {
    let result = check_one(path, contents);
    assert!(result.is_ok(), "{result:?}");
}

#[rstest]
fn files_outside_every_scope_are_not_parsed() {
    assert!(check_one("backend/tests/cli_handler.rs", "this is not rust").is_ok());
    assert!(check_one("tools/architecture-lint/src/lib.rs", "use rand::Rng;").is_ok());
}

#[rstest]
fn scopes_match_whole_path_components() {
    let rule = RULES
        .iter()
        .find(|rule| rule.scope == "backend/src/domain")
        .expect("domain rule");
    assert!(rule.applies_to(Path::new("backend/src/domain/mod.rs")));
    assert!(!rule.applies_to(Path::new("backend/src/domain_extras/mod.rs")));
    assert!(!rule.applies_to(Path::new("backend/src")));
}

#[rstest]
fn local_paths_are_not_crates() {
    let references = references_in(
        "use self::inner::Thing; use super::Sibling; \
         fn f() -> Self { let _ = (Thing, Sibling); Self::default() }",
    );
    assert!(references.is_empty(), "{references:?}");
}

#[rstest]
fn grouped_crate_imports_resolve_each_layer() {
    let references = references_in("use crate::{domain::ports, outbound::memory, config};");
    assert_eq!(
        references,
        vec![
            Reference::Layer("config".to_owned()),
            Reference::Layer("domain".to_owned()),
            Reference::Layer("outbound".to_owned()),
        ]
    );
}

#[rstest]
fn every_violation_is_collected() {
    let sources = [
        SourceFile::new("backend/src/domain/a.rs", "use crate::outbound::memory; use uuid::Uuid;"),
        SourceFile::new("backend/src/inbound/b.rs", "use rand::random;"),
    ];
    let Err(LintError::Violations(violations)) = check_sources(&sources) else {
        panic!("expected violations");
    };
    let summary: Vec<_> = violations
        .iter()
        .map(|violation| (violation.path.display().to_string(), violation.reference.to_string()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("backend/src/domain/a.rs".to_owned(), "crate `uuid`".to_owned()),
            ("backend/src/domain/a.rs".to_owned(), "backend layer `outbound`".to_owned()),
            ("backend/src/inbound/b.rs".to_owned(), "crate `rand`".to_owned()),
        ]
    );
}

#[rstest]
fn parse_errors_name_the_file() {
    let err = check_one("backend/src/domain/broken.rs", "fn (").expect_err("invalid rust");
    assert!(matches!(err, LintError::Parse { ref path, .. } if path == Path::new("backend/src/domain/broken.rs")));
    assert!(err.to_string().contains("backend/src/domain/broken.rs"));
}

#[rstest]
fn violation_report_lists_every_entry() {
    let err = check_one("backend/src/outbound/memory.rs", "use clap::Parser; use crate::inbound::cli;")
        .expect_err("two violations");
    let rendered = err.to_string();
    assert!(rendered.starts_with("2 dependency rule violation(s):"), "{rendered}");
    assert!(rendered.contains("references crate `clap` (outbound adapters never see the command line)"));
    assert!(rendered.contains("references backend layer `inbound`"));
}
