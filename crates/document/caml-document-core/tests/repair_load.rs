use std::fs;

use caml_document_core::{CamlError, Config, DiagnosticKind, Document, ParseOutcome, RepairKind};

fn init_tracing() {
    let default_filter = "caml_document_core=debug";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[test]
fn unquoted_attribute_is_repaired_and_written_back() {
    init_tracing();
    let bundle = caml_test_fixtures::bundles::stage("unquoted").expect("stage unquoted");
    let original = bundle.read_to_string("main.caml").unwrap();

    let doc = Document::open(bundle.path()).expect("repaired open");
    assert_eq!(doc.root().id.as_deref(), Some("abc"));
    assert_eq!(doc.root().position, ["0", "0"]);
    assert!(doc.root().find_layer("inner").is_some());
    assert!(doc.diagnostics().contains(DiagnosticKind::XmlRepaired));

    let backup = match doc.parse_outcome() {
        ParseOutcome::Repaired { passes, backup } => {
            assert_eq!(passes.len(), 1);
            assert_eq!(passes[0], RepairKind::Targeted { line: 3, column: 13 });
            backup.clone().expect("backup written")
        }
        other => panic!("expected a repaired parse, got {other:?}"),
    };
    assert_eq!(backup, bundle.path().join("main.caml.backup"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), original);

    let rewritten = bundle.read_to_string("main.caml").unwrap();
    assert!(rewritten.contains(r#"<CALayer id="abc" position="0 0">"#));

    let again = Document::open(bundle.path()).expect("second open");
    assert_eq!(again.parse_outcome(), &ParseOutcome::Direct);
    assert_eq!(again.root(), doc.root());
}

#[test]
fn write_back_can_be_disabled() {
    let bundle = caml_test_fixtures::bundles::stage("unquoted").expect("stage unquoted");
    let original = bundle.read_to_string("main.caml").unwrap();
    let config = Config::from_json_str(r#"{ "repair": { "write_back": false } }"#).unwrap();

    let doc = Document::open_with_config(bundle.path(), config).expect("open");
    assert!(matches!(
        doc.parse_outcome(),
        ParseOutcome::Repaired { backup: None, .. }
    ));
    assert_eq!(bundle.read_to_string("main.caml").unwrap(), original);
    assert!(!bundle.path().join("main.caml.backup").exists());
}

#[test]
fn unrepairable_document_reports_both_errors() {
    init_tracing();
    let bundle = caml_test_fixtures::bundles::stage("broken").expect("stage broken");
    let err = Document::open(bundle.path()).unwrap_err();
    assert_eq!(err.category(), "parse");
    match &err {
        CamlError::ParseError {
            file,
            original,
            repair,
        } => {
            assert_eq!(file, &bundle.path().join("main.caml"));
            assert!(!original.is_empty());
            assert!(repair.is_some());
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(err.to_string().contains("Repair attempt failed with"));
    assert!(!bundle.path().join("main.caml.backup").exists());
}

#[test]
fn repair_disabled_fails_on_first_error() {
    let bundle = caml_test_fixtures::bundles::stage("unquoted").expect("stage unquoted");
    let mut config = Config::default();
    config.repair.enabled = false;

    let err = Document::open_with_config(bundle.path(), config).unwrap_err();
    assert!(matches!(err, CamlError::ParseError { repair: None, .. }));
}

#[test]
fn text_that_is_not_markup_is_a_parse_error() {
    let bundle = caml_test_fixtures::bundles::stage("basic").expect("stage basic");
    fs::write(bundle.path().join("main.caml"), "layer id=root").unwrap();

    let err = Document::open(bundle.path()).unwrap_err();
    assert!(matches!(err, CamlError::ParseError { repair: None, .. }));
}

#[test]
fn backup_failure_is_reported_and_load_continues() {
    init_tracing();
    let bundle = caml_test_fixtures::bundles::stage("unquoted").expect("stage unquoted");
    let original = bundle.read_to_string("main.caml").unwrap();
    // a directory where the backup copy should go
    fs::create_dir(bundle.path().join("main.caml.backup")).unwrap();

    let doc = Document::open(bundle.path()).expect("open despite failed backup");
    assert_eq!(doc.root().id.as_deref(), Some("abc"));
    assert!(doc.diagnostics().contains(DiagnosticKind::BackupFailed));
    assert!(matches!(
        doc.parse_outcome(),
        ParseOutcome::Repaired { backup: None, .. }
    ));
    assert_eq!(bundle.read_to_string("main.caml").unwrap(), original);
}

#[test]
fn extra_passes_fix_one_bare_value_each() {
    let bundle = caml_test_fixtures::bundles::stage("basic").expect("stage basic");
    fs::write(
        bundle.path().join("main.caml"),
        "<caml>\n<CALayer id=abc name=def/>\n</caml>",
    )
    .unwrap();

    let err = Document::open(bundle.path()).unwrap_err();
    assert!(matches!(err, CamlError::ParseError { repair: Some(_), .. }));

    let config = Config::from_json_str(r#"{ "repair": { "max_passes": 3 } }"#).unwrap();
    let doc = Document::open_with_config(bundle.path(), config).expect("multi-pass open");
    assert_eq!(doc.root().id.as_deref(), Some("abc"));
    assert_eq!(doc.root().name.as_deref(), Some("def"));
    match doc.parse_outcome() {
        ParseOutcome::Repaired { passes, .. } => {
            assert_eq!(passes.len(), 2);
            assert!(passes
                .iter()
                .all(|p| matches!(p, RepairKind::Targeted { line: 2, .. })));
        }
        other => panic!("expected a repaired parse, got {other:?}"),
    }
    assert!(bundle
        .read_to_string("main.caml")
        .unwrap()
        .contains(r#"<CALayer id="abc" name="def"/>"#));
}
