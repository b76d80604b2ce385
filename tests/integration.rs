// ==============================================================================
// Integration Tests: Full Pipeline Over Fixture Trees
// ==============================================================================
//
// Each test builds a small .proto tree in a temp directory, runs the export
// pipeline through the library API, and asserts on the emitted text.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use prototrim::casing::CaseMode;
use prototrim::{Exporter, Language};
use tempfile::TempDir;

mod common;
use common::{keep_files, keep_types, read_output, settings, write_file};

const A_PROTO: &str = r#"syntax = "proto3";
package p;

import "b.proto";

message A {
  B b = 1;
}
"#;

const B_PROTO: &str = r#"syntax = "proto3";
package p;

// Only B is reachable from A.
message B {
  int32 x = 1;
}

message C {
}
"#;

/// Scenario A: the closure walk selects `A` and `B`, drops `C`, and the
/// output of `a.proto` imports the re-cased output name of `b.proto`.
#[test]
fn reachability_closure_selects_and_imports() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    let b = read_output(&export, "B.proto");

    assert!(a.contains("message A {"), "A retained:\n{a}");
    assert!(a.contains("import \"B.proto\";"), "recomputed import:\n{a}");
    assert!(a.contains("option csharp_namespace = \"Game.Gen\";"));
    assert!(b.contains("message B {"), "B pulled in by reachability:\n{b}");
    assert!(!b.contains("message C"), "C unreachable, dropped:\n{b}");
    // Self-package qualifiers would be wrong in the pruned output.
    assert!(!a.contains("p.B"));
}

/// Scenario B: a per-type keep directive narrows `A` to field `b`.
#[test]
fn type_keep_directive_filters_fields() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        r#"syntax = "proto3";
package p;
import "b.proto";
message A {
  B b = 1;
  int32 n = 2;
}
"#,
    );
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.keep = keep_types(&[("A", &["b"])]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    assert!(a.contains("B b = 1;"), "kept field survives:\n{a}");
    assert!(!a.contains("int32 n"), "unkept field dropped:\n{a}");
}

/// Scenario C: an unresolvable import is silently absent from the closure.
#[test]
fn missing_import_is_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\npackage p;\nimport \"missing.proto\";\nmessage A {\n  int32 x = 1;\n}\n",
    );
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    let report = Exporter::with_settings(settings).run().unwrap();

    assert_eq!(report.written.len(), 1);
    assert!(export.join("A.proto").exists());
    assert!(!export.join("Missing.proto").exists());
}

/// A per-seed keep directive can leave a closure file with no retained defs;
/// it still emits exactly one stub artifact.
#[test]
fn empty_selection_emits_stub() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\npackage p;\nimport \"b.proto\";\nmessage A {\n  int32 x = 1;\n}\nmessage Extra {\n  B b = 1;\n}\n",
    );
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    // Only A is seeded; A references nothing, so b.proto retains nothing.
    settings.keep = keep_files(&[("a.proto", &["A"])]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    assert!(a.contains("message A {"));
    assert!(!a.contains("message Extra"));

    let b = read_output(&export, "B.proto");
    assert!(b.contains("syntax = \"proto3\";"), "stub keeps syntax:\n{b}");
    assert!(b.contains("package p;"), "stub keeps package:\n{b}");
    assert!(b.contains("option csharp_namespace"), "stub keeps option:\n{b}");
    assert!(!b.contains("message"), "stub has no defs:\n{b}");
}

/// Two identical runs into the same output directory produce byte-identical
/// artifacts.
#[test]
fn reruns_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    Exporter::with_settings(settings.clone()).run().unwrap();
    let first_a = read_output(&export, "A.proto");
    let first_b = read_output(&export, "B.proto");

    Exporter::with_settings(settings).run().unwrap();
    assert_eq!(first_a, read_output(&export, "A.proto"));
    assert_eq!(first_b, read_output(&export, "B.proto"));
}

/// Every type token in every retained definition resolves inside the emitted
/// file set: the closure reaches a fixed point.
#[test]
fn closure_reaches_a_fixed_point() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\npackage p;\nimport \"b.proto\";\nmessage A {\n  B b = 1;\n}\n",
    );
    write_file(
        tmp.path(),
        "proto/b.proto",
        "syntax = \"proto3\";\npackage p;\nimport \"c.proto\";\nmessage B {\n  C c = 1;\n}\nmessage Dead {\n}\n",
    );
    write_file(
        tmp.path(),
        "proto/c.proto",
        "syntax = \"proto3\";\npackage p;\nmessage C {\n  int32 x = 1;\n}\n",
    );
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    Exporter::with_settings(settings).run().unwrap();

    // Collect every emitted def name, then re-scan every emitted def body:
    // each non-scalar token must name an emitted def.
    let mut emitted = std::collections::HashSet::new();
    let mut bodies = Vec::new();
    for name in ["A.proto", "B.proto", "C.proto"] {
        let text = read_output(&export, name);
        for block in prototrim::scanner::scan_top_level_blocks(&text).unwrap() {
            emitted.insert(block.name.clone());
            bodies.push(block.text(&text).to_string());
        }
    }
    assert!(emitted.contains("A") && emitted.contains("B") && emitted.contains("C"));
    assert!(!emitted.contains("Dead"));
    for body in &bodies {
        for token in prototrim::scanner::collect_type_tokens(body) {
            if prototrim::resolve::is_scalar(&token) {
                continue;
            }
            assert!(
                emitted.contains(token.as_str()),
                "token {token} resolves outside the emitted set"
            );
        }
    }
}

/// `prune: false` keeps everything and ignores keep directives, but casing
/// and namespace transforms still apply.
#[test]
fn prune_disabled_keeps_all_defs() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.prune = false;
    settings.keep = keep_types(&[("A", &["nonexistent"])]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    let b = read_output(&export, "B.proto");
    assert!(a.contains("B b = 1;"), "keep directives ignored:\n{a}");
    assert!(b.contains("message C"), "C survives without pruning:\n{b}");
    assert!(a.contains("option csharp_namespace = \"Game.Gen\";"));
}

/// A keep directive reaching into a oneof filters its members individually;
/// the type of a dropped member stays out of the closure.
#[test]
fn oneof_members_prune_through_the_pipeline() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        r#"syntax = "proto3";
package p;
import "b.proto";
message A {
  oneof payload {
    B wanted = 1;
    Dropped unwanted = 2;
  }
}
"#,
    );
    write_file(
        tmp.path(),
        "proto/b.proto",
        "syntax = \"proto3\";\npackage p;\nmessage B {\n  int32 x = 1;\n}\nmessage Dropped {\n  int32 y = 1;\n}\n",
    );
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.keep = keep_types(&[("A", &["wanted"])]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    assert!(a.contains("oneof payload"), "{a}");
    assert!(a.contains("B wanted = 1;"), "{a}");
    assert!(!a.contains("unwanted"), "{a}");

    let b = read_output(&export, "B.proto");
    assert!(b.contains("message B {"), "{b}");
    assert!(!b.contains("message Dropped"), "dropped member's type stays out:\n{b}");
}

/// Well-known types become canonical imports and are never pulled into the
/// closure as definitions.
#[test]
fn well_known_types_become_imports() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\npackage p;\nmessage A {\n  google.protobuf.Timestamp at = 1;\n}\n",
    );
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    let report = Exporter::with_settings(settings).run().unwrap();

    assert_eq!(report.written.len(), 1, "no extra closure file");
    let a = read_output(&export, "A.proto");
    assert!(a.contains("import \"google/protobuf/timestamp.proto\";"));
}

/// Field names are re-cased per configuration, file stems independently.
#[test]
fn casing_applies_to_files_and_fields() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/hero_info.proto",
        "syntax = \"proto3\";\npackage p;\nmessage HeroInfo {\n  int32 heroId = 1;\n  repeated string itemNames = 2;\n}\n",
    );
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["hero_info.proto"]);
    settings.field_name_case = CaseMode::Snake;
    Exporter::with_settings(settings).run().unwrap();

    let out = read_output(&export, "HeroInfo.proto");
    assert!(out.contains("int32 hero_id = 1;"), "{out}");
    assert!(out.contains("repeated string item_names = 2;"), "{out}");
}

/// The Lua target has no namespace option syntax.
#[test]
fn lua_emits_no_namespace_option() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.language = Language::Lua;
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    assert!(!a.contains("option "), "{a}");
}

/// Dry mode computes everything but touches nothing.
#[test]
fn dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.dry_run = true;
    let report = Exporter::with_settings(settings).run().unwrap();

    assert!(report.dry_run);
    assert_eq!(report.written.len(), 2, "planned artifacts are reported");
    assert!(!export.exists(), "dry run must not create the export dir");
}

/// Stale .proto artifacts in the export directory are removed after a run.
#[test]
fn stale_outputs_are_cleaned() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");
    fs::create_dir_all(&export).unwrap();
    fs::write(export.join("stale_name.proto"), "leftover").unwrap();
    fs::write(export.join("notes.txt"), "untouched").unwrap();

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    Exporter::with_settings(settings).run().unwrap();

    assert!(!export.join("stale_name.proto").exists(), "stale removed");
    assert!(export.join("notes.txt").exists(), "non-proto files kept");
}

#[cfg(unix)]
fn write_script(root: &Path, name: &str, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join(name);
    fs::write(&path, content).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// The configured generator executable runs once per output artifact, with
/// the artifact name as its target argument.
#[cfg(unix)]
#[test]
fn generator_runs_once_per_output() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");
    let call_log = tmp.path().join("calls.txt");
    let script = write_script(
        tmp.path(),
        "protogen.sh",
        &format!("#!/bin/sh\necho \"$2\" >> \"{}\"\n", call_log.display()),
    );

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.protogen = Some(script);
    Exporter::with_settings(settings).run().unwrap();

    let calls = fs::read_to_string(&call_log).expect("generator ran");
    let mut targets: Vec<&str> = calls.lines().collect();
    targets.sort_unstable();
    assert_eq!(targets, vec!["A.proto", "B.proto"]);
}

/// A generator exiting nonzero aborts the run; the error names the target
/// file it failed on.
#[cfg(unix)]
#[test]
fn failing_generator_is_fatal_and_names_the_target() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");
    let script = write_script(tmp.path(), "protogen.sh", "#!/bin/sh\nexit 1\n");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.protogen = Some(script);
    let err = Exporter::with_settings(settings).run().unwrap_err();

    let msg = format!("{err}");
    assert!(msg.contains("generator"), "{msg}");
    // Targets run in sorted order, so the first artifact is the one named.
    assert!(msg.contains("A.proto"), "{msg}");
}

/// Dry mode logs generator invocations without spawning anything: a
/// generator path that cannot exist still succeeds.
#[test]
fn dry_run_never_spawns_the_generator() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "proto/a.proto", A_PROTO);
    write_file(tmp.path(), "proto/b.proto", B_PROTO);
    let export = tmp.path().join("out");

    let mut settings = settings(tmp.path(), &export, &["a.proto"]);
    settings.protogen = Some(PathBuf::from("/no/such/generator"));
    settings.dry_run = true;
    let report = Exporter::with_settings(settings).run().unwrap();
    assert!(report.dry_run);
}

/// A seed list that resolves nowhere on disk is fatal.
#[test]
fn wholly_unresolvable_seeds_fail() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["ghost.proto"]);
    let err = Exporter::with_settings(settings).run().unwrap_err();
    assert!(err.to_string().contains("seed"), "{err}");
}

/// A definition block that never closes is a fatal parse error naming the
/// offending file.
#[test]
fn unclosed_block_is_fatal() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\nmessage A {\n  int32 x = 1;\n",
    );
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    let err = Exporter::with_settings(settings).run().unwrap_err();
    assert!(format!("{err}").contains("never closed"), "{err}");
}

/// Comments and reserved statements never survive into the output.
#[test]
fn output_is_sanitized() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "proto/a.proto",
        "syntax = \"proto3\";\npackage p;\n// header comment\nmessage A {\n  reserved 5, 6;\n  int32 x = 1; // field note\n}\n",
    );
    let export = tmp.path().join("out");

    let settings = settings(tmp.path(), &export, &["a.proto"]);
    Exporter::with_settings(settings).run().unwrap();

    let a = read_output(&export, "A.proto");
    assert!(!a.contains("comment"));
    assert!(!a.contains("field note"));
    assert!(!a.contains("reserved"));
    assert!(a.contains("int32 x = 1;"));
}
