use std::fs;

use super::*;
use crate::config::Config;
use crate::generator::build_suite;

fn project(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    dir
}

const SCRIPT: &[&str] = &[
    "testData/script/adder.kts",
    "testData/script/arrayAccess/get.kts",
    "testData/script/arrayAccess/notes.txt",
];

fn render(files: &[&str], suite: &str) -> String {
    let dir = project(files);
    let json = format!(r#"{{"suites": [{suite}]}}"#);
    let suites = Config::parse("suites.json", json).unwrap().suites().unwrap();
    let tree = build_suite(dir.path(), &suites[0]).unwrap();
    suites[0].template.render(&tree).unwrap()
}

fn snapshot(name: &str, output: &str) {
    let mut settings = insta::Settings::clone_current();
    settings.set_prepend_module_to_snapshot(false);
    settings.set_omit_expression(true);
    settings.set_snapshot_path("snapshots");
    let _guard = settings.bind_to_scope();
    insta::assert_snapshot!(name, output);
}

#[test]
fn test_rust_functions() {
    let output = render(
        SCRIPT,
        r#"{
            "name": "ScriptCodegen",
            "root": "testData/script",
            "pattern": "^(.+)\\.kts$",
            "output": "tests/script.rs",
            "template": {"kind": "rust", "preamble": ["mod common;", "use common::*;"]}
        }"#,
    );
    snapshot("rust_functions", &output);
}

#[test]
fn test_junit() {
    let output = render(
        SCRIPT,
        r#"{
            "name": "ScriptCodegen",
            "root": "testData/script",
            "pattern": "^(.+)\\.kts$",
            "output": "ScriptCodegenTestGenerated.java",
            "template": {"kind": "junit", "package": "org.example", "base_class": "AbstractScriptTest"}
        }"#,
    );
    snapshot("junit", &output);
}

#[test]
fn test_rust_cases() {
    let output = render(
        &["data/fixtures.kt", "data/b.kt", "data/a-b.kt", "data/a_b.kt"],
        r#"{
            "name": "Cases",
            "root": "data",
            "pattern": "\\.kt$",
            "output": "cases.rs",
            "template": {"kind": "rust", "style": "cases", "runner": "check_file"}
        }"#,
    );

    let expected = [
        "#[::rstest::rstest]",
        r#"#[case::a_b("data/a-b.kt")]"#,
        r#"#[case::a_b_2("data/a_b.kt")]"#,
        r#"#[case::b("data/b.kt")]"#,
        r#"#[case::fixtures_("data/fixtures.kt")]"#,
        "fn fixtures(#[case] path: &str) {",
        "    check_file(path);",
        "}",
        "",
    ]
    .join("\n");
    assert!(output.ends_with(&expected), "{output}");
    assert_eq!(output.matches("#[test]").count(), 1, "{output}");
}

#[test]
fn test_rust_names_stay_legal_and_unshadowed() {
    let output = render(
        &[
            "data/c.kt",
            "data/-/b.kt",
            "data/common/d.kt",
            "data/rstest/e.kt",
            "data/suitegen/a.kt",
        ],
        r#"{
            "name": "Names",
            "root": "data",
            "pattern": "\\.kt$",
            "output": "names.rs",
            "template": {"kind": "rust", "style": "cases", "preamble": ["mod common;"]}
        }"#,
    );

    for module in ["mod __ {", "mod common_ {", "mod rstest_ {", "mod suitegen_ {"] {
        assert_eq!(output.matches(module).count(), 1, "{module}\n{output}");
    }
    assert!(!output.contains("mod _ {"), "{output}");
    assert!(!output.contains("mod common {"), "{output}");
    assert_eq!(output.matches("#[::rstest::rstest]").count(), 5, "{output}");
    assert_eq!(
        output
            .matches("::suitegen::runtime::assert_all_files_present(&::suitegen::runtime::PresenceCheck {")
            .count(),
        5,
        "{output}"
    );
    assert!(!output.contains(" suitegen::runtime"), "{output}");
}

#[test]
fn test_junit_class_names_stay_legal() {
    let output = render(
        &["data/-/b.kt", "data/_/c.kt"],
        r#"{
            "name": "Names",
            "root": "data",
            "pattern": "\\.kt$",
            "output": "NamesTestGenerated.java",
            "template": {"kind": "junit", "package": "org.example", "base_class": "AbstractTest"}
        }"#,
    );

    assert!(output.contains("public class __ {"), "{output}");
    assert!(output.contains("public class ___2 {"), "{output}");
    assert!(!output.contains("public class _ {"), "{output}");
}

#[test]
fn test_junit_directory_fixtures() {
    let output = render(
        &[
            "native/CExport/smoke0/main.c",
            "native/CExport/_helpers/util.c",
            "native/CExport/kt42397/main.c",
        ],
        r#"{
            "name": "CExport",
            "root": "native/CExport",
            "pattern": "^([^_](.+))$",
            "recursive": false,
            "directory_fixtures": true,
            "output": "CExport.java",
            "template": {"kind": "junit"}
        }"#,
    );

    assert!(output.contains(
        r#"KtTestUtil.assertAllTestsPresentByMetadataWithExcluded(this.getClass(), new File("native/CExport"), Pattern.compile("^([^_](.+))$"), null, false);"#
    ));
    assert!(output.contains("  @TestMetadata(\"kt42397\")\n  public void testKt42397() {\n    runTest(\"native/CExport/kt42397/\");\n  }"));
    assert!(output.contains("public void testSmoke0()"));
    assert!(!output.contains("helpers"));
    assert!(!output.contains("@Nested"));
}

#[test]
fn test_manifest() {
    let output = render(
        SCRIPT,
        r#"{
            "name": "ScriptCodegen",
            "root": "testData/script",
            "pattern": "^(.+)\\.kts$",
            "exclude": "^skip",
            "output": "script.json",
            "template": {"kind": "manifest", "naming": "junit"}
        }"#,
    );

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["suite"], "ScriptCodegen");
    assert_eq!(json["group"]["id"], "ScriptCodegen");
    assert_eq!(json["group"]["check"]["id"], "testAllFilesPresentInScript");
    assert_eq!(json["group"]["check"]["exclude"], "^skip");
    assert_eq!(
        json["group"]["check"]["expected"],
        serde_json::json!(["adder.kts", "arrayAccess/get.kts"])
    );
    assert_eq!(
        json["group"]["fixtures"][0],
        serde_json::json!({
            "id": "testAdder",
            "label": "adder.kts",
            "path": "testData/script/adder.kts",
            "kind": "file",
        })
    );

    let nested = &json["group"]["groups"][0];
    assert_eq!(nested["dir"], "testData/script/arrayAccess");
    assert_eq!(nested["check"]["expected"], serde_json::json!(["get.kts"]));
    assert!(output.ends_with("}\n"));
}

#[test]
fn test_render_is_deterministic() {
    let suite = r#"{"name": "S", "root": "testData", "pattern": "\\.kts$", "output": "s.rs"}"#;
    assert_eq!(render(SCRIPT, suite), render(SCRIPT, suite));
}

#[test]
fn test_empty_suite() {
    let dir = project(&["empty/readme.txt"]);
    let json = r#"{"suites": [{"name": "Empty", "root": "empty", "pattern": "\\.kt$", "output": "e.rs"}]}"#;
    let suites = Config::parse("suites.json", json.to_owned()).unwrap().suites().unwrap();
    let tree = build_suite(dir.path(), &suites[0]).unwrap();
    let output = suites[0].template.render(&tree).unwrap();

    assert!(output.contains("fn all_files_present()"));
    assert!(output.contains("expected: &[],"));
    assert!(!output.contains("run_test"));
}

#[test]
fn test_code_writer() {
    let mut out = CodeWriter::new("  ");
    out.open("a {");
    out.unit();
    out.line("b");
    out.unit();
    out.line("c");
    out.line("");
    out.close("}");
    assert_eq!(out.finish(), "a {\n  b\n\n  c\n\n}\n");
}
