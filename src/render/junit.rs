use crate::completeness::CompletenessCheck;
use crate::names::NamingPolicy;
use crate::tree::{FixtureNode, GroupNode, SuiteTree};

use super::{CodeWriter, Emit};

/// Names used by the generated imports; classes named like them would shadow them.
const IMPORTED_NAMES: &[&str] = &[
    "File",
    "KtTestUtil",
    "Nested",
    "Pattern",
    "Test",
    "TestDataPath",
    "TestMetadata",
];

/// JUnit 5 test classes with `@Nested` classes for subdirectories.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JUnitTemplate {
    pub package: Option<String>,
    /// Defaults to the suite name.
    pub class_name: Option<String>,
    pub base_class: Option<String>,
    /// Named in the "generated by" comment.
    pub generator: String,
    pub runner: String,
    /// Comment lines put above the package declaration.
    pub license: Vec<String>,
}

impl Default for JUnitTemplate {
    fn default() -> Self {
        Self {
            package: None,
            class_name: None,
            base_class: None,
            generator: "suitegen".to_owned(),
            runner: "runTest".to_owned(),
            license: Vec::new(),
        }
    }
}

impl JUnitTemplate {
    pub fn naming(&self) -> NamingPolicy {
        let mut policy = NamingPolicy::junit();
        policy
            .reserved
            .extend(IMPORTED_NAMES.iter().map(|name| name.to_string()));
        policy
    }
}

fn java_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Emit for JUnitTemplate {
    fn writer(&self) -> CodeWriter {
        CodeWriter::new("  ")
    }

    fn header(&self, out: &mut CodeWriter, _: &SuiteTree) {
        if !self.license.is_empty() {
            out.line("/*");
            for line in &self.license {
                out.line(format!(" * {line}").trim_end());
            }
            out.line(" */");
            out.line("");
        }
        if let Some(package) = &self.package {
            out.line(format_args!("package {package};"));
            out.line("");
        }
        for import in [
            "com.intellij.testFramework.TestDataPath",
            "org.jetbrains.kotlin.test.TestMetadata",
            "org.jetbrains.kotlin.test.util.KtTestUtil",
            "org.junit.jupiter.api.Nested",
            "org.junit.jupiter.api.Test",
        ] {
            out.line(format_args!("import {import};"));
        }
        out.line("");
        out.line("import java.io.File;");
        out.line("import java.util.regex.Pattern;");
    }

    fn begin_group(&self, out: &mut CodeWriter, suite: &SuiteTree, group: &GroupNode, root: bool) {
        out.unit();
        let dir = suite.project_path(&group.path().to_string());
        if root {
            out.line(format_args!(
                "/** This class is generated by {{@link {}}}. DO NOT MODIFY MANUALLY */",
                self.generator
            ));
            out.line("@SuppressWarnings(\"all\")");
            out.line(format_args!("@TestMetadata({})", java_string(&dir)));
            out.line("@TestDataPath(\"$PROJECT_ROOT\")");
            let class = self.class_name.as_deref().unwrap_or(group.ident());
            match &self.base_class {
                Some(base) => out.open(format_args!("public class {class} extends {base} {{")),
                None => out.open(format_args!("public class {class} {{")),
            }
        } else {
            out.line("@Nested");
            out.line(format_args!("@TestMetadata({})", java_string(&dir)));
            out.line("@TestDataPath(\"$PROJECT_ROOT\")");
            out.open(format_args!("public class {} {{", group.ident()));
        }
    }

    fn check(&self, out: &mut CodeWriter, check: &CompletenessCheck<'_>) {
        let exclude = match &check.options.exclude {
            Some(exclude) => format!("Pattern.compile({})", java_string(exclude.as_str())),
            None => "null".to_owned(),
        };

        out.unit();
        out.line("@Test");
        out.open(format_args!("public void {}() {{", check.ident()));
        out.line(format_args!(
            "KtTestUtil.assertAllTestsPresentByMetadataWithExcluded(this.getClass(), new File({}), Pattern.compile({}), {}, {});",
            java_string(&check.dir),
            java_string(check.options.filter.as_str()),
            exclude,
            check.options.recursive
        ));
        out.close("}");
    }

    fn fixture(&self, out: &mut CodeWriter, suite: &SuiteTree, fixture: &FixtureNode) {
        out.unit();
        out.line("@Test");
        out.line(format_args!("@TestMetadata({})", java_string(fixture.label())));
        out.open(format_args!("public void {}() {{", fixture.ident()));
        out.line(format_args!(
            "{}({});",
            self.runner,
            java_string(&suite.project_path(&fixture.display_path()))
        ));
        out.close("}");
    }

    fn end_group(&self, out: &mut CodeWriter, _: &GroupNode, _: bool) {
        out.close("}");
    }
}
