use ccl_core::diagnostics::{Diagnostic, DiagnosticLevel};
use ccl_core::problem::{POTENTIAL_FOOTER, SCRIPT_OBJECT_REFERENCE};
use ccl_core::span::SourceFile;
use ccl_core::ConfigurationCacheAnalyzer;
use ccl_kts::{analyze_source, ApiModel, ScriptAnalysis};
use pretty_assertions::assert_eq;

fn analyze(source: &str) -> ScriptAnalysis {
    analyze_source(
        SourceFile::new(0, "build.gradle.kts", source),
        ApiModel::builtin(),
        &ConfigurationCacheAnalyzer::default(),
    )
    .expect("analyze")
}

fn warnings(analysis: &ScriptAnalysis) -> Vec<&Diagnostic> {
    analysis
        .report
        .diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Warning)
        .collect()
}

fn text<'a>(analysis: &'a ScriptAnalysis, diagnostic: &Diagnostic) -> &'a str {
    let span = diagnostic.span.expect("warning has a span");
    analysis.file().snippet(span).expect("span inside file")
}

fn texts(analysis: &ScriptAnalysis) -> Vec<&str> {
    warnings(analysis)
        .into_iter()
        .map(|d| text(analysis, d))
        .collect()
}

#[test]
fn task_accessors_in_do_last() {
    let analysis = analyze(
        r#"tasks.register("myTask") {
    doLast {
        println(project)
        println(extensions)
        println(taskDependencies)
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["project", "extensions", "taskDependencies"]);
    for (warning, accessor) in warnings.iter().zip(["project", "extensions", "taskDependencies"]) {
        assert!(warning.message.starts_with(&format!(
            "Invocation of 'Task.{accessor}' by task at execution time is unsupported."
        )));
        assert!(warning.message.ends_with(POTENTIAL_FOOTER));
        assert_eq!(warning.code.as_deref(), Some("unsupported-task-accessor"));
    }
}

#[test]
fn script_object_references() {
    let analysis = analyze(
        r#"val myVar = "myVar"
fun myMethod() {}
tasks.register("myTask") {
    doLast {
        print(layout)
        println(myVar)
        println(myMethod())
    }
}"#,
    );

    assert_eq!(texts(&analysis), vec!["layout", "myVar", "myMethod", "myMethod()"]);
    for warning in warnings(&analysis) {
        assert!(warning.message.starts_with(SCRIPT_OBJECT_REFERENCE));
        assert!(!warning.message.contains("At line:"));
        assert_eq!(warning.code.as_deref(), Some("script-object-reference"));
    }
}

#[test]
fn script_values_copied_into_locals_are_fine() {
    let analysis = analyze(
        r#"val myVar = "myVar"
fun myMethod() {}
tasks.register("myTask") {
    val myVar = myVar
    val layout = layout
    val myMethodValue = myMethod()
    doLast {
        print(layout)
        println(myVar)
        println(myMethodValue)
    }
}"#,
    );

    assert!(warnings(&analysis).is_empty());
}

#[test]
fn unserializable_locals_captured_by_the_block() {
    let analysis = analyze(
        r#"tasks.register("myTask") {
    val thread = Thread()
    val config = configurations.create("myConf")
    val fileCollection: FileCollection = configurations.create("myFileCollection")
    doLast {
        print(thread)
        val innerThread = Thread()
        println(innerThread)
        println(config)
        println(fileCollection)
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(warnings.len(), 2);

    let thread = warnings[0].span.unwrap();
    assert_eq!((thread.lo, thread.hi), (212, 218));
    assert_eq!(text(&analysis, warnings[0]), "thread");
    assert!(warnings[0].message.starts_with(
        "Cannot serialize object of type 'java.lang.Thread', as these are not supported with the configuration cache."
    ));

    let config = warnings[1].span.unwrap();
    assert_eq!((config.lo, config.hi), (300, 306));
    assert_eq!(text(&analysis, warnings[1]), "config");
    assert!(warnings[1].message.starts_with(
        "Cannot serialize object of type 'org.gradle.api.artifacts.Configuration', as these are not supported with the configuration cache."
    ));
}

#[test]
fn class_methods_bubble_their_problems() {
    let analysis = analyze(
        r#"tasks.register("myTask") {
    val a = A()
    doLast {
        a.run()
    }
}

class A {
    fun run() {
        println(buildDir)
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["run", "buildDir"]);
    assert!(warnings[0].message.starts_with(SCRIPT_OBJECT_REFERENCE));
    assert!(warnings[0].message.contains(" At line: 10"));
    assert!(warnings[1].message.starts_with(SCRIPT_OBJECT_REFERENCE));
    assert!(warnings[1].message.contains(" At line: 4"));
}

#[test]
fn calls_outside_blocks_and_clean_methods_are_silent() {
    let analysis = analyze(
        r#"tasks.register("myTask") {
    val a = A()
    a.run()
    doLast {
        a.run2()
    }
}

class A {
    fun run() {
        println(buildDir)
    }
    fun run2() {}
}"#,
    );

    assert!(warnings(&analysis).is_empty());
}

#[test]
fn top_level_function_reports_its_body_at_the_call_site_line() {
    let analysis = analyze(
        r#"fun helper() {
    println(layout)
}
tasks.register("t") {
    doLast {
        helper()
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["layout", "helper", "helper()"]);
    assert!(warnings[0].message.ends_with(" At line: 6"));
    // the script reference at the call site is found there
    assert!(!warnings[1].message.contains("At line:"));
}

#[test]
fn functions_never_run_at_execution_time_are_silent() {
    let analysis = analyze(
        r#"fun helper() {
    println(layout)
}
helper()
tasks.register("t") {
    doLast {
        println("done")
    }
}"#,
    );

    assert!(warnings(&analysis).is_empty());
    assert_eq!(analysis.report.stats.execution_blocks, 1);
}

#[test]
fn lambda_valued_properties_are_analyzed() {
    let analysis = analyze(
        r#"val action = {
    println(layout)
}
tasks.register("t") {
    doLast {
        action()
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["layout", "action", "action()"]);
    assert!(warnings[0].message.ends_with(" At line: 6"));
}

#[test]
fn typed_registration_gets_task_accessors() {
    let analysis = analyze(
        r#"tasks.register<Copy>("copy") {
    doLast {
        println(project.name)
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["project"]);
    assert!(warnings[0]
        .message
        .starts_with("Invocation of 'Task.project' by task at execution time is unsupported."));
}

#[test]
fn getter_calls_count_as_accessors() {
    let analysis = analyze(
        r#"tasks.register("t") {
    doFirst {
        println(getProject())
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["getProject", "getProject()"]);
    for warning in warnings {
        assert!(warning
            .message
            .starts_with("Invocation of 'Task.project' by task at execution time is unsupported."));
    }
}

#[test]
fn project_typed_results_are_flagged() {
    let analysis = analyze(
        r#"class Holder {
    fun maybe(): Project? = null
    fun always(): Project = TODO()
}
tasks.register("t") {
    val holder = Holder()
    doLast {
        println(holder.maybe())
        println(holder.always())
    }
}"#,
    );

    let warnings = warnings(&analysis);
    assert_eq!(texts(&analysis), vec!["maybe", "maybe()", "always", "always()"]);
    for warning in &warnings {
        assert_eq!(warning.code.as_deref(), Some("non-serializable-type"));
        assert!(warning.message.starts_with(
            "Accessing non-serializable type 'org.gradle.api.Project' caused by invocation."
        ));
    }
    // only the nullable result might never be produced
    assert!(warnings[0].message.ends_with(POTENTIAL_FOOTER));
    assert!(warnings[1].message.ends_with(POTENTIAL_FOOTER));
    assert!(!warnings[2].message.contains(POTENTIAL_FOOTER));
    assert!(!warnings[3].message.contains(POTENTIAL_FOOTER));
}

#[test]
fn named_actions_are_execution_blocks() {
    let analysis = analyze(
        r#"tasks.register("t") {
    doLast("print layout") {
        println(layout)
    }
}"#,
    );

    assert_eq!(texts(&analysis), vec!["layout"]);
    assert_eq!(analysis.report.stats.execution_blocks, 1);
}

#[test]
fn reporting_is_idempotent() {
    let source = r#"val myVar = "myVar"
fun helper() {
    println(layout)
}
val action = { println(buildDir) }
tasks.register("t") {
    val thread = Thread()
    doLast {
        println(myVar)
        helper()
        action()
        println(thread)
        println(project)
        println(getProject())
    }
}
class A {
    fun run() = project
}"#;

    let first = analyze(source);
    let second = analyze(source);
    assert!(!first.report.diagnostics.is_empty());
    assert_eq!(first.report.diagnostics, second.report.diagnostics);

    // one report per reference
    let mut spans: Vec<_> = first.report.diagnostics.iter().filter_map(|d| d.span).collect();
    let total = spans.len();
    spans.dedup();
    assert_eq!(spans.len(), total);
}

#[test]
fn broken_statements_do_not_hide_later_problems() {
    let analysis = analyze(
        "tasks.register(\"t\") {\n    doLast {\n        ) oops\n        println(layout)\n    }\n}\n",
    );

    assert!(!analysis.parse_diagnostics.is_empty());
    assert_eq!(texts(&analysis), vec!["layout"]);
    assert!(analysis.report.stats.skipped_nodes >= 1);
}

#[test]
fn other_script_kinds_are_not_build_scripts() {
    assert!(ccl_core::is_build_script(std::path::Path::new("app/build.gradle.kts")));
    assert!(!ccl_core::is_build_script(std::path::Path::new("settings.gradle.kts")));
}
