//! Configuration-cache check of build scripts

use super::common::load_symbols;
use crate::cli::{CliConfig, OutputFormat};
use crate::diagnostics::render_pretty;
use crate::utils::FileUtils;
use crate::Result;
use ccl_core::diagnostics::{Diagnostic, DiagnosticDisplayOptions, DiagnosticManager};
use ccl_core::span::FileId;
use ccl_core::walker::AnalysisStats;
use ccl_core::ConfigurationCacheAnalyzer;
use ccl_kts::{analyze_path, ApiModel, KtsError, ScriptAnalysis};
use clap::Args;
use console::style;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Arguments for the check command
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Build scripts or directories to check
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,
    /// Include patterns (glob), added to the configured ones
    #[arg(long)]
    pub include: Vec<String>,
    /// Exclude patterns (glob), added to the configured ones
    #[arg(long)]
    pub exclude: Vec<String>,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Unsupported-symbol override table
    #[arg(long)]
    pub symbols: Option<PathBuf>,
    /// Exit successfully even when problems are reported
    #[arg(long)]
    pub no_fail: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub files: usize,
    /// Configuration-cache problems
    pub problems: usize,
    pub syntax_errors: usize,
    /// Scripts that could not be read or lexed
    pub failed_files: usize,
    #[serde(skip)]
    pub fail_on_problems: bool,
}

impl CheckSummary {
    pub fn exit_code(&self) -> i32 {
        let reported = self.problems + self.syntax_errors > 0;
        if self.failed_files > 0 || (reported && self.fail_on_problems) {
            1
        } else {
            0
        }
    }
}

/// Outcome of analyzing one script
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: std::result::Result<ScriptAnalysis, KtsError>,
}

impl FileResult {
    /// Syntax errors and analysis problems in source order.
    fn diagnostics(&self) -> Vec<&Diagnostic> {
        let Ok(analysis) = &self.outcome else {
            return Vec::new();
        };
        let mut all: Vec<&Diagnostic> = analysis
            .parse_diagnostics
            .iter()
            .chain(analysis.report.diagnostics.iter())
            .collect();
        all.sort_by_key(|d| d.span.map(|s| (s.lo, s.hi)));
        all
    }
}

/// Execute the check command
pub fn check_command(args: CheckArgs, config: &CliConfig) -> Result<CheckSummary> {
    let format = args.format.unwrap_or(config.check.format);
    let symbols = load_symbols(args.symbols.as_deref(), config)?;

    let mut include = config.check.include.clone();
    include.extend(args.include);
    let mut exclude = config.check.exclude.clone();
    exclude.extend(args.exclude);

    let files = FileUtils::find_build_scripts(&args.paths, &include, &exclude)?;
    info!(files = files.len(), "checking build scripts");

    let results = analyze_files(&files, &ConfigurationCacheAnalyzer::new(symbols));
    let mut summary = summarize(&results);
    summary.fail_on_problems = config.check.fail_on_problems && !args.no_fail;

    print!("{}", render_report(&results, &summary, format)?);
    if format != OutputFormat::Json {
        println!("{}", summary_line(&summary));
    }
    Ok(summary)
}

/// Analyze every file in parallel; each file gets its own tree and binder,
/// only the analyzer's tables are shared. Results keep the input order.
pub fn analyze_files(files: &[PathBuf], analyzer: &ConfigurationCacheAnalyzer) -> Vec<FileResult> {
    let api = ApiModel::builtin();
    files
        .par_iter()
        .enumerate()
        .map(|(id, path)| {
            let outcome = analyze_path(id as FileId, path, api, analyzer);
            if let Err(e) = &outcome {
                warn!(path = %path.display(), error = %e, "could not analyze build script");
            }
            FileResult {
                path: path.clone(),
                outcome,
            }
        })
        .collect()
}

pub fn summarize(results: &[FileResult]) -> CheckSummary {
    let mut summary = CheckSummary {
        files: results.len(),
        ..CheckSummary::default()
    };
    for result in results {
        match &result.outcome {
            Ok(analysis) => {
                summary.problems += analysis.report.diagnostics.len();
                summary.syntax_errors += analysis.parse_diagnostics.len();
            }
            Err(_) => summary.failed_files += 1,
        }
    }
    summary
}

pub fn render_report(
    results: &[FileResult],
    summary: &CheckSummary,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(render_text(results, |diagnostics, analysis| {
            diagnostics
                .iter()
                .map(|d| render_pretty(d, analysis.file()))
                .collect()
        })),
        OutputFormat::Plain => Ok(render_text(results, |diagnostics, analysis| {
            let owned: Vec<Diagnostic> = diagnostics.iter().map(|&d| d.clone()).collect();
            DiagnosticManager::render(
                &owned,
                Some(analysis.file()),
                None,
                &DiagnosticDisplayOptions::plain(false),
            )
        })),
        OutputFormat::Json => render_json(results, summary),
    }
}

fn render_text<F>(results: &[FileResult], render: F) -> String
where
    F: Fn(&[&Diagnostic], &ScriptAnalysis) -> Vec<String>,
{
    let mut out = String::new();
    for result in results {
        match &result.outcome {
            Ok(analysis) => {
                for line in render(&result.diagnostics(), analysis) {
                    let _ = writeln!(out, "{}", line);
                }
            }
            Err(e) => {
                let _ = writeln!(
                    out,
                    "{} {}: {}",
                    style("error:").red().bold(),
                    result.path.display(),
                    e
                );
            }
        }
    }
    out
}

fn summary_line(summary: &CheckSummary) -> String {
    let checked = format!(
        "{} build script{}",
        summary.files,
        if summary.files == 1 { "" } else { "s" }
    );
    if summary.problems + summary.syntax_errors + summary.failed_files == 0 {
        return format!(
            "{} No configuration cache problems in {}",
            style("✔").green(),
            checked
        );
    }
    let mut parts = vec![format!("{} configuration cache problem(s)", summary.problems)];
    if summary.syntax_errors > 0 {
        parts.push(format!("{} syntax error(s)", summary.syntax_errors));
    }
    if summary.failed_files > 0 {
        parts.push(format!("{} unreadable script(s)", summary.failed_files));
    }
    format!("{} {} in {}", style("✖").red(), parts.join(", "), checked)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    summary: &'a CheckSummary,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diagnostics: Vec<JsonDiagnostic<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<AnalysisStats>,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    line: Option<usize>,
    column: Option<usize>,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
}

fn render_json(results: &[FileResult], summary: &CheckSummary) -> Result<String> {
    let files = results
        .iter()
        .map(|result| match &result.outcome {
            Ok(analysis) => JsonFile {
                path: &result.path,
                error: None,
                diagnostics: result
                    .diagnostics()
                    .into_iter()
                    .map(|diagnostic| {
                        let position = diagnostic.span.map(|s| analysis.file().line_col(s.lo));
                        JsonDiagnostic {
                            line: position.map(|(line, _)| line),
                            column: position.map(|(_, column)| column),
                            diagnostic,
                        }
                    })
                    .collect(),
                stats: Some(analysis.report.stats),
            },
            Err(e) => JsonFile {
                path: &result.path,
                error: Some(e.to_string()),
                diagnostics: Vec::new(),
                stats: None,
            },
        })
        .collect();
    let mut rendered = serde_json::to_string_pretty(&JsonReport { files, summary })?;
    rendered.push('\n');
    Ok(rendered)
}
