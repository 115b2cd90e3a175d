use crate::span::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Context provided to the templates while producing output lines.
struct DiagnosticRenderContext<'a> {
    context: &'a str,
    verbose_info: bool,
    source: Option<&'a SourceFile>,
}

/// Built-in templates supported by the diagnostic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticTemplate {
    Pretty,
    Plain,
}

impl DiagnosticTemplate {
    fn render(
        &self,
        diagnostic: &Diagnostic,
        ctx: &DiagnosticRenderContext<'_>,
    ) -> Option<Vec<String>> {
        match self {
            DiagnosticTemplate::Pretty => render_pretty(diagnostic, ctx),
            DiagnosticTemplate::Plain => render_plain(diagnostic, ctx),
        }
    }
}

/// Runtime configuration for emitting diagnostics.
#[derive(Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn with_template(template: DiagnosticTemplate, verbose_info: bool) -> Self {
        Self {
            template,
            verbose_info,
        }
    }

    pub fn pretty(verbose_info: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Pretty, verbose_info)
    }

    pub fn plain(verbose_info: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Plain, verbose_info)
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        DiagnosticDisplayOptions::pretty(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub source_context: Option<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions.extend(suggestions);
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// First line of the message, without the potential-error footer.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Thread-safe collector shared by everything that analyzes files concurrently.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    pub fn add_diagnostics(&self, mut new_diagnostics: Vec<Diagnostic>) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.append(&mut new_diagnostics);
        }
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(|diag| diag.level == DiagnosticLevel::Error))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.clear();
        }
    }

    /// Render diagnostics using the provided template. The fallback context is used
    /// when a diagnostic does not specify a source context.
    pub fn render(
        diagnostics: &[Diagnostic],
        source: Option<&SourceFile>,
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Vec<String> {
        let mut out = Vec::new();
        for diagnostic in diagnostics {
            let context = diagnostic
                .source_context
                .as_deref()
                .or(fallback_context)
                .unwrap_or("ccl");

            let render_ctx = DiagnosticRenderContext {
                context,
                verbose_info: options.verbose_info,
                source,
            };

            if let Some(lines) = options.template.render(diagnostic, &render_ctx) {
                out.extend(lines);
            }
        }
        out
    }
}

fn location(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<String> {
    let span = diagnostic.span?;
    match ctx.source {
        Some(file) => {
            let (line, col) = file.line_col(span.lo);
            Some(format!("{}:{}:{}", file.path.display(), line, col))
        }
        None => Some(span.to_string()),
    }
}

fn render_pretty(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.level, DiagnosticLevel::Info) && !ctx.verbose_info {
        return None;
    }

    let prefix = match diagnostic.level {
        DiagnosticLevel::Error => "❌",
        DiagnosticLevel::Warning => "⚠️ ",
        DiagnosticLevel::Info => "ℹ️ ",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!(
            "{} [{}] {} ({})",
            prefix,
            ctx.context,
            diagnostic.headline(),
            code
        ),
        None => format!("{} [{}] {}", prefix, ctx.context, diagnostic.headline()),
    };

    let mut lines = vec![header];

    if let Some(location) = location(diagnostic, ctx) {
        lines.push(format!("   at {}", location));
    }
    if let (Some(span), Some(file)) = (diagnostic.span, ctx.source) {
        if let Some(on_line) = file.span_on_line(span) {
            let width = on_line.col_end.saturating_sub(on_line.col_start).max(1);
            lines.push(format!("   | {}", on_line.text));
            lines.push(format!(
                "   | {}{}",
                " ".repeat(on_line.col_start - 1),
                "^".repeat(width)
            ));
        }
    }
    for extra in diagnostic.message.lines().skip(1).filter(|l| !l.is_empty()) {
        lines.push(format!("   {}", extra));
    }

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   💡 {}", suggestion));
    }

    Some(lines)
}

fn render_plain(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.level, DiagnosticLevel::Info) && !ctx.verbose_info {
        return None;
    }

    let level = match diagnostic.level {
        DiagnosticLevel::Error => "ERROR",
        DiagnosticLevel::Warning => "WARNING",
        DiagnosticLevel::Info => "INFO",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!(
            "[{}] {}: {} ({})",
            ctx.context,
            level,
            diagnostic.headline(),
            code
        ),
        None => format!("[{}] {}: {}", ctx.context, level, diagnostic.headline()),
    };

    let mut lines = vec![header];

    if let Some(location) = location(diagnostic, ctx) {
        lines.push(format!("   at {}", location));
    }

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   suggestion: {}", suggestion));
    }

    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_template_reports_location_and_code() {
        let file = SourceFile::new(7, "build.gradle.kts", "doLast {\n    println(project)\n}\n");
        let diagnostic = Diagnostic::warning("Invocation of 'Task.project' by task at execution time is unsupported.\n\nfooter")
            .with_span(Span::new(7, 21, 28))
            .with_code("unsupported-task-accessor");
        let lines = DiagnosticManager::render(
            &[diagnostic],
            Some(&file),
            Some("configuration-cache"),
            &DiagnosticDisplayOptions::plain(false),
        );
        assert_eq!(
            lines,
            vec![
                "[configuration-cache] WARNING: Invocation of 'Task.project' by task at execution time is unsupported. (unsupported-task-accessor)".to_string(),
                "   at build.gradle.kts:2:13".to_string(),
            ]
        );
    }

    #[test]
    fn pretty_template_underlines_the_reference() {
        let file = SourceFile::new(7, "build.gradle.kts", "doLast {\n    println(project)\n}\n");
        let diagnostic = Diagnostic::warning("Invocation of 'Task.project' by task at execution time is unsupported.\n\nfooter")
            .with_span(Span::new(7, 21, 28))
            .with_code("unsupported-task-accessor");
        let lines = DiagnosticManager::render(
            &[diagnostic],
            Some(&file),
            None,
            &DiagnosticDisplayOptions::default(),
        );
        assert!(lines[0].ends_with("[ccl] Invocation of 'Task.project' by task at execution time is unsupported. (unsupported-task-accessor)"));
        assert_eq!(lines[1], "   at build.gradle.kts:2:13");
        assert_eq!(lines[2], "   |     println(project)");
        assert_eq!(lines[3], format!("   | {}{}", " ".repeat(12), "^".repeat(7)));
        assert_eq!(lines[4], "   footer");
    }

    #[test]
    fn info_is_hidden_unless_verbose() {
        let diagnostic = Diagnostic::info("skipped");
        let quiet = DiagnosticManager::render(
            &[diagnostic.clone()],
            None,
            None,
            &DiagnosticDisplayOptions::plain(false),
        );
        assert!(quiet.is_empty());
        let verbose = DiagnosticManager::render(
            &[diagnostic],
            None,
            None,
            &DiagnosticDisplayOptions::plain(true),
        );
        assert_eq!(verbose, vec!["[ccl] INFO: skipped".to_string()]);
    }

    #[test]
    fn manager_collects_across_clones() {
        let manager = DiagnosticManager::new();
        let shared = manager.clone();
        shared.add_diagnostic(Diagnostic::warning("a"));
        manager.add_diagnostics(vec![Diagnostic::error("b")]);
        assert_eq!(manager.len(), 2);
        assert!(manager.has_errors());
        manager.clear();
        assert!(shared.is_empty());
    }
}
