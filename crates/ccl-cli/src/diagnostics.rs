//! Diagnostic and error reporting utilities

use crate::Result;
use ccl_core::diagnostics::{Diagnostic, DiagnosticLevel};
use ccl_core::span::SourceFile;
use miette::{LabeledSpan, NamedSource, Severity, SourceCode, SourceSpan};
use std::fmt::{self, Display, Formatter};

/// Set up enhanced error reporting with miette
pub fn setup_error_reporting() -> Result<()> {
    // Install miette as the global error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .map_err(|e| crate::CliError::Config(format!("Failed to setup error reporting: {}", e)))?;

    Ok(())
}

/// One analyzer diagnostic attached to the script it was found in, so
/// miette can draw the source snippet.
#[derive(Debug)]
pub struct ScriptDiagnostic {
    headline: String,
    details: Option<String>,
    code: Option<String>,
    severity: Severity,
    help: Option<String>,
    source: NamedSource<String>,
    span: Option<SourceSpan>,
}

impl ScriptDiagnostic {
    pub fn new(diagnostic: &Diagnostic, file: &SourceFile) -> Self {
        let (headline, details) = match diagnostic.message.split_once("\n\n") {
            Some((headline, details)) => (headline.to_string(), Some(details.to_string())),
            None => (diagnostic.message.clone(), None),
        };
        let help = match (&details, diagnostic.suggestions.is_empty()) {
            (_, false) => Some(diagnostic.suggestions.join("\n")),
            (Some(details), true) => Some(details.clone()),
            (None, true) => None,
        };
        Self {
            headline,
            details,
            code: diagnostic.code.clone(),
            severity: match diagnostic.level {
                DiagnosticLevel::Error => Severity::Error,
                DiagnosticLevel::Warning => Severity::Warning,
                DiagnosticLevel::Info => Severity::Advice,
            },
            help,
            source: NamedSource::new(file.path.display().to_string(), file.source.to_string()),
            span: diagnostic
                .span
                .map(|span| SourceSpan::new((span.lo as usize).into(), span.len() as usize)),
        }
    }

    /// Text after the headline, e.g. why a problem is only potential.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.headline)
    }
}

impl std::error::Error for ScriptDiagnostic {}

impl miette::Diagnostic for ScriptDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.code
            .as_ref()
            .map(|code| Box::new(code) as Box<dyn Display + 'a>)
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            None, span,
        ))))
    }
}

/// Pretty print a diagnostic through the installed miette handler
pub fn render_pretty(diagnostic: &Diagnostic, file: &SourceFile) -> String {
    let report = miette::Report::new(ScriptDiagnostic::new(diagnostic, file));
    format!("{:?}", report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccl_core::span::Span;
    use miette::Diagnostic as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_potential_footer_becomes_help() {
        let file = SourceFile::new(0, "build.gradle.kts", "println(project)\n");
        let diagnostic = Diagnostic::warning("Invocation of 'Task.project'.\n\nThis is just potentially a problem.")
            .with_span(Span::new(0, 8, 15))
            .with_code("unsupported-task-accessor");

        let report = ScriptDiagnostic::new(&diagnostic, &file);
        assert_eq!(report.to_string(), "Invocation of 'Task.project'.");
        assert_eq!(report.details(), Some("This is just potentially a problem."));
        assert_eq!(report.severity(), Some(Severity::Warning));
        assert_eq!(
            report.help().map(|h| h.to_string()).as_deref(),
            Some("This is just potentially a problem.")
        );
        let label = report.labels().unwrap().next().unwrap();
        assert_eq!((label.offset(), label.len()), (8, 7));
    }

    #[test]
    fn test_suggestions_win_over_details() {
        let file = SourceFile::new(0, "build.gradle.kts", "layout");
        let diagnostic = Diagnostic::warning("Cannot serialize.")
            .with_span(Span::new(0, 0, 6))
            .with_suggestion("copy the value into a local variable");

        let report = ScriptDiagnostic::new(&diagnostic, &file);
        assert_eq!(
            report.help().map(|h| h.to_string()).as_deref(),
            Some("copy the value into a local variable")
        );
        assert_eq!(report.code().map(|c| c.to_string()), None);
    }
}
