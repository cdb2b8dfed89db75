//! Diagnostics: error/warning collection and formatting.
//!
//! Grounded on `original_source/c5c/analyzer.py`'s `add_error`/`add_warning`
//! and its final dedup-sort-print sequence. The format string is spec.md
//! §6's: `path:line:col: kind: message\n>   source line\n    caret\n  Tip:
//! hint`. The original colorizes with raw ANSI escapes; the teacher's own
//! CLI (`seqc`) prints diagnostics with no styling at all
//! (`eprintln!("Error: {}", e)`), so this keeps plain text to match.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One error/warning code from spec.md §7's category tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Code {
    UndefinedSymbol,
    TypeMismatch,
    IntegerOverflow,
    DivisionByZero,
    FunctionNotDeclared,
    Redeclaration,
    StructMemberError,
    EnumNamespaceAccess,
    IllegalStringOp,
    ConstViolation,
    ArityMismatch,
    MissingEntry,
    ControlFlowMisuse,
    UnusedSymbol,
    NeutralArithmetic,
    NarrowingConversion,
    WastedExpression,
    UnreachableCode,
    EmptyControlledBody,
}

impl Code {
    pub fn severity(&self) -> Severity {
        use Code::*;
        match self {
            UndefinedSymbol | TypeMismatch | IntegerOverflow | DivisionByZero | FunctionNotDeclared
            | Redeclaration | StructMemberError | EnumNamespaceAccess | IllegalStringOp
            | ConstViolation | ArityMismatch | MissingEntry | ControlFlowMisuse => Severity::Error,
            UnusedSymbol | NeutralArithmetic | NarrowingConversion | WastedExpression
            | UnreachableCode | EmptyControlledBody => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub tip: Option<String>,
}

impl Diagnostic {
    pub fn error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, line, column, message: message.into(), tip: None }
    }

    pub fn warning(line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, line, column, message: message.into(), tip: None }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }

    /// Render per spec.md §6's diagnostic format, given the file path and
    /// source text (for the source-line + caret display).
    pub fn render(&self, path: &str, source: &str) -> String {
        let mut out = format!("{}:{}:{}: {}: {}", path, self.line, self.column, self.severity, self.message);
        if let Some(line_text) = source.lines().nth(self.line.saturating_sub(1)) {
            out.push_str(&format!("\n>   {}", line_text));
            out.push_str(&format!("\n    {}^", " ".repeat(self.column)));
        }
        if let Some(tip) = &self.tip {
            out.push_str(&format!("\n  Tip: {}", tip));
        }
        out
    }
}

/// Collects diagnostics during analysis; the analyzer does not fail fast
/// (spec.md §7's policy: "collected during analysis ... completes as much
/// work as it can"). Deduplicates and sorts before rendering, mirroring
/// `analyzer.py`'s final `sorted(set(...))` pass.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.diagnostics.push(d);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Deduplicated, sorted (severity, then position) diagnostics, matching
    /// `analyzer.py`'s "errors are deduplicated, sorted, and printed".
    pub fn finalize(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by(|a, b| a.partial_cmp(b).unwrap());
        self.diagnostics.dedup();
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_matches_spec_format() {
        let d = Diagnostic::error(3, 4, "value 200 out of range for int<8>").with_tip("use a wider type");
        let rendered = d.render("a.c5", "int main() {\n  int x = 1;\n  int<8> y = 200;\n}");
        assert!(rendered.starts_with("a.c5:3:4: error: value 200 out of range for int<8>"));
        assert!(rendered.contains(">   int<8> y = 200;"));
        assert!(rendered.contains("Tip: use a wider type"));
    }

    #[test]
    fn sink_dedupes_and_sorts() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::error(5, 0, "dup"));
        sink.push(Diagnostic::error(5, 0, "dup"));
        sink.push(Diagnostic::warning(1, 0, "w"));
        let out = sink.finalize();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, 1);
    }

    #[test]
    fn has_errors_is_true_iff_an_error_was_pushed() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning(1, 0, "just a warning"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error(2, 0, "now an error"));
        assert!(sink.has_errors());
    }
}
