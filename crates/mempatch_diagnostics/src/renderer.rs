//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[M006]: bit mismatch at word 3 bit 7
///   --> 128b1
///    = note: init=1 fasm=1 bitstream=0
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
            Severity::Note => "\x1b[1;36m",
        };
        format!("{ansi}{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag.severity),
            diag.code,
            diag.message
        );
        if let Some(location) = &diag.location {
            out.push_str(&format!("  --> {location}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as a single line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        match serde_json::to_string(diag) {
            Ok(json) => format!("{json}\n"),
            Err(e) => format!("{{\"error\":\"failed to serialize diagnostic: {e}\"}}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn render_error_with_location() {
        let code = DiagnosticCode::new(Category::Mapping, 6);
        let diag = Diagnostic::error(code, "bit mismatch at word 3 bit 7")
            .at("128b1")
            .with_note("init=1 fasm=1 bitstream=0");

        let output = TerminalRenderer::new(false).render(&diag);

        assert!(output.starts_with("error[M006]: bit mismatch at word 3 bit 7\n"));
        assert!(output.contains("  --> 128b1\n"));
        assert!(output.contains("   = note: init=1 fasm=1 bitstream=0\n"));
    }

    #[test]
    fn render_without_location() {
        let code = DiagnosticCode::new(Category::Config, 1);
        let diag = Diagnostic::error(code, "missing field").with_help("add [database]");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(!output.contains("-->"));
        assert!(output.contains("= help: add [database]"));
    }

    #[test]
    fn color_wraps_severity() {
        let code = DiagnosticCode::new(Category::Warning, 1);
        let diag = Diagnostic::warning(code, "skipped");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;33mwarning\x1b[0m[W001]"));
    }

    #[test]
    fn json_is_one_line() {
        let code = DiagnosticCode::new(Category::Input, 101);
        let diag = Diagnostic::error(code, "bad line").at("design.mdd");
        let output = JsonRenderer.render(&diag);
        assert_eq!(output.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["message"], "bad line");
        assert_eq!(value["severity"], "Error");
        assert_eq!(value["location"], "design.mdd");
    }
}
