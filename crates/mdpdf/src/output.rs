//! Colored terminal output utilities.

use console::{Style, Term};
use mdpdf_batch::ConversionResult;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print one conversion outcome with its diagram warnings.
    pub(crate) fn conversion(&self, result: &ConversionResult) {
        let input = result.input.display();
        match (&result.output, &result.error) {
            (Some(pdf), _) if result.success => self.success(&format!(
                "{input} -> {} ({:.1}s)",
                pdf.display(),
                result.duration.as_secs_f64()
            )),
            (_, error) => self.error(&format!(
                "{input}: {}",
                error.as_deref().unwrap_or("conversion failed")
            )),
        }
        for failure in &result.diagram_failures {
            self.warning(&format!("  {failure}"));
        }
    }
}
