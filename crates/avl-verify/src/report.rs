use crate::errors::{Issue, IssueSeverity};

/// Verification result as shown by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn error_count(&self) -> usize {
        self.count(IssueSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(IssueSeverity::Warning)
    }

    /// True when no errors were found; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn render_text(&self) -> String {
        if self.issues.is_empty() {
            return "Ok, no issues found.".to_string();
        }
        let mut lines = Vec::with_capacity(self.issues.len() + 1);
        lines.push(format!(
            "{} error(s) and {} warning(s) found:",
            self.error_count(),
            self.warning_count()
        ));
        lines.extend(self.issues.iter().map(Issue::to_string));
        lines.join("\n")
    }

    fn count(&self, severity: IssueSeverity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}
