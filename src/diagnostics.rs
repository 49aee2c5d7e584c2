//! Structured binding and driver diagnostics.
//!
//! Binding failures never abort a creation instance; they degrade the
//! affected variable to inert and surface here as stable, JSON-serializable
//! issues a host UI can display without access to Rust logs. The queue is
//! bounded so a failing driver re-erroring every tick cannot grow without
//! limit.

use serde::Serialize;

/// What went wrong.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The object link names a node that does not exist.
    MissingNode,
    /// The member link does not resolve through the member registry.
    InvalidMemberPath,
    /// The (type, conversion method, native member) combination is not
    /// supported by the conversion factory.
    UnsupportedType,
    /// A driver variable was bound without a script host.
    MissingScriptHost,
    /// The driver script failed to compile.
    DriverCompile,
    /// The driver script failed (or exhausted its budget) at run time.
    DriverRuntime,
}

impl IssueKind {
    fn is_error(self) -> bool {
        matches!(
            self,
            IssueKind::InvalidMemberPath
                | IssueKind::MissingScriptHost
                | IssueKind::DriverCompile
                | IssueKind::DriverRuntime
        )
    }
}

/// When it went wrong.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssuePhase {
    /// During the one-shot binding at instance startup.
    Bind,
    /// During a Get on a live instance.
    Run,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingIssue {
    pub kind: IssueKind,
    pub phase: IssuePhase,
    /// Name of the affected variable.
    pub variable: String,
    pub message: String,
    /// Raw engine error string (useful for bug reports).
    pub raw: Option<String>,
}

impl BindingIssue {
    pub fn bind(kind: IssueKind, variable: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase: IssuePhase::Bind,
            variable: variable.to_string(),
            message: message.into(),
            raw: None,
        }
    }

    pub fn run(kind: IssueKind, variable: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase: IssuePhase::Run,
            variable: variable.to_string(),
            message: message.into(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// Keep a bounded queue so repeated runtime errors don't grow without limit.
const MAX_ISSUES: usize = 32;

/// Bounded issue queue owned by a creation instance.
#[derive(Default)]
pub struct IssueQueue {
    issues: Vec<BindingIssue>,
}

impl IssueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue, logging it at the severity its kind implies.
    pub fn push(&mut self, issue: BindingIssue) {
        if issue.kind.is_error() {
            log::error!("variable '{}': {}", issue.variable, issue.message);
        } else {
            log::warn!("variable '{}': {}", issue.variable, issue.message);
        }
        self.issues.push(issue);
        if self.issues.len() > MAX_ISSUES {
            let excess = self.issues.len() - MAX_ISSUES;
            self.issues.drain(0..excess);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindingIssue> {
        self.issues.iter()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Drain and return all pending issues.
    pub fn take_all(&mut self) -> Vec<BindingIssue> {
        std::mem::take(&mut self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_bounded() {
        let mut queue = IssueQueue::new();
        for i in 0..(MAX_ISSUES + 10) {
            queue.push(BindingIssue::run(
                IssueKind::DriverRuntime,
                "spin",
                format!("failure {i}"),
            ));
        }
        assert_eq!(queue.len(), MAX_ISSUES);
        // Oldest entries were dropped.
        assert_eq!(queue.iter().next().unwrap().message, "failure 10");
    }

    #[test]
    fn test_take_all_drains() {
        let mut queue = IssueQueue::new();
        queue.push(BindingIssue::bind(IssueKind::MissingNode, "aim", "gone"));
        assert_eq!(queue.take_all().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_issue_serializes_snake_case() {
        let issue = BindingIssue::bind(IssueKind::InvalidMemberPath, "aim", "bad path")
            .with_raw("unknown member 'bogus'");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"invalid_member_path\""));
        assert!(json.contains("\"bind\""));
        assert!(json.contains("\"aim\""));
    }
}
