//! Error adapter for converting StepcraftError and layout issues to miette
//! diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Parse errors carry
//! the page source and point at the offending span; recovered layout issues
//! are rendered as warnings with a hint on how to fix the page.

use std::{fmt, ops::Range};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, Severity, SourceSpan};

use stepcraft::{LayoutIssue, StepcraftError};

/// Adapter for a page description that failed to parse.
pub struct ParseAdapter<'a> {
    message: &'a str,
    span: Option<&'a Range<usize>>,
    src: &'a str,
}

impl<'a> ParseAdapter<'a> {
    /// Create a new parse adapter.
    pub fn new(message: &'a str, span: Option<&'a Range<usize>>, src: &'a str) -> Self {
        Self { message, span, src }
    }
}

impl fmt::Debug for ParseAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseAdapter")
            .field("message", &self.message)
            .field("span", &self.span)
            .finish()
    }
}

impl fmt::Display for ParseAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message.trim_end())
    }
}

impl std::error::Error for ParseAdapter<'_> {}

impl MietteDiagnostic for ParseAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("stepcraft::parse"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(
            "page descriptions are TOML documents with a `size` and optional `group` and `items`",
        ))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let label = LabeledSpan::new_primary_with_span(
            Some("here".to_string()),
            SourceSpan::from(span.clone()),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Adapter for non-diagnostic [`StepcraftError`] variants.
///
/// This adapter handles errors that don't have source information, such as
/// I/O errors, configuration errors, invalid input and export errors.
pub struct ErrorAdapter<'a>(pub &'a StepcraftError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            StepcraftError::Io(_) => "stepcraft::io",
            StepcraftError::Config(_) => "stepcraft::config",
            StepcraftError::Parse { .. } => "stepcraft::parse",
            StepcraftError::InvalidInput(_) => "stepcraft::invalid_input",
            StepcraftError::InvalidMask { .. } => "stepcraft::invalid_mask",
            StepcraftError::Export(_) => "stepcraft::export",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            StepcraftError::InvalidInput(_) => "sizes must be non-negative and finite",
            StepcraftError::InvalidMask { .. } => {
                "a thumbnail mask needs one alpha value per thumbnail pixel"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Adapter for a recovered [`LayoutIssue`], rendered as a warning.
pub struct IssueAdapter<'a>(pub &'a LayoutIssue);

impl fmt::Debug for IssueAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for IssueAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for IssueAdapter<'_> {}

impl MietteDiagnostic for IssueAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            LayoutIssue::ConstraintInfeasible { .. } => "stepcraft::constraint_infeasible",
            LayoutIssue::DanglingRelativeTo { .. } => "stepcraft::dangling_relative_to",
            LayoutIssue::CycleGuardTripped { .. } => "stepcraft::cycle_guard",
        };
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Warning)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help: Box<dyn fmt::Display + 'a> = match &self.0 {
            LayoutIssue::ConstraintInfeasible { part, .. } => Box::new(format!(
                "the list was left empty; relax its constraint or shrink `{part}`"
            )),
            LayoutIssue::DanglingRelativeTo { relative_to, .. } => Box::new(format!(
                "add a {relative_to} to this scope or place the element against something else"
            )),
            LayoutIssue::CycleGuardTripped { .. } => {
                Box::new("elements placed against each other in a loop stay unplaced")
            }
        };
        Some(help)
    }
}

/// A reportable error or warning that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A parse error with source location information.
    Parse(ParseAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
    /// A layout issue the composer recovered from.
    Issue(IssueAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Parse(p) => fmt::Display::fmt(p, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
            Reportable::Issue(i) => fmt::Display::fmt(i, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Error(e) => e.source(),
            Reportable::Parse(_) | Reportable::Issue(_) => None,
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Parse(p) => p.code(),
            Reportable::Error(e) => e.code(),
            Reportable::Issue(i) => i.code(),
        }
    }

    fn severity(&self) -> Option<Severity> {
        match self {
            Reportable::Parse(p) => p.severity(),
            Reportable::Error(e) => e.severity(),
            Reportable::Issue(i) => i.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Parse(p) => p.help(),
            Reportable::Error(e) => e.help(),
            Reportable::Issue(i) => i.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Parse(p) => p.source_code(),
            Reportable::Error(e) => e.source_code(),
            Reportable::Issue(i) => i.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Parse(p) => p.labels(),
            Reportable::Error(e) => e.labels(),
            Reportable::Issue(i) => i.labels(),
        }
    }
}

/// Convert a [`StepcraftError`] into a list of reportable errors.
pub fn to_reportables(err: &StepcraftError) -> Vec<Reportable<'_>> {
    match err {
        StepcraftError::Parse { message, span, src } => {
            vec![Reportable::Parse(ParseAdapter::new(message, span.as_ref(), src))]
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Convert recovered layout issues into reportable warnings.
pub fn issue_reportables(issues: &[LayoutIssue]) -> Vec<Reportable<'_>> {
    issues
        .iter()
        .map(|issue| Reportable::Issue(IssueAdapter(issue)))
        .collect()
}
