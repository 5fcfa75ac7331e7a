//! Error types for Stepcraft operations.
//!
//! Two families live here:
//!
//! - [`StepcraftError`] is returned as `Err` when the input tree violates a
//!   precondition (negative sizes, non-finite values) or configuration cannot
//!   be loaded. Nothing else aborts a page.
//! - [`LayoutIssue`] describes a problem that was recovered locally, at the
//!   smallest scope possible (one parts list, one subtree). Issues are
//!   collected on the composed page for the caller to surface.

use std::{io, ops::Range};

use serde::Serialize;
use thiserror::Error;

use stepcraft_core::placement::{PlacementError, RelativeTo};

use crate::pli::{PliConstraint, part::MaskSizeError};

/// The main error type for Stepcraft operations.
#[derive(Debug, Error)]
pub enum StepcraftError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A page description that is not valid TOML or does not match the
    /// page tree.
    #[error("{message}")]
    Parse {
        message: String,
        span: Option<Range<usize>>,
        src: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] PlacementError),

    #[error("Invalid thumbnail mask for part `{part}`: {source}")]
    InvalidMask {
        part: String,
        #[source]
        source: MaskSizeError,
    },

    #[error("Export error: {0}")]
    Export(String),
}

impl StepcraftError {
    /// Create a new `Parse` error with the associated source text.
    pub fn new_parse_error(
        message: impl Into<String>,
        span: Option<Range<usize>>,
        src: impl Into<String>,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            span,
            src: src.into(),
        }
    }
}

/// A recoverable layout problem.
///
/// Each variant names the offending element so a diagnostic can point the
/// user at it.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutIssue {
    #[error("parts list `{parts_list}` cannot satisfy {constraint}: {reason} (part `{part}`)")]
    ConstraintInfeasible {
        parts_list: String,
        part: String,
        constraint: PliConstraint,
        reason: String,
    },

    #[error("`{node}` is placed relative to a missing {relative_to}")]
    DanglingRelativeTo { node: String, relative_to: RelativeTo },

    #[error("placement of `{node}` loops back on itself")]
    CycleGuardTripped { node: String },
}

impl LayoutIssue {
    /// Returns the label of the element the issue is about.
    pub fn subject(&self) -> &str {
        match self {
            LayoutIssue::ConstraintInfeasible { parts_list, .. } => parts_list,
            LayoutIssue::DanglingRelativeTo { node, .. } => node,
            LayoutIssue::CycleGuardTripped { node } => node,
        }
    }
}
