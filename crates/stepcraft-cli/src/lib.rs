//! CLI logic for the Stepcraft page composer.
//!
//! This module reads a page description, composes it and writes the placed
//! layout back out as TOML.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::{info, warn};

use stepcraft::{PageComposer, StepcraftError};

use error_adapter::issue_reportables;

/// Counts from a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Placed elements written to the output file.
    pub elements: usize,
    /// Layout issues the composer recovered from.
    pub issues: usize,
}

/// Run the Stepcraft CLI application
///
/// This function composes the page described by the input file and writes
/// the resulting layout to the output file. Layout issues the composer
/// recovered from are reported as warnings and do not fail the run; their
/// count is returned in the [`RunSummary`].
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `StepcraftError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors
/// - Invalid sizes or masks in the page description
/// - Export errors
pub fn run(args: &Args) -> Result<RunSummary, StepcraftError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing page"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;

    let composer = PageComposer::new(app_config);
    let page = composer.parse(&source)?;
    let composed = composer.compose(&page)?;

    if !composed.issues.is_empty() {
        let reporter = miette::GraphicalReportHandler::new();
        for reportable in issue_reportables(&composed.issues) {
            let mut writer = String::new();
            if reporter.render_report(&mut writer, &reportable).is_ok() {
                warn!("{writer}");
            }
        }
    }

    let output = composer.to_toml(&composed)?;
    fs::write(&args.output, output)?;

    let summary = RunSummary {
        elements: composed.elements.len(),
        issues: composed.issues.len(),
    };
    info!(output_file = args.output; "Layout exported successfully");

    Ok(summary)
}
