//! Spinner output while waiting on long-running VM operations
//!
//! Wraps the core progress events in an indicatif spinner. The spinner draws
//! to stderr and hides itself when stderr is not a terminal.

use std::sync::Arc;

use avmctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::OutputFormat;

/// Spinner plus the callback that drives it
pub struct Spinner {
    bar: ProgressBar,
    callback: ProgressCallback,
}

impl Spinner {
    /// Start a spinner for human-readable output; `None` for machine formats
    pub fn for_output(output_format: OutputFormat, message: &str) -> Option<Self> {
        match output_format {
            OutputFormat::Auto | OutputFormat::Table => Some(Self::new(message)),
            OutputFormat::Json | OutputFormat::Yaml => None,
        }
    }

    fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(120));

        let bar_clone = bar.clone();
        let callback: ProgressCallback =
            Arc::new(move |event: ProgressEvent| match &event {
                ProgressEvent::Started { operation } => {
                    bar_clone.set_message(format!("{}: accepted", operation));
                }
                ProgressEvent::Polling {
                    operation, status, ..
                } => {
                    bar_clone.set_message(format!("{}: {}", operation, format_state(status)));
                }
                ProgressEvent::Completed { operation } => {
                    bar_clone.set_message(format!("{}: {}", operation, format_state("succeeded")));
                }
                ProgressEvent::Failed { operation, error } => {
                    bar_clone.set_message(format!("{} failed: {}", operation, error));
                }
            });

        Self { bar, callback }
    }

    pub fn callback(&self) -> ProgressCallback {
        self.callback.clone()
    }

    /// Stop the spinner and clear its line
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// Format an operation state for display with status icons
pub fn format_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "succeeded" | "success" | "completed" => format!("\u{2713} {}", state), // checkmark
        "failed" | "error" => format!("\u{2717} {}", state),                   // x mark
        "canceled" | "cancelled" => format!("\u{2298} {}", state),              // circle slash
        "inprogress" | "in_progress" | "running" => format!("\u{21bb} {}", state), // arrow circle
        _ => state.to_string(),
    }
}
