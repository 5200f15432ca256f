//! Operation construction per output format
//!
//! With `-o json|yaml` stdout carries only the report, so dev-mode
//! notification lines go to stderr instead.

use std::sync::Arc;

use async_trait::async_trait;
use avmctl_core::{AvmOperation, NotificationSink, Notifier, OperationConfig, OperationEvent};

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;

/// Dev lines on stderr; remote modes still post to the webhook
pub struct StderrDevSink {
    notifier: Notifier,
}

impl StderrDevSink {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl NotificationSink for StderrDevSink {
    async fn notify(&self, event: &OperationEvent) -> avmctl_core::Result<()> {
        if self.notifier.mode().is_dev() {
            eprintln!("{}", event.format_line());
            return Ok(());
        }
        self.notifier.notify(event).await
    }
}

/// Build the operation for `config`, routing notifications to suit `output_format`
pub fn operation_for_output(
    config: OperationConfig,
    output_format: OutputFormat,
) -> CliResult<AvmOperation> {
    match output_format {
        OutputFormat::Auto | OutputFormat::Table => Ok(AvmOperation::new(config)?),
        OutputFormat::Json | OutputFormat::Yaml => {
            let notifier = Notifier::new(
                config.mode.clone(),
                config.webhook_url.clone(),
                config.webhook_timeout,
            )?;
            Ok(AvmOperation::new(config)?.with_notifier(Arc::new(StderrDevSink::new(notifier))))
        }
    }
}
