//! `batch`: one action over several VMs, in order

use avmctl_core::{BatchReport, OperationConfig, VmAction, VmTarget, run_batch};
use colored::Colorize;
use comfy_table::Table;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::commands::async_utils::Spinner;
use crate::commands::notify::operation_for_output;
use crate::error::{AvmCtlError, Result as CliResult};
use crate::output;

/// Run the batch and print one result per target.
///
/// `config` carries the shared subscription and credentials; its VM is the
/// first target. Fails with `BatchFailed` when any target failed.
pub async fn handle_batch(
    config: OperationConfig,
    targets: &[VmTarget],
    action: VmAction,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!(%action, targets = targets.len(), "Running batch");
    let op = operation_for_output(config, output_format)?;

    let spinner = Spinner::for_output(
        output_format,
        &format!("Running {} on {} VMs", action, targets.len()),
    );
    let op = match &spinner {
        Some(spinner) => op.with_progress(spinner.callback()),
        None => op,
    };
    let report = run_batch(&op, targets, action).await;
    if let Some(spinner) = spinner {
        spinner.finish();
    }

    print_report(&report, output_format)?;

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(AvmCtlError::BatchFailed {
            failed: report.failed(),
            total: report.items.len(),
        })
    }
}

fn print_report(report: &BatchReport, output_format: OutputFormat) -> CliResult<()> {
    match output_format {
        OutputFormat::Auto => {
            for item in &report.items {
                let detail = item
                    .error
                    .as_deref()
                    .or(item.status.as_deref())
                    .unwrap_or("done");
                if item.success {
                    println!(
                        "{} {} ({}): {}",
                        "\u{2713}".green(),
                        item.vm_name,
                        item.resource_group,
                        detail
                    );
                } else {
                    println!(
                        "{} {} ({}): {}",
                        "\u{2717}".red(),
                        item.vm_name,
                        item.resource_group,
                        detail
                    );
                }
            }
            println!(
                "{} succeeded, {} failed",
                report.succeeded(),
                report.failed()
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["VM", "RESOURCE GROUP", "RESULT", "DETAIL"]);
            for item in &report.items {
                table.add_row(vec![
                    item.vm_name.clone(),
                    item.resource_group.clone(),
                    if item.success { "ok" } else { "failed" }.to_string(),
                    item.error
                        .clone()
                        .or_else(|| item.status.clone())
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Json => output::print_output(report, output::OutputFormat::Json)?,
        OutputFormat::Yaml => output::print_output(report, output::OutputFormat::Yaml)?,
    }
    Ok(())
}
