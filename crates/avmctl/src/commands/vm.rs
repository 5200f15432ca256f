//! Single-VM commands: start, stop, status, ensure-running

use avmctl_core::{AvmOperation, EnsureOutcome, OperationConfig, VmAction};
use serde::Serialize;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::commands::async_utils::Spinner;
use crate::commands::notify::operation_for_output;
use crate::error::{AvmCtlError, Result as CliResult};
use crate::output;

/// Result of a power action, as printed
#[derive(Debug, Serialize)]
struct ActionOutput<'a> {
    vm_name: &'a str,
    resource_group: &'a str,
    action: VmAction,
    success: bool,
    message: String,
}

/// Power state report, as printed
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    vm_name: &'a str,
    resource_group: &'a str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    power_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    computer_name: Option<String>,
}

/// Run a power action and report the outcome
pub async fn handle_action(
    config: OperationConfig,
    action: VmAction,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!(%action, vm = %config.vm, "Running VM action");
    let op = operation_for_output(config, output_format)?;
    if action == VmAction::Status {
        return handle_status_with(&op, output_format).await;
    }
    let vm = op.vm().clone();

    let spinner = Spinner::for_output(
        output_format,
        &format!("Waiting for {} of {}", action, vm.vm_name),
    );
    let op = match &spinner {
        Some(spinner) => op.with_progress(spinner.callback()),
        None => op,
    };

    let result = op.perform(action).await;
    if let Some(spinner) = spinner {
        spinner.finish();
    }
    result?;

    print_action(
        &ActionOutput {
            vm_name: &vm.vm_name,
            resource_group: &vm.resource_group,
            action,
            success: true,
            message: action.success_message(&vm.vm_name),
        },
        output_format,
    )
}

/// Print the VM's power state; a missing VM is an error
pub async fn handle_status(config: OperationConfig, output_format: OutputFormat) -> CliResult<()> {
    let op = AvmOperation::new(config)?;
    handle_status_with(&op, output_format).await
}

async fn handle_status_with(op: &AvmOperation, output_format: OutputFormat) -> CliResult<()> {
    let vm = op.vm();
    let view = op
        .instance_view()
        .await?
        .ok_or_else(|| AvmCtlError::VmNotFound {
            message: format!(
                "virtual machine '{}' in resource group '{}'",
                vm.vm_name, vm.resource_group
            ),
        })?;

    let report = StatusOutput {
        vm_name: &vm.vm_name,
        resource_group: &vm.resource_group,
        status: view.status_text(),
        power_state: view.power_state().map(|s| s.code().to_string()),
        provisioning_state: view.provisioning_state().map(str::to_string),
        computer_name: view.computer_name.clone(),
    };

    match output_format {
        OutputFormat::Auto => println!("{}: {}", vm.vm_name, report.status),
        OutputFormat::Json => output::print_output(&report, output::OutputFormat::Json)?,
        OutputFormat::Yaml => output::print_output(&report, output::OutputFormat::Yaml)?,
        OutputFormat::Table => output::print_output(&report, output::OutputFormat::Table)?,
    }
    Ok(())
}

/// Start the VM unless it already runs
pub async fn handle_ensure_running(
    config: OperationConfig,
    output_format: OutputFormat,
) -> CliResult<()> {
    let op = operation_for_output(config, output_format)?;
    let vm = op.vm().clone();

    let spinner = Spinner::for_output(output_format, &format!("Ensuring {} is running", vm.vm_name));
    let op = match &spinner {
        Some(spinner) => op.with_progress(spinner.callback()),
        None => op,
    };
    let result = op.ensure_running().await;
    if let Some(spinner) = spinner {
        spinner.finish();
    }

    let message = match result? {
        EnsureOutcome::AlreadyRunning => format!("VM '{}' is already running", vm.vm_name),
        EnsureOutcome::Started => VmAction::Start.success_message(&vm.vm_name),
    };

    print_action(
        &ActionOutput {
            vm_name: &vm.vm_name,
            resource_group: &vm.resource_group,
            action: VmAction::Start,
            success: true,
            message,
        },
        output_format,
    )
}

fn print_action(report: &ActionOutput<'_>, output_format: OutputFormat) -> CliResult<()> {
    match output_format {
        OutputFormat::Auto => println!("{}", report.message),
        OutputFormat::Json => output::print_output(report, output::OutputFormat::Json)?,
        OutputFormat::Yaml => output::print_output(report, output::OutputFormat::Yaml)?,
        OutputFormat::Table => output::print_output(report, output::OutputFormat::Table)?,
    }
    Ok(())
}
