//! The end-to-end sample workflow.
//!
//! Steps run strictly in sequence and the first failure ends the run. Nothing
//! created before the failure is rolled back; re-running picks up the existing
//! buckets, inputs and resources.

use anyhow::{Context, Result, bail};
use da_types::{ClientCredentials, WorkItemRequest, WorkflowConfig};
use tracing::info;

use crate::activity::ensure_activity;
use crate::app_bundle::publish_app_bundle;
use crate::buckets::{ensure_bucket_exists, ensure_input_exists};
use crate::context::{WorkflowContext, WorkflowOptions};
use crate::outputs::{download_failure_report, download_results};
use crate::poll::poll_work_item;
use crate::work_item::{assembly_work_item, part_work_item, submit_work_item};

/// Builds the clients for `config` and runs every workflow step.
pub async fn run_workflow(config: WorkflowConfig, credentials: ClientCredentials, options: WorkflowOptions) -> Result<()> {
    let mut ctx = WorkflowContext::new(config, credentials, options)?;
    run_with_context(&mut ctx).await
}

pub async fn run_with_context(ctx: &mut WorkflowContext) -> Result<()> {
    resolve_nickname(ctx).await?;
    let ctx = &*ctx;

    ensure_bucket_exists(ctx, &ctx.input_bucket()).await?;
    for input in ctx.config.required_inputs() {
        ensure_input_exists(ctx, input).await?;
    }
    ensure_bucket_exists(ctx, &ctx.output_bucket()).await?;

    publish_app_bundle(ctx).await?;
    ensure_activity(ctx).await?;

    let part = part_work_item(ctx).await?;
    run_work_item(ctx, &part, &ctx.config.part_report, &ctx.config.part_outputs()).await?;

    if ctx.config.input_assembly_zip_file.is_none() {
        info!("no assembly input configured, workflow complete");
        return Ok(());
    }
    if ctx.options.skip_assembly {
        info!("assembly work item skipped, workflow complete");
        return Ok(());
    }
    let assembly = assembly_work_item(ctx).await?;
    let assembly_outputs = [(
        ctx.config.output_assembly_arg_name.as_str(),
        ctx.config.output_zip_assembly_file.as_str(),
    )];
    run_work_item(ctx, &assembly, &ctx.config.assembly_report, &assembly_outputs).await?;

    info!("workflow complete");
    Ok(())
}

/// Reads the caller's nickname and stores it on the context.
pub async fn resolve_nickname(ctx: &mut WorkflowContext) -> Result<String> {
    let response = ctx
        .automation
        .get_nickname()
        .await
        .context("get nickname")?
        .ensure_success("error retrieving nickname")?;
    let nickname = response.body().replace('"', "").trim().to_string();
    if nickname.is_empty() {
        bail!("the service returned an empty nickname");
    }
    info!(nickname = %nickname, "nickname resolved");
    ctx.set_nickname(nickname.clone());
    Ok(nickname)
}

/// Submits, polls and collects one work item.
///
/// A work item ending in any state but `success` only has its report
/// downloaded, under the configured error report name, and fails the run.
pub async fn run_work_item(
    ctx: &WorkflowContext,
    request: &WorkItemRequest,
    report_name: &str,
    outputs: &[(&str, &str)],
) -> Result<()> {
    let id = submit_work_item(ctx, request).await?;
    let finished = poll_work_item(ctx, &id).await?;
    if !finished.status.is_success() {
        download_failure_report(ctx, &finished).await;
        bail!("work item {id} finished with status {}", finished.status);
    }
    download_results(ctx, &finished, report_name, outputs).await?;
    Ok(())
}
