//! Downloading reports and results once a work item has finished.

use std::path::PathBuf;

use anyhow::{Context, Result};
use da_types::{OutputRetrieval, WorkItemResponse};
use da_util::{download_request, download_url};
use tracing::{info, warn};

use crate::context::WorkflowContext;
use crate::work_item::signed_url;

/// Downloads the work item's report to `file_name` in the output directory.
pub async fn download_report(ctx: &WorkflowContext, work_item: &WorkItemResponse, file_name: &str) -> Result<PathBuf> {
    let report_url = work_item
        .report_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .with_context(|| format!("work item {} has no reportUrl", work_item.id))?;
    let destination = ctx.output_dir().join(file_name);
    info!(work_item = %work_item.id, path = %destination.display(), "writing report");
    download_url(report_url, &destination)
        .await
        .with_context(|| format!("download report of work item {}", work_item.id))?;
    Ok(destination)
}

/// Downloads the error report of a failed work item.
///
/// A report that cannot be fetched is logged; the caller still reports the
/// work item failure.
pub async fn download_failure_report(ctx: &WorkflowContext, work_item: &WorkItemResponse) {
    warn!(
        work_item = %work_item.id,
        status = %work_item.status,
        report = %ctx.config.error_report,
        "work item failed, writing report"
    );
    if let Err(error) = download_report(ctx, work_item, &ctx.config.error_report).await {
        warn!(work_item = %work_item.id, error = %format!("{error:#}"), "failure report could not be downloaded");
    }
}

/// Downloads one result object from the output bucket.
pub async fn download_output(ctx: &WorkflowContext, file_name: &str) -> Result<PathBuf> {
    let bucket = ctx.output_bucket();
    let destination = ctx.output_dir().join(file_name);
    match ctx.config.output_retrieval {
        OutputRetrieval::SignedUrl => {
            let url = signed_url(ctx, &bucket, file_name).await?;
            download_url(&url, &destination).await
        }
        OutputRetrieval::Direct => {
            let request = ctx.storage.object_request(&bucket, file_name).await?;
            download_request(request, &destination).await
        }
    }
    .with_context(|| format!("download {file_name} from bucket {bucket}"))?;
    Ok(destination)
}

/// Downloads the report and every `(argument, file)` output of a successful work item.
pub async fn download_results(
    ctx: &WorkflowContext,
    work_item: &WorkItemResponse,
    report_name: &str,
    outputs: &[(&str, &str)],
) -> Result<Vec<PathBuf>> {
    let mut written = vec![download_report(ctx, work_item, report_name).await?];
    for (_, file_name) in outputs {
        written.push(download_output(ctx, file_name).await?);
    }
    info!(work_item = %work_item.id, files = written.len(), "results downloaded");
    Ok(written)
}
