//! Waiting for a submitted work item to reach a terminal state.

use anyhow::{Context, Result, bail};
use da_types::WorkItemResponse;
use tracing::{debug, info, warn};

use crate::context::WorkflowContext;

/// Polls until the work item leaves `pending`/`inprogress`.
pub async fn poll_work_item(ctx: &WorkflowContext, work_item_id: &str) -> Result<WorkItemResponse> {
    poll_work_item_with_observer(ctx, work_item_id, |_| {}).await
}

/// Polls a work item and notifies `observer` before every wait.
///
/// The status is fetched immediately and then once after each wait, so a
/// `pending, inprogress, success` sequence waits exactly twice. The observer
/// receives the 1-based wait number.
pub async fn poll_work_item_with_observer<F>(
    ctx: &WorkflowContext,
    work_item_id: &str,
    mut observer: F,
) -> Result<WorkItemResponse>
where
    F: FnMut(u32),
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let response = ctx
            .automation
            .get_work_item(work_item_id)
            .await
            .with_context(|| format!("get status of work item {work_item_id}"))?
            .ensure_success("getting work item status failed")?;
        let current: WorkItemResponse = response
            .json()
            .with_context(|| format!("decode status of work item {work_item_id}"))?;
        info!(work_item = %work_item_id, status = %current.status, attempts, "work item status");

        if !current.status.is_in_flight() {
            return Ok(current);
        }

        if let Some(max_attempts) = ctx.options.max_poll_attempts
            && attempts >= max_attempts
        {
            warn!(work_item = %work_item_id, attempts, "poll guard tripped");
            bail!(
                "work item {work_item_id} still {} after {attempts} status checks",
                current.status
            );
        }

        observer(attempts);
        debug!(
            work_item = %work_item_id,
            interval_ms = ctx.options.poll_interval.as_millis(),
            "waiting before next status check"
        );
        tokio::time::sleep(ctx.options.poll_interval).await;
    }
}
