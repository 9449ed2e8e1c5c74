//! Create-if-absent handling of storage buckets and uploaded inputs.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use da_types::{BucketList, CreateBucketRequest, ObjectDetails};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::context::WorkflowContext;

/// Walks the paged bucket listing looking for `bucket_key`.
///
/// A listing that hands out a start key it already returned is treated as
/// finished.
pub async fn bucket_exists(ctx: &WorkflowContext, bucket_key: &str) -> Result<bool> {
    let mut start_at: Option<String> = None;
    let mut seen = HashSet::new();
    loop {
        let listing = ctx
            .storage
            .list_buckets(start_at.as_deref())
            .await
            .context("list buckets")?
            .ensure_success("listing buckets failed")?;
        let buckets: BucketList = listing.json().context("decode bucket listing")?;
        if buckets.contains(bucket_key) {
            return Ok(true);
        }
        let Some(next) = buckets.next_start_at() else {
            return Ok(false);
        };
        if !seen.insert(next.to_string()) {
            warn!(start_at = %next, "bucket listing repeated a page");
            return Ok(false);
        }
        debug!(start_at = %next, "requesting next bucket page");
        start_at = Some(next.to_string());
    }
}

/// Creates `bucket_key` unless the bucket listing already contains it.
pub async fn ensure_bucket_exists(ctx: &WorkflowContext, bucket_key: &str) -> Result<()> {
    info!(bucket = %bucket_key, "checking bucket");
    if bucket_exists(ctx, bucket_key).await? {
        info!(bucket = %bucket_key, "bucket already exists");
        return Ok(());
    }

    let request = CreateBucketRequest {
        bucket_key: bucket_key.to_string(),
        policy_key: ctx.config.bucket_policy,
    };
    ctx.storage
        .create_bucket(&request)
        .await
        .with_context(|| format!("create bucket {bucket_key}"))?
        .ensure_success(&format!("creating bucket {bucket_key} failed"))?;
    info!(bucket = %bucket_key, policy = ?ctx.config.bucket_policy, "bucket created");
    Ok(())
}

/// Uploads a local input file into the input bucket unless it is already there.
pub async fn ensure_input_exists(ctx: &WorkflowContext, file_name: &str) -> Result<()> {
    let local_path = ctx.input_file(file_name);
    if !local_path.is_file() {
        bail!("input file {} does not exist", local_path.display());
    }

    let bucket = ctx.input_bucket();
    let details = ctx
        .storage
        .get_object_details(&bucket, file_name)
        .await
        .with_context(|| format!("look up {file_name} in bucket {bucket}"))?;

    if details.is_success() {
        let size = details.json::<ObjectDetails>().ok().and_then(|object| object.size);
        info!(bucket = %bucket, object = %file_name, size = ?size, "input already uploaded");
        return Ok(());
    }
    match details.status() {
        StatusCode::FORBIDDEN => {
            details.report_error("input bucket is not accessible");
            bail!("bucket {bucket} belongs to another application; bucket keys must be unique across all applications")
        }
        StatusCode::NOT_FOUND => {
            info!(bucket = %bucket, object = %file_name, "uploading input");
            ctx.storage
                .upload_object(&local_path, &bucket, file_name)
                .await
                .with_context(|| format!("upload {}", local_path.display()))?
                .ensure_success(&format!("uploading {file_name} failed"))?;
            info!(bucket = %bucket, object = %file_name, "input uploaded");
            Ok(())
        }
        status => {
            details.report_error("checking input object failed");
            bail!("checking {file_name} in bucket {bucket} failed with status {status}")
        }
    }
}
