//! # Design Automation sample workflow
//!
//! Drives the automation and storage services through the sample's fixed
//! sequence of steps:
//!
//! - resolve the caller's nickname
//! - create the input bucket, upload missing inputs, create the output bucket
//! - publish the app bundle and the activity under the configured alias
//! - run the part work item and, when configured, the assembly work item
//! - download reports and results
//!
//! Each step is an `async fn` over a shared [`WorkflowContext`]; [`run_workflow`]
//! runs them all and stops at the first failure.

pub mod activity;
pub mod app_bundle;
pub mod buckets;
pub mod context;
pub mod outputs;
pub mod poll;
pub mod resources;
pub mod run;
pub mod work_item;

#[cfg(test)]
mod test_support;

pub use activity::{activity_parameters, activity_payload, command_line, ensure_activity};
pub use app_bundle::{ensure_app_bundle, publish_app_bundle};
pub use buckets::{bucket_exists, ensure_bucket_exists, ensure_input_exists};
pub use context::{DEFAULT_POLL_INTERVAL, WorkflowContext, WorkflowOptions};
pub use outputs::{download_failure_report, download_output, download_report, download_results};
pub use poll::{poll_work_item, poll_work_item_with_observer};
pub use resources::{ResourceKind, ensure_alias, resource_exists};
pub use run::{resolve_nickname, run_with_context, run_work_item, run_workflow};
pub use work_item::{assembly_work_item, output_destination, part_work_item, signed_url, submit_work_item};
