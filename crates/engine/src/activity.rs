//! The part/assembly activity: its parameter schema, its command line and
//! its registration.

use anyhow::{Context, Result};
use da_types::{ActivityParameter, ActivityPayload, VersionResponse, WorkflowConfig};
use indexmap::IndexMap;
use tracing::info;

use crate::context::WorkflowContext;
use crate::resources::{ResourceKind, ensure_alias, resource_exists};

/// Command line the engine runs for every work item of the activity.
pub fn command_line(config: &WorkflowConfig) -> String {
    format!(
        "$(engine.path)\\{executable} /i $(args[{input}].path) /al $(appbundles[{app}].path) $(args[{small}].path) $(args[{large}].path)",
        executable = config.engine_executable,
        input = config.req_input_arg_name,
        app = config.app_id,
        small = config.param_arg_name_small,
        large = config.param_arg_name_large,
    )
}

/// Parameter schema: the document input, both parameter files, the two
/// on-demand images and every declared output.
pub fn activity_parameters(config: &WorkflowConfig) -> IndexMap<String, ActivityParameter> {
    let mut parameters = IndexMap::new();
    parameters.insert(config.req_input_arg_name.clone(), ActivityParameter::input());
    parameters.insert(
        config.param_arg_name_small.clone(),
        ActivityParameter::input().with_local_name(&config.param_file_small),
    );
    parameters.insert(
        config.param_arg_name_large.clone(),
        ActivityParameter::input().with_local_name(&config.param_file_large),
    );
    parameters.insert(config.light_arg_name.clone(), ActivityParameter::on_demand_input());
    parameters.insert(config.heavy_arg_name.clone(), ActivityParameter::on_demand_input());
    for (argument, file) in config.activity_outputs() {
        parameters.insert(argument.to_string(), ActivityParameter::output(file));
    }
    parameters
}

/// Activity body referencing the aliased app bundle. `id` is only set when
/// the activity itself is being created.
pub fn activity_payload(config: &WorkflowConfig, qualified_app_bundle: String, id: Option<String>) -> ActivityPayload {
    ActivityPayload {
        id,
        engine: config.engine_name.clone(),
        appbundles: vec![qualified_app_bundle],
        command_line: vec![command_line(config)],
        settings: IndexMap::new(),
        parameters: activity_parameters(config),
        description: None,
    }
}

/// Creates or versions the activity and points the alias at the new version.
pub async fn ensure_activity(ctx: &WorkflowContext) -> Result<u64> {
    let activity_id = ctx.config.part_assembly_activity_id.as_str();
    let qualified = ctx.qualified(activity_id)?;
    let qualified_app_bundle = ctx.qualified(&ctx.config.app_id)?;
    let exists = resource_exists(&ctx.automation, ResourceKind::Activity, &qualified).await?;

    let response = if exists {
        info!(activity = %qualified, "activity exists, creating a new version");
        let payload = activity_payload(&ctx.config, qualified_app_bundle, None);
        ctx.automation
            .create_activity_version(activity_id, &payload)
            .await
            .context("create activity version")?
            .ensure_success("creating activity version failed")?
    } else {
        info!(activity = %qualified, "creating activity");
        let payload = activity_payload(&ctx.config, qualified_app_bundle, Some(activity_id.to_string()));
        ctx.automation
            .create_activity(&payload)
            .await
            .context("create activity")?
            .ensure_success("creating activity failed")?
    };
    let created: VersionResponse = response.json().context("activity response lacks a version")?;

    ensure_alias(&ctx.automation, ResourceKind::Activity, activity_id, ctx.alias(), created.version).await?;
    info!(activity = %activity_id, version = created.version, "activity published");
    Ok(created.version)
}
