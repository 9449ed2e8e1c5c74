//! Building and submitting the part and assembly work items.

use anyhow::{Context, Result, bail};
use da_types::{SignedUrlResponse, WorkItemArgument, WorkItemRequest};
use indexmap::IndexMap;
use tracing::info;

use crate::context::WorkflowContext;

/// Local name the zipped assembly is unpacked under on the engine side.
pub const ASSEMBLY_LOCAL_NAME: &str = "Assy";

/// Requests a single-use signed URL for `object` in `bucket`.
pub async fn signed_url(ctx: &WorkflowContext, bucket: &str, object: &str) -> Result<String> {
    let response = ctx
        .storage
        .create_signed_url(bucket, object)
        .await
        .with_context(|| format!("create signed URL for {bucket}/{object}"))?
        .ensure_success("creating signed URL failed")?;
    let signed: SignedUrlResponse = response
        .json()
        .with_context(|| format!("signed URL response for {object} lacks signedUrl"))?;
    Ok(signed.signed_url)
}

/// Output descriptor that makes the service `PUT` the result into the output bucket.
pub async fn output_destination(ctx: &WorkflowContext, file_name: &str) -> Result<WorkItemArgument> {
    let url = ctx.storage.object_url(&ctx.output_bucket(), file_name)?;
    let authorization = ctx
        .storage
        .client()
        .authorization()
        .await
        .context("authorize output upload")?;
    Ok(WorkItemArgument::destination(url.to_string(), authorization.as_deref()))
}

pub async fn part_work_item(ctx: &WorkflowContext) -> Result<WorkItemRequest> {
    let config = &ctx.config;
    let input_bucket = ctx.input_bucket();
    let mut arguments = IndexMap::new();

    arguments.insert(
        config.req_input_arg_name.clone(),
        WorkItemArgument::source(signed_url(ctx, &input_bucket, &config.input_part_file).await?),
    );
    arguments.insert(
        config.param_arg_name_small.clone(),
        WorkItemArgument::inline_json(&config.part_parameters),
    );
    arguments.insert(
        config.param_arg_name_large.clone(),
        WorkItemArgument::source(signed_url(ctx, &input_bucket, &config.param_file_large).await?),
    );
    arguments.insert(
        config.light_arg_name.clone(),
        WorkItemArgument::source(signed_url(ctx, &input_bucket, &config.light_file).await?),
    );
    arguments.insert(
        config.heavy_arg_name.clone(),
        WorkItemArgument::source(signed_url(ctx, &input_bucket, &config.heavy_file).await?),
    );
    for (argument, file) in config.part_outputs() {
        arguments.insert(argument.to_string(), output_destination(ctx, file).await?);
    }

    Ok(WorkItemRequest {
        activity_id: ctx.qualified(&config.part_assembly_activity_id)?,
        arguments,
    })
}

/// Work item for the zipped assembly. Fails when no assembly input is configured.
pub async fn assembly_work_item(ctx: &WorkflowContext) -> Result<WorkItemRequest> {
    let config = &ctx.config;
    let zip_file = config
        .input_assembly_zip_file
        .as_deref()
        .context("no assembly input is configured")?;
    let top_level = config
        .input_top_level_assembly
        .as_deref()
        .context("InputTopLevelAssembly is required with an assembly input")?;

    let mut arguments = IndexMap::new();
    let input_url = signed_url(ctx, &ctx.input_bucket(), zip_file).await?;
    arguments.insert(
        config.req_input_arg_name.clone(),
        WorkItemArgument::source(input_url).packed(top_level, ASSEMBLY_LOCAL_NAME),
    );
    arguments.insert(
        config.param_arg_name_small.clone(),
        WorkItemArgument::inline_json(&config.assembly_parameters),
    );
    arguments.insert(
        config.output_assembly_arg_name.clone(),
        output_destination(ctx, &config.output_zip_assembly_file).await?,
    );

    Ok(WorkItemRequest {
        activity_id: ctx.qualified(&config.part_assembly_activity_id)?,
        arguments,
    })
}

/// Submits a work item and returns its id.
pub async fn submit_work_item(ctx: &WorkflowContext, request: &WorkItemRequest) -> Result<String> {
    info!(activity = %request.activity_id, arguments = request.arguments.len(), "submitting work item");
    let response = ctx
        .automation
        .create_work_item(request)
        .await
        .context("submit work item")?
        .ensure_success("creating work item failed")?;
    let Some(id) = response.get_field("id").filter(|id| !id.is_empty()) else {
        response.report_error("work item response carries no id");
        bail!("failed to post work item: the response carries no id");
    };
    info!(work_item = %id, "work item submitted");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_context;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_signed_urls(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/oss/v2/buckets/abcinput/objects/[^/]+/signed$"))
            .respond_with(|request: &wiremock::Request| {
                let object = request.url.path_segments().unwrap().nth(5).unwrap().to_string();
                ResponseTemplate::new(200).set_body_json(json!({"signedUrl": format!("https://signed/{object}")}))
            })
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn part_work_item_mixes_signed_inline_and_output_arguments() {
        let server = MockServer::start().await;
        mount_signed_urls(&server).await;
        let workspace = tempdir().unwrap();
        let ctx = mock_context(&server, workspace.path());

        let request = part_work_item(&ctx).await.unwrap();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["activityId"], "acme.PartAssemblyActivity+prod");
        assert_eq!(value["arguments"]["InventorDoc"], json!({"url": "https://signed/box.ipt"}));
        assert_eq!(value["arguments"]["InventorParamsLarge"], json!({"url": "https://signed/paramsLarge.json"}));
        assert_eq!(value["arguments"]["ImageLight"], json!({"url": "https://signed/light.png"}));
        assert_eq!(
            value["arguments"]["InventorParamsSmall"]["url"],
            r#"data:application/json,{"height":"16 in","width":"10 in"}"#
        );
        let output = &value["arguments"]["OutputLarge"];
        assert_eq!(output["verb"], "put");
        assert_eq!(output["url"], format!("{}/oss/v2/buckets/abcoutput/objects/largeBox.ipt", server.uri()));
        assert_eq!(output["headers"]["Content-type"], "application/octet-stream");
        assert_eq!(request.arguments.len(), 11);
    }

    #[tokio::test]
    async fn assembly_work_item_keeps_the_archive_packed() {
        let server = MockServer::start().await;
        mount_signed_urls(&server).await;
        let workspace = tempdir().unwrap();
        let mut ctx = mock_context(&server, workspace.path());
        ctx.config.input_assembly_zip_file = Some("assy.zip".into());
        ctx.config.input_top_level_assembly = Some("Top.iam".into());

        let value = serde_json::to_value(assembly_work_item(&ctx).await.unwrap()).unwrap();

        assert_eq!(
            value["arguments"]["InventorDoc"],
            json!({"url": "https://signed/assy.zip", "zip": false, "pathInZip": "Top.iam", "localName": "Assy"})
        );
        assert_eq!(
            value["arguments"]["InventorParamsSmall"]["url"],
            r#"data:application/json,{"handleOffset":"9 in","height":"16 in"}"#
        );
        assert_eq!(value["arguments"]["OutputAssembly"]["verb"], "put");
        assert_eq!(value["arguments"].as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn assembly_work_item_requires_an_assembly_input() {
        let server = MockServer::start().await;
        let workspace = tempdir().unwrap();
        let ctx = mock_context(&server, workspace.path());
        assert!(assembly_work_item(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn submission_without_an_id_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/v3/workitems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
            .mount(&server)
            .await;
        let workspace = tempdir().unwrap();
        let ctx = mock_context(&server, workspace.path());
        let request = WorkItemRequest {
            activity_id: "acme.PartAssemblyActivity+prod".into(),
            arguments: IndexMap::new(),
        };
        assert!(submit_work_item(&ctx, &request).await.is_err());
    }

    #[tokio::test]
    async fn submission_returns_the_work_item_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/da/v3/workitems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w42", "status": "pending"})))
            .mount(&server)
            .await;
        let workspace = tempdir().unwrap();
        let ctx = mock_context(&server, workspace.path());
        let request = WorkItemRequest {
            activity_id: "acme.PartAssemblyActivity+prod".into(),
            arguments: IndexMap::new(),
        };
        assert_eq!(submit_work_item(&ctx, &request).await.unwrap(), "w42");
    }
}
