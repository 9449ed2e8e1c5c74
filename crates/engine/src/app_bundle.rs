//! Registers the plugin package as an app bundle and uploads its archive.

use anyhow::{Context, Result};
use da_types::{AppBundlePayload, UploadParameters, VersionResponse};
use tracing::info;

use crate::context::WorkflowContext;
use crate::resources::{ResourceKind, ensure_alias, resource_exists};

/// Creates the app bundle, or a new version of it when it already exists.
pub async fn ensure_app_bundle(ctx: &WorkflowContext) -> Result<VersionResponse> {
    let app_id = ctx.config.app_id.as_str();
    let qualified = ctx.qualified(app_id)?;
    let exists = resource_exists(&ctx.automation, ResourceKind::AppBundle, &qualified).await?;

    let response = if exists {
        info!(app_bundle = %qualified, "app bundle exists, creating a new version");
        let payload = AppBundlePayload {
            id: None,
            engine: ctx.config.engine_name.clone(),
            description: None,
        };
        ctx.automation
            .create_app_bundle_version(app_id, &payload)
            .await
            .context("create app bundle version")?
            .ensure_success("creating app bundle version failed")?
    } else {
        info!(app_bundle = %qualified, "creating app bundle");
        let payload = AppBundlePayload {
            id: Some(app_id.to_string()),
            engine: ctx.config.engine_name.clone(),
            description: None,
        };
        ctx.automation
            .create_app_bundle(&payload)
            .await
            .context("create app bundle")?
            .ensure_success("creating app bundle failed")?
    };

    response
        .json::<VersionResponse>()
        .context("app bundle response lacks a version")
}

/// Creates or versions the app bundle, points the alias at the new version and
/// uploads the packaged archive. Returns the new version number.
pub async fn publish_app_bundle(ctx: &WorkflowContext) -> Result<u64> {
    let created = ensure_app_bundle(ctx).await?;
    let upload = created
        .upload_parameters
        .as_ref()
        .context("app bundle response lacks uploadParameters")?;

    ensure_alias(
        &ctx.automation,
        ResourceKind::AppBundle,
        &ctx.config.app_id,
        ctx.alias(),
        created.version,
    )
    .await?;
    upload_package(ctx, upload).await?;
    info!(app_bundle = %ctx.config.app_id, version = created.version, "app bundle published");
    Ok(created.version)
}

async fn upload_package(ctx: &WorkflowContext, upload: &UploadParameters) -> Result<()> {
    let archive = ctx.config.local_app_package.as_path();
    ctx.automation
        .upload_app_bundle(upload, archive)
        .await
        .with_context(|| format!("upload app bundle archive {}", archive.display()))?
        .ensure_success("uploading app bundle archive failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_context;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_upload_flow(server: &MockServer, listed: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/da/v3/appbundles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": listed})))
            .mount(server)
            .await;
        let created = json!({
            "id": "acme.ChangeParamApp",
            "version": 2,
            "uploadParameters": {
                "endpointURL": format!("{}/upload", server.uri()),
                "formData": {"key": "apps/acme/ChangeParamApp/2"}
            }
        });
        Mock::given(method("POST"))
            .and(path("/da/v3/appbundles"))
            .and(body_json(json!({"id": "ChangeParamApp", "engine": "Autodesk.Inventor+2024"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(created.clone()))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/da/v3/appbundles/ChangeParamApp/versions"))
            .and(body_json(json!({"engine": "Autodesk.Inventor+2024"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(created))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/da/v3/appbundles/ChangeParamApp/aliases/prod"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/da/v3/appbundles/ChangeParamApp/aliases"))
            .and(body_json(json!({"id": "prod", "version": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "prod", "version": 2})))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn new_app_bundles_are_created_aliased_and_uploaded() {
        let server = MockServer::start().await;
        mount_upload_flow(&server, &[]).await;
        let workspace = tempdir().unwrap();
        std::fs::write(workspace.path().join("bundle.zip"), "zip").unwrap();
        let ctx = mock_context(&server, workspace.path());

        assert_eq!(publish_app_bundle(&ctx).await.unwrap(), 2);

        let requests = server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .all(|request| request.url.path() != "/da/v3/appbundles/ChangeParamApp/versions")
        );
    }

    #[tokio::test]
    async fn existing_app_bundles_get_a_new_version() {
        let server = MockServer::start().await;
        mount_upload_flow(&server, &["acme.ChangeParamApp+prod"]).await;
        let workspace = tempdir().unwrap();
        std::fs::write(workspace.path().join("bundle.zip"), "zip").unwrap();
        let ctx = mock_context(&server, workspace.path());

        assert_eq!(publish_app_bundle(&ctx).await.unwrap(), 2);

        let requests = server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .any(|request| request.url.path() == "/da/v3/appbundles/ChangeParamApp/versions")
        );
    }

    #[tokio::test]
    async fn missing_upload_parameters_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/da/v3/appbundles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/da/v3/appbundles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "acme.ChangeParamApp", "version": 1})))
            .mount(&server)
            .await;

        let workspace = tempdir().unwrap();
        let ctx = mock_context(&server, workspace.path());
        let error = publish_app_bundle(&ctx).await.unwrap_err();
        assert!(error.to_string().contains("uploadParameters"));
    }
}
