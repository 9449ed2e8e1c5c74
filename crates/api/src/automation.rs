//! Facade over the automation service: app bundles, activities, aliases and
//! work items. Every operation returns the raw [`ApiResponse`] so callers decide
//! which statuses are acceptable.

use std::path::Path;

use da_types::{ActivityPayload, AliasPayload, AppBundlePayload, ClientCredentials, UploadParameters, WorkItemRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::Serialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::auth::AUTOMATION_SCOPE;
use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;

const APP_BUNDLES: &str = "appbundles";
const ACTIVITIES: &str = "activities";

#[derive(Debug, Clone)]
pub struct AutomationClient {
    client: ApiClient,
}

impl AutomationClient {
    pub fn new(base_url: &str, credentials: ClientCredentials) -> ApiResult<Self> {
        Ok(Self::from_client(ApiClient::new(base_url, credentials, AUTOMATION_SCOPE)?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The caller's nickname, returned as a JSON string body.
    pub async fn get_nickname(&self) -> ApiResult<ApiResponse> {
        self.get(&["forgeapps", "me"], None).await
    }

    pub async fn list_app_bundles(&self, page: Option<&str>) -> ApiResult<ApiResponse> {
        self.get(&[APP_BUNDLES], page).await
    }

    pub async fn create_app_bundle(&self, payload: &AppBundlePayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[APP_BUNDLES], payload).await
    }

    pub async fn list_app_bundle_versions(&self, id: &str) -> ApiResult<ApiResponse> {
        self.get(&[APP_BUNDLES, id, "versions"], None).await
    }

    pub async fn create_app_bundle_version(&self, id: &str, payload: &AppBundlePayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[APP_BUNDLES, id, "versions"], payload).await
    }

    pub async fn get_app_bundle_alias(&self, id: &str, alias: &str) -> ApiResult<ApiResponse> {
        self.get(&[APP_BUNDLES, id, "aliases", alias], None).await
    }

    pub async fn create_app_bundle_alias(&self, id: &str, payload: &AliasPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[APP_BUNDLES, id, "aliases"], payload).await
    }

    pub async fn update_app_bundle_alias(&self, id: &str, alias: &str, payload: &AliasPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::PATCH, &[APP_BUNDLES, id, "aliases", alias], payload)
            .await
    }

    pub async fn list_activities(&self, page: Option<&str>) -> ApiResult<ApiResponse> {
        self.get(&[ACTIVITIES], page).await
    }

    pub async fn create_activity(&self, payload: &ActivityPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[ACTIVITIES], payload).await
    }

    pub async fn list_activity_versions(&self, id: &str) -> ApiResult<ApiResponse> {
        self.get(&[ACTIVITIES, id, "versions"], None).await
    }

    pub async fn create_activity_version(&self, id: &str, payload: &ActivityPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[ACTIVITIES, id, "versions"], payload).await
    }

    pub async fn get_activity_alias(&self, id: &str, alias: &str) -> ApiResult<ApiResponse> {
        self.get(&[ACTIVITIES, id, "aliases", alias], None).await
    }

    pub async fn create_activity_alias(&self, id: &str, payload: &AliasPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &[ACTIVITIES, id, "aliases"], payload).await
    }

    pub async fn update_activity_alias(&self, id: &str, alias: &str, payload: &AliasPayload) -> ApiResult<ApiResponse> {
        self.send_json(Method::PATCH, &[ACTIVITIES, id, "aliases", alias], payload)
            .await
    }

    pub async fn create_work_item(&self, request: &WorkItemRequest) -> ApiResult<ApiResponse> {
        self.send_json(Method::POST, &["workitems"], request).await
    }

    pub async fn get_work_item(&self, id: &str) -> ApiResult<ApiResponse> {
        self.get(&["workitems", id], None).await
    }

    /// Uploads an app bundle archive to the pre-signed form endpoint issued
    /// with a new version.
    ///
    /// The server's form fields go first, in the order received, followed by
    /// the archive as the `file` part. No credentials are attached.
    pub async fn upload_app_bundle(&self, upload: &UploadParameters, archive: &Path) -> ApiResult<ApiResponse> {
        let url = url::Url::parse(&upload.endpoint_url).map_err(|error| ApiError::InvalidBaseUrl {
            url: upload.endpoint_url.clone(),
            reason: error.to_string(),
        })?;
        let io_error = |source| ApiError::Io {
            path: archive.to_path_buf(),
            source,
        };
        let file = File::open(archive).await.map_err(io_error)?;
        let length = file.metadata().await.map_err(io_error)?.len();
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package.zip".to_string());

        let mut form = Form::new();
        for (name, value) in upload.form_fields() {
            form = form.text(name, value);
        }
        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length).file_name(file_name);
        form = form.part("file", part);

        info!(archive = %archive.display(), bytes = length, "uploading app bundle archive");
        self.client
            .send(self.client.request_builder(Method::POST, url).multipart(form))
            .await
    }

    async fn get(&self, segments: &[&str], page: Option<&str>) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(segments)?;
        let mut builder = self.client.request_builder(Method::GET, url);
        if let Some(page) = page {
            debug!(page, "requesting next page");
            builder = builder.query(&[("page", page)]);
        }
        self.client.execute(builder).await
    }

    async fn send_json<B: Serialize + ?Sized>(&self, method: Method, segments: &[&str], body: &B) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(segments)?;
        self.client
            .execute(self.client.request_builder(method, url).json(body))
            .await
    }
}
