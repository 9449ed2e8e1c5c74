//! Facade over the object storage service.

use std::path::Path;

use da_types::{ClientCredentials, CreateBucketRequest, SignedUrlRequest};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method, RequestBuilder};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;

use crate::auth::STORAGE_SCOPE;
use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;

const BUCKETS: &str = "buckets";
const OBJECTS: &str = "objects";

#[derive(Debug, Clone)]
pub struct StorageClient {
    client: ApiClient,
}

impl StorageClient {
    pub fn new(base_url: &str, credentials: ClientCredentials) -> ApiResult<Self> {
        Ok(Self::from_client(ApiClient::new(base_url, credentials, STORAGE_SCOPE)?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn create_bucket(&self, request: &CreateBucketRequest) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(&[BUCKETS])?;
        self.client
            .execute(self.client.request_builder(Method::POST, url).json(request))
            .await
    }

    /// One page of the caller's buckets, starting at `start_at` when given.
    pub async fn list_buckets(&self, start_at: Option<&str>) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(&[BUCKETS])?;
        let mut builder = self.client.request_builder(Method::GET, url);
        if let Some(start_at) = start_at {
            builder = builder.query(&[("startAt", start_at)]);
        }
        self.client.execute(builder).await
    }

    pub async fn list_bucket_objects(&self, bucket: &str) -> ApiResult<ApiResponse> {
        self.get(&[BUCKETS, bucket, OBJECTS]).await
    }

    pub async fn get_object_details(&self, bucket: &str, object: &str) -> ApiResult<ApiResponse> {
        self.get(&[BUCKETS, bucket, OBJECTS, object, "details"]).await
    }

    /// Streams the file at `path` into `bucket/object`.
    pub async fn upload_object(&self, path: &Path, bucket: &str, object: &str) -> ApiResult<ApiResponse> {
        let io_error = |source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).await.map_err(io_error)?;
        let length = file.metadata().await.map_err(io_error)?.len();
        let url = self.object_url(bucket, object)?;

        info!(bucket, object, bytes = length, "uploading object");
        let builder = self
            .client
            .request_builder(Method::PUT, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)));
        self.client.execute(builder).await
    }

    /// Requests a 45-minute, single-use URL for `bucket/object`.
    pub async fn create_signed_url(&self, bucket: &str, object: &str) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(&[BUCKETS, bucket, OBJECTS, object, "signed"])?;
        let builder = self
            .client
            .request_builder(Method::POST, url)
            .json(&SignedUrlRequest::default());
        self.client.execute(builder).await
    }

    /// Absolute URL of an object, the target of work-item output uploads.
    pub fn object_url(&self, bucket: &str, object: &str) -> ApiResult<Url> {
        self.client.endpoint(&[BUCKETS, bucket, OBJECTS, object])
    }

    /// An authorized `GET` for the object's content, for direct downloads.
    pub async fn object_request(&self, bucket: &str, object: &str) -> ApiResult<RequestBuilder> {
        let url = self.object_url(bucket, object)?;
        let builder = self.client.request_builder(Method::GET, url);
        Ok(match self.client.authorization().await? {
            Some(header) => builder.header(AUTHORIZATION, header),
            None => builder,
        })
    }

    async fn get(&self, segments: &[&str]) -> ApiResult<ApiResponse> {
        let url = self.client.endpoint(segments)?;
        self.client.execute(self.client.request_builder(Method::GET, url)).await
    }
}
