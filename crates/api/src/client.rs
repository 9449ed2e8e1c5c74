//! Authenticated HTTP client shared by the automation and storage facades.
//!
//! [`ApiClient`] owns a configured `reqwest::Client`, a validated base URL and,
//! for remote hosts, a [`TokenProvider`] for one scope. Requests are built
//! against the base URL with [`ApiClient::endpoint`] and sent through
//! [`ApiClient::execute`], which attaches the `Authorization` header, logs the
//! exchange and reads the body into an [`ApiResponse`].

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use da_types::ClientCredentials;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;

/// Hostnames allowed for local development regardless of scheme. No
/// credentials are exchanged for these hosts.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on one request, body transfer included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    auth: Option<Arc<TokenProvider>>,
    user_agent: String,
}

impl ApiClient {
    /// Builds a client for `base_url` that authenticates with `scope`.
    ///
    /// Non-local hosts must use https. Local hosts get no token provider.
    pub fn new(base_url: &str, credentials: ClientCredentials, scope: &str) -> ApiResult<Self> {
        let base_url = validate_base_url(base_url)?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Client)?;

        let auth = if is_local_host(&base_url) {
            debug!(%base_url, "local host, requests are sent without credentials");
            None
        } else {
            Some(Arc::new(TokenProvider::new(http.clone(), &base_url, credentials, scope)?))
        };

        Ok(Self {
            base_url,
            http,
            auth,
            user_agent: format!("da-sample/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.auth = Some(Arc::new(provider));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn requires_authentication(&self) -> bool {
        self.auth.is_some()
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// A request builder carrying the client's User-Agent, without credentials.
    pub fn request_builder(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header(USER_AGENT, &self.user_agent)
    }

    /// The current `Authorization` header value, refreshed when needed.
    ///
    /// `None` when the client talks to a local host.
    pub async fn authorization(&self) -> ApiResult<Option<String>> {
        match &self.auth {
            Some(provider) => provider.authorization_header().await.map(Some),
            None => Ok(None),
        }
    }

    /// Sends a request relative to the base URL with an optional JSON body.
    pub async fn request<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path.trim_start_matches('/')).map_err(|error| ApiError::InvalidBaseUrl {
            url: format!("{}{}", self.base_url, path),
            reason: error.to_string(),
        })?;
        let mut builder = self.request_builder(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await
    }

    /// Attaches credentials and sends the request.
    pub async fn execute(&self, builder: RequestBuilder) -> ApiResult<ApiResponse> {
        let builder = match self.authorization().await? {
            Some(header) => builder.header(AUTHORIZATION, header),
            None => builder,
        };
        self.send(builder).await
    }

    /// Sends the request as-is and reads the body to completion.
    ///
    /// Used directly for pre-signed endpoints that must not see our token.
    pub async fn send(&self, builder: RequestBuilder) -> ApiResult<ApiResponse> {
        let request = builder.build().map_err(ApiError::Request)?;
        let method = request.method().clone();
        let url = request.url().clone();
        let start = Instant::now();
        debug!(method = %method, path = %url.path(), "http request started");

        let response = self.http.execute(request).await.map_err(|source| {
            warn!(
                method = %method,
                path = %url.path(),
                error = %source,
                duration_ms = start.elapsed().as_millis(),
                "http request failed"
            );
            ApiError::Transport {
                url: url.to_string(),
                source,
            }
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!(
            method = %method,
            path = %url.path(),
            status = status.as_u16(),
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(ApiResponse::new(status, body))
    }
}

/// Parses and checks a service base URL, normalizing it to end with `/`.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be https
pub fn validate_base_url(base: &str) -> ApiResult<Url> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("URL must include a host".to_string()));
    }
    if !is_local_host(&url) && url.scheme() != "https" {
        return Err(invalid(format!(
            "non-local hosts must use https; got '{}://'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn is_local_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| LOCALHOST_DOMAINS.iter().any(|&allowed| host.eq_ignore_ascii_case(allowed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials::new("id", "secret")
    }

    #[test]
    fn base_urls_require_https_unless_local() {
        assert!(validate_base_url("http://automation.example.com/v3/").is_err());
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("http://127.0.0.1:8080/v3").is_ok());
        assert!(validate_base_url("http://LOCALHOST/v3").is_ok());
        assert_eq!(
            validate_base_url("https://automation.example.com/da/v3").unwrap().as_str(),
            "https://automation.example.com/da/v3/"
        );
    }

    #[test]
    fn remote_hosts_get_a_token_provider() {
        let remote = ApiClient::new("https://automation.example.com/v3/", credentials(), "code:all").unwrap();
        assert!(remote.requires_authentication());
        let local = ApiClient::new("http://localhost:9000/v3/", credentials(), "code:all").unwrap();
        assert!(!local.requires_authentication());
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let client = ApiClient::new("https://storage.example.com/oss/v2", credentials(), "data:read").unwrap();
        assert_eq!(
            client.endpoint(&["buckets", "abcinput", "objects", "my part.ipt"]).unwrap().as_str(),
            "https://storage.example.com/oss/v2/buckets/abcinput/objects/my%20part.ipt"
        );
    }

    #[tokio::test]
    async fn local_requests_carry_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/workitems"))
            .and(body_json(serde_json::json!({"activityId": "a"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"w1"}"#))
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/v3/", server.uri()), credentials(), "code:all").unwrap();
        let response = client
            .request(Method::POST, "workitems", Some(&serde_json::json!({"activityId": "a"})))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.get_field("id").as_deref(), Some("w1"));
        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn authenticated_requests_carry_the_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "t0k3n",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/forgeapps/me"))
            .and(header("authorization", "Bearer t0k3n"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#""acme""#))
            .expect(2)
            .mount(&server)
            .await;

        let base = format!("{}/v3/", server.uri());
        let client = ApiClient::new(&base, credentials(), "code:all").unwrap();
        let provider = TokenProvider::new(Client::new(), client.base_url(), credentials(), "code:all").unwrap();
        let client = client.with_token_provider(provider);

        for _ in 0..2 {
            let response = client.request(Method::GET, "forgeapps/me", None::<&()>).await.unwrap();
            assert_eq!(response.body(), r#""acme""#);
        }
    }

    #[tokio::test]
    async fn transport_failures_are_reported_as_transport_errors() {
        let client = ApiClient::new("http://127.0.0.1:9/v3/", credentials(), "code:all").unwrap();
        let error = client.request(Method::GET, "forgeapps/me", None::<&()>).await.unwrap_err();
        assert!(matches!(error, ApiError::Transport { .. }));
    }
}
