//! Client-credentials token exchange and the cached credential.

use std::fmt;
use std::time::{Duration, Instant};

use da_types::{ClientCredentials, TokenResponse};
use da_util::redact_sensitive;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};

/// Token endpoint, relative to the service authority.
pub const AUTHENTICATE_PATH: &str = "authentication/v1/authenticate";
/// Scope requested by the automation facade.
pub const AUTOMATION_SCOPE: &str = "code:all";
/// Scope requested by the storage facade.
pub const STORAGE_SCOPE: &str = "bucket:create bucket:read data:read data:write data:create";
/// A credential stops being used this long before it actually expires.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(5);

/// An issued access token and the window in which it may be used.
#[derive(Clone)]
pub struct Credential {
    token_type: String,
    access_token: String,
    issued_at: Instant,
    lifetime: Duration,
}

impl Credential {
    pub fn issue(token: TokenResponse) -> Self {
        Self::issue_at(token, Instant::now())
    }

    pub fn issue_at(token: TokenResponse, issued_at: Instant) -> Self {
        let lifetime = Duration::try_from_secs_f64(token.expires_in.max(0.0)).unwrap_or(if token.expires_in > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        Self {
            token_type: token.token_type,
            access_token: token.access_token,
            issued_at,
            lifetime,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    /// Valid while `now < issued_at + lifetime - EXPIRY_MARGIN`. An end that
    /// `Instant` cannot represent never arrives.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        match self.lifetime.checked_sub(EXPIRY_MARGIN) {
            Some(usable) => self.issued_at.checked_add(usable).is_none_or(|end| now < end),
            None => false,
        }
    }

    /// `Authorization` header value, e.g. `Bearer <token>`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Issues and caches credentials for one scope.
///
/// The cache is refreshed lazily: a new token is requested only when the
/// cached one is missing or past its usable window.
#[derive(Debug)]
pub struct TokenProvider {
    http: Client,
    token_url: Url,
    credentials: ClientCredentials,
    scope: String,
    cached: Mutex<Option<Credential>>,
}

impl TokenProvider {
    /// Creates a provider that authenticates against the authority of `service_url`.
    pub fn new(http: Client, service_url: &Url, credentials: ClientCredentials, scope: impl Into<String>) -> ApiResult<Self> {
        let mut authority = service_url.clone();
        authority.set_path("/");
        authority.set_query(None);
        authority.set_fragment(None);
        let token_url = authority.join(AUTHENTICATE_PATH).map_err(|error| ApiError::InvalidBaseUrl {
            url: service_url.to_string(),
            reason: error.to_string(),
        })?;
        Ok(Self {
            http,
            token_url,
            credentials,
            scope: scope.into(),
            cached: Mutex::new(None),
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the `Authorization` header value, exchanging credentials first
    /// when the cached token is missing or expired.
    pub async fn authorization_header(&self) -> ApiResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref()
            && credential.is_valid()
        {
            return Ok(credential.header_value());
        }

        let credential = self.exchange().await?;
        if !credential.is_valid() {
            return Err(ApiError::Authentication {
                reason: format!("token issued for scope '{}' is already expired", self.scope),
            });
        }
        let header = credential.header_value();
        *cached = Some(credential);
        Ok(header)
    }

    async fn exchange(&self) -> ApiResult<Credential> {
        debug!(url = %self.token_url, scope = %self.scope, "requesting access token");
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", self.scope.as_str()),
        ];
        let transport_error = |source| ApiError::Transport {
            url: self.token_url.to_string(),
            source,
        };
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), scope = %self.scope, "token exchange rejected");
            return Err(ApiError::Authentication {
                reason: format!("token endpoint returned {status}: {}", redact_sensitive(&body)),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|error| ApiError::Authentication {
            reason: format!("unparsable token response: {error}"),
        })?;
        info!(scope = %self.scope, expires_in = token.expires_in, "access token issued");
        Ok(Credential::issue(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(expires_in: f64) -> TokenResponse {
        TokenResponse {
            token_type: "Bearer".into(),
            access_token: "abc".into(),
            expires_in,
        }
    }

    fn provider(server: &MockServer, scope: &str) -> TokenProvider {
        let url = Url::parse(&format!("{}/da/us-east/v3/", server.uri())).unwrap();
        TokenProvider::new(Client::new(), &url, ClientCredentials::new("id", "secret"), scope).unwrap()
    }

    #[test]
    fn credential_expires_five_seconds_early() {
        let issued_at = Instant::now();
        let credential = Credential::issue_at(token(60.0), issued_at);
        assert!(credential.is_valid_at(issued_at));
        assert!(credential.is_valid_at(issued_at + Duration::from_secs(54)));
        assert!(!credential.is_valid_at(issued_at + Duration::from_secs(55)));
        assert!(!credential.is_valid_at(issued_at + Duration::from_secs(120)));
        assert_eq!(credential.header_value(), "Bearer abc");
    }

    #[test]
    fn short_lived_credentials_are_never_valid() {
        let issued_at = Instant::now();
        assert!(!Credential::issue_at(token(4.0), issued_at).is_valid_at(issued_at));
        assert!(!Credential::issue_at(token(f64::NAN), issued_at).is_valid_at(issued_at));
    }

    #[test]
    fn huge_lifetimes_do_not_overflow() {
        let issued_at = Instant::now();
        for expires_in in [1e18, 1e300, f64::INFINITY] {
            let credential = Credential::issue_at(token(expires_in), issued_at);
            assert!(credential.is_valid_at(issued_at + Duration::from_secs(3600)));
        }
    }

    #[test]
    fn debug_output_hides_the_token() {
        let rendered = format!("{:?}", Credential::issue(token(60.0)));
        assert!(!rendered.contains("abc"));
    }

    #[test]
    fn token_url_uses_the_service_authority() {
        let url = Url::parse("https://developer.example.com/da/us-east/v3/?x=1").unwrap();
        let provider = TokenProvider::new(Client::new(), &url, ClientCredentials::new("id", "secret"), AUTOMATION_SCOPE).unwrap();
        assert_eq!(
            provider.token_url().as_str(),
            "https://developer.example.com/authentication/v1/authenticate"
        );
    }

    #[tokio::test]
    async fn exchanges_once_and_reuses_the_cached_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=id"))
            .and(body_string_contains("scope=code%3Aall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "abc",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, AUTOMATION_SCOPE);
        assert_eq!(provider.authorization_header().await.unwrap(), "Bearer abc");
        assert_eq!(provider.authorization_header().await.unwrap(), "Bearer abc");
    }

    #[tokio::test]
    async fn rejected_exchange_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"developerMessage":"bad client"}"#))
            .mount(&server)
            .await;

        let error = provider(&server, STORAGE_SCOPE).authorization_header().await.unwrap_err();
        assert!(matches!(error, ApiError::Authentication { ref reason } if reason.contains("401")));
    }

    #[tokio::test]
    async fn already_expired_token_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "abc",
                "expires_in": 3
            })))
            .mount(&server)
            .await;

        let error = provider(&server, STORAGE_SCOPE).authorization_header().await.unwrap_err();
        assert!(matches!(error, ApiError::Authentication { .. }));
    }
}
