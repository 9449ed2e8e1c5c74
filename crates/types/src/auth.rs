//! Credential material exchanged with the authentication endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client identifier and secret used for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Body returned by a successful token exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    /// Scheme placed in front of the token in the `Authorization` header (usually `Bearer`).
    pub token_type: String,
    /// Opaque access token.
    pub access_token: String,
    /// Lifetime of the token in seconds, counted from issuance.
    pub expires_in: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_secret() {
        let credentials = ClientCredentials::new("abc", "s3cr3t");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("abc"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn token_response_accepts_integer_lifetimes() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"token_type":"Bearer","access_token":"xyz","expires_in":3599}"#).expect("token");
        assert_eq!(token.expires_in, 3599.0);
    }
}
