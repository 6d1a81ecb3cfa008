//! OAuth token value and the grants that produce it
//!
//! A `Token` is created by one of three grants against the MAL token
//! endpoints (password, refresh, authorization code) or by decoding a
//! previously stored token. It never changes after construction; a refresh
//! yields a new value.
//!
//! The code exchange and refresh POST to `oauth2/token` on the OAuth host.
//! The password grant POSTs to `auth/token` on the resource host.

use common::Secret;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{PASSWORD_TOKEN_PATH, TOKEN_PATH};
use crate::error::{Error, Result};
use crate::transport::{Host, Transport, client_headers};

/// Bearer credentials issued by MAL.
///
/// Serializes to exactly `token_type`, `access_token`, `refresh_token` and
/// `expires_in`, the format accepted back by `Token::from_json_str`.
/// `expires_in` is a delta in seconds from issuance, not an absolute time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TokenRecord")]
pub struct Token {
    token_type: String,
    access_token: Secret<String>,
    refresh_token: Secret<String>,
    expires_in: Option<u64>,
}

/// Wire shape of a token before validation.
#[derive(Deserialize)]
struct TokenRecord {
    token_type: String,
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TryFrom<TokenRecord> for Token {
    type Error = Error;

    fn try_from(record: TokenRecord) -> Result<Self> {
        Token::new(
            record.token_type,
            record.access_token,
            record.refresh_token,
            record.expires_in,
        )
    }
}

impl Token {
    /// Build a token, rejecting an empty access token.
    pub fn new(
        token_type: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: Option<u64>,
    ) -> Result<Self> {
        let access_token = Secret::new(access_token.into());
        if access_token.is_empty() {
            return Err(Error::MalformedToken("access_token is empty".into()));
        }
        Ok(Self {
            token_type: token_type.into(),
            access_token,
            refresh_token: Secret::new(refresh_token.into()),
            expires_in,
        })
    }

    /// Decode a token from a JSON value, e.g. a token endpoint response.
    pub fn from_json_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::MalformedToken(e.to_string()))
    }

    /// Decode a token stored with `Token::to_json`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedToken(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedToken(e.to_string()))
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose()
    }

    /// Seconds the access token was valid for when issued.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Absolute expiry in unix milliseconds, given when the token was issued.
    pub fn expires_at(&self, issued_at_millis: u64) -> Option<u64> {
        self.expires_in
            .map(|secs| issued_at_millis.saturating_add(secs.saturating_mul(1000)))
    }
}

/// Current time as unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Obtain a token with a username and password.
///
/// **Unstable.** MAL does not document this grant and may reject it for
/// any client.
pub async fn password_grant(
    transport: &dyn Transport,
    client_id: &str,
    username: &str,
    password: &str,
) -> Result<Token> {
    let form = [
        ("client_id", client_id),
        ("grant_type", "password"),
        ("username", username),
        ("password", password),
    ];
    request_token(transport, client_id, Host::Api, PASSWORD_TOKEN_PATH, &form).await
}

/// Obtain a new token from a refresh token.
pub async fn refresh_grant(
    transport: &dyn Transport,
    client_id: &str,
    refresh_token: &str,
) -> Result<Token> {
    let form = [
        ("client_id", client_id),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    request_token(transport, client_id, Host::OAuth, TOKEN_PATH, &form).await
}

/// Exchange an authorization code for a token (PKCE, plain method).
///
/// With the plain method the challenge placed in the authorization URL is
/// the verifier itself, so `code_verifier` is the same string the caller
/// passed to `build_authorization_url`.
pub async fn exchange_code(
    transport: &dyn Transport,
    client_id: &str,
    code: &str,
    code_verifier: &str,
) -> Result<Token> {
    let form = [
        ("client_id", client_id),
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", code_verifier),
    ];
    request_token(transport, client_id, Host::OAuth, TOKEN_PATH, &form).await
}

async fn request_token(
    transport: &dyn Transport,
    client_id: &str,
    host: Host,
    path: &str,
    form: &[(&str, &str)],
) -> Result<Token> {
    let headers = client_headers(client_id)?;
    let response = transport
        .request(host, Method::POST, path, form, &headers)
        .await?;

    if response.status != 200 {
        warn!(status = response.status, path, "token endpoint rejected grant");
        return Err(Error::TokenExchange {
            status: response.status,
            body: response.body,
        });
    }

    debug!(path, "token endpoint issued token");
    Token::from_json_value(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::StubTransport;
    use serde_json::json;

    fn token_body() -> Value {
        json!({
            "token_type": "Bearer",
            "expires_in": 2678400,
            "access_token": "at_abc",
            "refresh_token": "rt_def"
        })
    }

    #[test]
    fn serialized_token_round_trips() {
        let token = Token::new("Bearer", "at_abc", "rt_def", Some(3600)).unwrap();
        let json = token.to_json().unwrap();
        assert_eq!(Token::from_json_str(&json).unwrap(), token);

        let fields: serde_json::Map<String, Value> = serde_json::from_str(&json).unwrap();
        let mut keys: Vec<_> = fields.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["access_token", "expires_in", "refresh_token", "token_type"]
        );
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = Token::from_json_str(r#"{"access_token":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)), "got: {err:?}");

        let err = Token::from_json_value(json!({"error": "invalid_grant"})).unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)), "got: {err:?}");
    }

    #[test]
    fn non_json_string_is_malformed() {
        let err = Token::from_json_str("not json").unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)), "got: {err:?}");
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let err = Token::new("Bearer", "", "rt", None).unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)));

        let err = Token::from_json_value(json!({
            "token_type": "Bearer",
            "access_token": "",
            "refresh_token": "rt",
            "expires_in": 10
        }))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)));
    }

    #[test]
    fn expires_in_may_be_null_or_absent() {
        let null = Token::from_json_value(json!({
            "token_type": "Bearer",
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": null
        }))
        .unwrap();
        assert_eq!(null.expires_in(), None);

        let absent = Token::from_json_str(
            r#"{"token_type":"Bearer","access_token":"at","refresh_token":"rt"}"#,
        )
        .unwrap();
        assert_eq!(absent, null);
        assert_eq!(absent.expires_at(1_000), None);
    }

    #[test]
    fn expires_at_adds_seconds_to_issue_time() {
        let token = Token::new("Bearer", "at", "rt", Some(3600)).unwrap();
        assert_eq!(token.expires_at(1_000), Some(3_601_000));
    }

    #[test]
    fn debug_does_not_leak_tokens() {
        let token = Token::new("Bearer", "at_secret", "rt_secret", Some(1)).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("at_secret"), "got: {debug}");
        assert!(!debug.contains("rt_secret"), "got: {debug}");
    }

    #[tokio::test]
    async fn exchange_code_posts_authorization_code_grant() {
        let stub = StubTransport::replying([(200, token_body())]);
        let token = exchange_code(&stub, "cid", "code_1", "verifier_1")
            .await
            .unwrap();
        assert_eq!(token.access_token(), "at_abc");
        assert_eq!(token.expires_in(), Some(2678400));

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.host, Host::OAuth);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, TOKEN_PATH);
        assert_eq!(req.param("grant_type"), Some("authorization_code"));
        assert_eq!(req.param("client_id"), Some("cid"));
        assert_eq!(req.param("code"), Some("code_1"));
        assert_eq!(req.param("code_verifier"), Some("verifier_1"));
    }

    #[tokio::test]
    async fn refresh_grant_posts_refresh_token() {
        let stub = StubTransport::replying([(200, token_body())]);
        refresh_grant(&stub, "cid", "rt_old").await.unwrap();

        let req = &stub.requests()[0];
        assert_eq!(req.host, Host::OAuth);
        assert_eq!(req.param("grant_type"), Some("refresh_token"));
        assert_eq!(req.param("refresh_token"), Some("rt_old"));
    }

    #[tokio::test]
    async fn password_grant_targets_resource_host() {
        let stub = StubTransport::replying([(200, token_body())]);
        password_grant(&stub, "cid", "alice", "pw").await.unwrap();

        let req = &stub.requests()[0];
        assert_eq!(req.host, Host::Api);
        assert_eq!(req.path, PASSWORD_TOKEN_PATH);
        assert_eq!(req.param("grant_type"), Some("password"));
        assert_eq!(req.param("username"), Some("alice"));
        assert_eq!(req.param("password"), Some("pw"));
    }

    #[tokio::test]
    async fn non_200_carries_status_and_body() {
        let stub = StubTransport::replying([(400, json!({"error": "invalid_grant"}))]);
        let err = exchange_code(&stub, "cid", "bad", "bad").await.unwrap_err();

        match err {
            Error::TokenExchange { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body["error"], "invalid_grant");
            }
            other => panic!("expected TokenExchange, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_with_malformed_body_is_not_a_token() {
        let stub = StubTransport::replying([(200, json!({"message": "ok"}))]);
        let err = refresh_grant(&stub, "cid", "rt").await.unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)), "got: {err:?}");
    }
}
