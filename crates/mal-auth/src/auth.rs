//! Entry point for signing in
//!
//! `Auth` holds the client ID and transport and turns each login flow into
//! a `Session`:
//! 1. `Auth::code_verifier()` creates a verifier, which doubles as the
//!    challenge under the plain method
//! 2. The user opens `oauth_url(&verifier)` and approves access
//! 3. `login_with_code(code, &verifier)` exchanges the returned code
//! 4. `Session::serialize_token()` or `Session::save()` persists the token
//! 5. A later run restores it with `login_with_json_str()` or
//!    `login_from_store()`

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::constants::DEFAULT_CLIENT_ID;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::pkce;
use crate::session::Session;
use crate::token::{self, Token, now_millis};
use crate::transport::{HttpTransport, Transport, client_headers};

pub struct Auth {
    client_id: String,
    transport: Arc<dyn Transport>,
}

impl Auth {
    /// Create a facade for `client_id`, rejecting IDs that cannot be sent as
    /// a header value.
    pub fn new(client_id: impl Into<String>, transport: Arc<dyn Transport>) -> Result<Self> {
        let client_id = client_id.into();
        client_headers(&client_id)?;
        Ok(Self {
            client_id,
            transport,
        })
    }

    /// `DEFAULT_CLIENT_ID` over the public MAL endpoints.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_CLIENT_ID, Arc::new(HttpTransport::default()))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// A fresh PKCE code verifier (128 URL-safe characters).
    pub fn code_verifier() -> String {
        pkce::generate_verifier()
    }

    /// Authorization URL for the plain PKCE method.
    pub fn oauth_url(&self, code_challenge: &str) -> String {
        pkce::build_authorization_url(self.transport.endpoints(), &self.client_id, code_challenge)
    }

    /// Sign in with a username and password. **Unstable**; see
    /// `token::password_grant`.
    pub async fn unstable_login(&self, username: &str, password: &str) -> Result<Session> {
        let issued_at = now_millis();
        let token =
            token::password_grant(self.transport.as_ref(), &self.client_id, username, password)
                .await?;
        info!(client_id = %self.client_id, "signed in with password grant");
        self.issued_session(token, issued_at)
    }

    pub async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<Session> {
        let issued_at = now_millis();
        let token =
            token::refresh_grant(self.transport.as_ref(), &self.client_id, refresh_token).await?;
        info!(client_id = %self.client_id, "signed in with refresh token");
        self.issued_session(token, issued_at)
    }

    /// Complete the authorization-code flow. `code_verifier` is the value
    /// passed to `oauth_url`.
    pub async fn login_with_code(&self, code: &str, code_verifier: &str) -> Result<Session> {
        let issued_at = now_millis();
        let token =
            token::exchange_code(self.transport.as_ref(), &self.client_id, code, code_verifier)
                .await?;
        info!(client_id = %self.client_id, "signed in with authorization code");
        self.issued_session(token, issued_at)
    }

    pub fn login_with_json_value(&self, value: Value) -> Result<Session> {
        self.load_token(Token::from_json_value(value)?)
    }

    pub fn login_with_json_str(&self, json: &str) -> Result<Session> {
        self.load_token(Token::from_json_str(json)?)
    }

    /// Wrap an existing token. Its expiry is unknown to the session.
    pub fn load_token(&self, token: Token) -> Result<Session> {
        Session::new(
            self.client_id.clone(),
            Some(token),
            None,
            self.transport.clone(),
        )
    }

    /// Restore a session saved with `Session::save`.
    pub async fn login_from_store(&self, store: &CredentialStore, account: &str) -> Result<Session> {
        let stored = store.get(account).await.ok_or_else(|| {
            Error::NotFound(format!("account {account} not in credential store"))
        })?;
        Session::new(
            self.client_id.clone(),
            Some(stored.token),
            stored.expires_at,
            self.transport.clone(),
        )
    }

    /// A session without a token, for public endpoints only.
    pub fn guest_login(&self) -> Result<Session> {
        Session::new(self.client_id.clone(), None, None, self.transport.clone())
    }

    fn issued_session(&self, token: Token, issued_at: u64) -> Result<Session> {
        let expires_at = token.expires_at(issued_at);
        Session::new(
            self.client_id.clone(),
            Some(token),
            expires_at,
            self.transport.clone(),
        )
    }
}
