//! Authenticated session bound to one client ID
//!
//! A `Session` pairs the client ID with the current token (or none, for a
//! guest) and derives the header set every resource call sends. Refresh
//! swaps the token wholesale and only after the grant succeeds; on failure
//! the previous token stays in place.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{info, warn};

use crate::credentials::{CredentialStore, StoredCredential};
use crate::error::{Error, Result};
use crate::token::{self, Token, now_millis};
use crate::transport::{Transport, client_headers};

pub struct Session {
    client_id: String,
    token: Option<Token>,
    /// Unix millis, known only when this process obtained the token
    expires_at: Option<u64>,
    base_headers: HeaderMap,
    authorization: Option<HeaderValue>,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub(crate) fn new(
        client_id: String,
        token: Option<Token>,
        expires_at: Option<u64>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base_headers = client_headers(&client_id)?;
        let authorization = token.as_ref().map(bearer).transpose()?;
        Ok(Self {
            client_id,
            token,
            expires_at,
            base_headers,
            authorization,
            transport,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// A guest session has no token and can only reach public endpoints.
    pub fn is_guest(&self) -> bool {
        self.token.is_none()
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Headers for a resource call.
    ///
    /// Always carries `Content-Type` and `X-MAL-CLIENT-ID`; `Authorization`
    /// is added only when the session holds a token.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = self.base_headers.clone();
        if let Some(value) = &self.authorization {
            headers.insert(AUTHORIZATION, value.clone());
        }
        headers
    }

    /// Headers for a call that requires a signed-in user.
    pub fn authorized_headers(&self) -> Result<HeaderMap> {
        if self.is_guest() {
            return Err(Error::NoToken("this call requires a signed-in session"));
        }
        Ok(self.headers())
    }

    /// Replace the token using its refresh token.
    ///
    /// Fails with `Error::NoToken` on a guest session. Any grant failure is
    /// returned as-is and the current token is kept. Takes `&mut self`;
    /// callers sharing a session across tasks must serialize refreshes
    /// themselves, otherwise whichever refresh finishes last wins.
    pub async fn refresh(&mut self) -> Result<()> {
        let current = self
            .token
            .as_ref()
            .ok_or(Error::NoToken("cannot refresh a guest session"))?;

        let issued_at = now_millis();
        let fresh = match token::refresh_grant(
            self.transport.as_ref(),
            &self.client_id,
            current.refresh_token(),
        )
        .await
        {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(client_id = %self.client_id, error = %e, "token refresh failed, keeping current token");
                return Err(e);
            }
        };

        let authorization = bearer(&fresh)?;
        self.expires_at = fresh.expires_at(issued_at);
        self.authorization = Some(authorization);
        self.token = Some(fresh);
        info!(client_id = %self.client_id, "token refreshed");
        Ok(())
    }

    /// The token as JSON for later `Auth::login_with_json_str`.
    ///
    /// `Ok(None)` means the session has no token to persist.
    pub fn serialize_token(&self) -> Result<Option<String>> {
        self.token.as_ref().map(Token::to_json).transpose()
    }

    /// Absolute expiry in unix milliseconds, if known.
    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    /// Whether the token expires within `threshold`.
    ///
    /// Tokens with unknown expiry (loaded from bare JSON, or issued without
    /// `expires_in`) report `true`. Guests report `false`.
    pub fn needs_refresh(&self, threshold: Duration) -> bool {
        if self.is_guest() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => {
                let threshold = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
                expires_at <= now_millis().saturating_add(threshold)
            }
            None => true,
        }
    }

    /// Persist the token and its expiry under `account`.
    pub async fn save(&self, store: &CredentialStore, account: &str) -> Result<()> {
        let token = self
            .token
            .clone()
            .ok_or(Error::NoToken("cannot save a guest session"))?;
        store
            .add(
                account,
                StoredCredential {
                    token,
                    expires_at: self.expires_at,
                },
            )
            .await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("token", &self.token)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn bearer(token: &Token) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.access_token()))
        .map_err(|e| Error::InvalidHeader(format!("access token: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
