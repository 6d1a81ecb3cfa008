//! MyAnimeList OAuth authentication library
//!
//! Provides PKCE "plain" helpers, the token grants (authorization code,
//! refresh, password), the `Session` that derives request headers from the
//! current token, and a credential file for persisting sessions.
//!
//! ```no_run
//! # async fn run() -> mal_auth::Result<()> {
//! let auth = mal_auth::Auth::with_defaults()?;
//! let verifier = mal_auth::Auth::code_verifier();
//! println!("open {}", auth.oauth_url(&verifier));
//! let mut session = auth.login_with_code("code-from-redirect", &verifier).await?;
//! session.refresh().await?;
//! let saved = session.serialize_token()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod pkce;
pub mod session;
pub mod token;
pub mod transport;

pub use auth::Auth;
pub use constants::*;
pub use credentials::{CredentialStore, StoredCredential};
pub use error::{Error, Result};
pub use pkce::{build_authorization_url, generate_verifier};
pub use reqwest::Method;
pub use session::Session;
pub use token::{Token, exchange_code, password_grant, refresh_grant};
pub use transport::{Endpoints, Host, HttpTransport, Response, Transport, client_headers};
