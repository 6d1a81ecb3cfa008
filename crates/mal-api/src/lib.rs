//! MyAnimeList resource calls
//!
//! Thin wrappers over the v2 resource API. Each wrapper borrows a
//! `mal_auth::Session` for its headers and transport and returns the
//! decoded JSON body untouched; callers pick the fields they need.
//!
//! Calls that act on the signed-in user (list updates, `users/@me`) fail
//! with `Error::NoToken` on a guest session before any request is sent.

pub mod catalog;
pub mod forum;
pub mod user;

pub use catalog::{Catalog, Kind};
pub use forum::Forum;
pub use mal_auth::{Error, Result};
pub use user::User;

use mal_auth::{Host, Method, Session};
use serde_json::Value;
use tracing::debug;

/// Resource wrappers reachable from a session.
pub trait SessionExt {
    fn anime(&self) -> Catalog<'_>;
    fn manga(&self) -> Catalog<'_>;
    fn forum(&self) -> Forum<'_>;
    fn user(&self) -> User<'_>;
}

impl SessionExt for Session {
    fn anime(&self) -> Catalog<'_> {
        Catalog::new(self, Kind::Anime)
    }

    fn manga(&self) -> Catalog<'_> {
        Catalog::new(self, Kind::Manga)
    }

    fn forum(&self) -> Forum<'_> {
        Forum::new(self)
    }

    fn user(&self) -> User<'_> {
        User::new(self)
    }
}

/// Whether a call needs a signed-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Public,
    SignedIn,
}

/// Send one request to the resource host and map non-2xx to `Error::Api`.
pub(crate) async fn call(
    session: &Session,
    access: Access,
    method: Method,
    path: &str,
    params: &[(&str, &str)],
) -> Result<Value> {
    let headers = match access {
        Access::Public => session.headers(),
        Access::SignedIn => session.authorized_headers()?,
    };
    let response = session
        .transport()
        .request(Host::Api, method, path, params, &headers)
        .await?;

    if !response.is_success() {
        debug!(status = response.status, path, "resource call rejected");
        return Err(Error::Api {
            status: response.status,
            body: response.body,
        });
    }
    Ok(response.body)
}
