//! HTTP transport for the two MAL hosts
//!
//! Every call names its host explicitly: `Host::Api` for resources and the
//! password grant, `Host::OAuth` for the token and authorization endpoints.
//! A call is a single attempt and always yields a decoded JSON body; a body
//! that does not parse is an error for that call.
//!
//! `Transport` is a trait so sessions can run against a stub. It uses
//! `Pin<Box<dyn Future>>` return types to stay dyn-compatible
//! (`Arc<dyn Transport>`).

use std::future::Future;
use std::pin::Pin;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::constants::{API_BASE_URL, CLIENT_ID_HEADER, FORM_CONTENT_TYPE, OAUTH_BASE_URL};
use crate::error::{Error, Result};

/// Which base URL a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// Primary resource API (`https://api.myanimelist.net/v2/`)
    Api,
    /// Secondary OAuth API (`https://myanimelist.net/v1/`)
    OAuth,
}

/// Base URLs for both hosts. Always end in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api: String,
    oauth: String,
}

impl Endpoints {
    pub fn new(api: impl Into<String>, oauth: impl Into<String>) -> Self {
        Self {
            api: with_trailing_slash(api.into()),
            oauth: with_trailing_slash(oauth.into()),
        }
    }

    pub fn base(&self, host: Host) -> &str {
        match host {
            Host::Api => &self.api,
            Host::OAuth => &self.oauth,
        }
    }

    /// Join a relative path onto the host's base URL.
    pub fn url(&self, host: Host, path: &str) -> String {
        format!("{}{}", self.base(host), path.trim_start_matches('/'))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(API_BASE_URL, OAUTH_BASE_URL)
    }
}

fn with_trailing_slash(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Status code and decoded body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over the HTTP client.
///
/// GET sends `params` as the query string, POST and PATCH as a form body,
/// DELETE ignores them.
pub trait Transport: Send + Sync {
    fn endpoints(&self) -> &Endpoints;

    fn request<'a>(
        &'a self,
        host: Host,
        method: Method,
        path: &'a str,
        params: &'a [(&'a str, &'a str)],
        headers: &'a HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;
}

/// Header set shared by every request: form content type and client ID.
pub fn client_headers(client_id: &str) -> Result<HeaderMap> {
    let client_id = HeaderValue::from_str(client_id)
        .map_err(|e| Error::InvalidHeader(format!("client id: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), client_id);
    Ok(headers)
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self::new(reqwest::Client::new(), endpoints)
    }
}

impl Transport for HttpTransport {
    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn request<'a>(
        &'a self,
        host: Host,
        method: Method,
        path: &'a str,
        params: &'a [(&'a str, &'a str)],
        headers: &'a HeaderMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoints.url(host, path);
            let builder = self
                .client
                .request(method.clone(), &url)
                .headers(headers.clone());
            let builder = match method {
                Method::GET => builder.query(params),
                Method::POST | Method::PATCH => builder.form(params),
                _ => builder,
            };

            let response = builder
                .send()
                .await
                .map_err(|e| Error::Http(format!("{method} {url}: {e}")))?;

            let status = response.status().as_u16();
            debug!(%method, url = %response.url(), status, "mal request completed");

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Http(format!("reading body of {method} {url}: {e}")))?;
            let body = serde_json::from_slice(&bytes).map_err(|e| {
                Error::Decode(format!("{method} {url} returned {status}: {e}"))
            })?;

            Ok(Response { status, body })
        })
    }
}
