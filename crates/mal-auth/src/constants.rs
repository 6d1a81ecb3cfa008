//! MyAnimeList API constants
//!
//! The default client ID identifies a public MAL API application. It is not
//! a secret; callers registering their own application pass their ID to
//! `Auth::new` instead.

/// Client ID used when the caller does not configure one
pub const DEFAULT_CLIENT_ID: &str = "6114d00ca681b7701d1e15fe11a4987e";

/// Primary resource API (anime, manga, forum, users)
pub const API_BASE_URL: &str = "https://api.myanimelist.net/v2/";

/// Secondary API hosting the OAuth endpoints
pub const OAUTH_BASE_URL: &str = "https://myanimelist.net/v1/";

/// Token endpoint for code exchange and refresh, relative to `OAUTH_BASE_URL`
pub const TOKEN_PATH: &str = "oauth2/token";

/// Authorization endpoint, relative to `OAUTH_BASE_URL`
pub const AUTHORIZE_PATH: &str = "oauth2/authorize";

/// Password-grant endpoint, relative to `API_BASE_URL`.
/// Undocumented upstream and known to be unreliable.
pub const PASSWORD_TOKEN_PATH: &str = "auth/token";

/// Header carrying the client ID on every request
pub const CLIENT_ID_HEADER: &str = "x-mal-client-id";

/// Content type of every request body (token grants and list updates)
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
