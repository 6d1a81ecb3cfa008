//! PKCE (Proof Key for Code Exchange) with the "plain" method
//!
//! MAL only supports `code_challenge_method=plain`: the challenge placed in
//! the authorization URL is the verifier itself, and the same string is sent
//! back as `code_verifier` when exchanging the authorization code.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::constants::AUTHORIZE_PATH;
use crate::transport::{Endpoints, Host};

/// Length of a generated verifier (RFC 7636 maximum).
pub const CODE_VERIFIER_LEN: usize = 128;

/// Random bytes drawn per verifier. Encodes to 134 characters before
/// truncation.
const VERIFIER_ENTROPY_BYTES: usize = 100;

/// Generate a PKCE code verifier.
///
/// Draws from the thread-local generator, which is a CSPRNG reseeded from
/// the operating system, and encodes as URL-safe base64 without padding.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill(&mut bytes);
    let mut verifier = URL_SAFE_NO_PAD.encode(bytes);
    verifier.truncate(CODE_VERIFIER_LEN);
    verifier
}

/// Build the authorization URL the user opens to grant access.
pub fn build_authorization_url(endpoints: &Endpoints, client_id: &str, challenge: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&code_challenge_method=plain&code_challenge={}",
        endpoints.url(Host::OAuth, AUTHORIZE_PATH),
        urlencoded(client_id),
        urlencoded(challenge),
    )
}

/// Minimal URL encoding for parameter values.
/// Generated verifiers never need it; caller-supplied challenges might.
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('+', "%2B")
        .replace('#', "%23")
}
