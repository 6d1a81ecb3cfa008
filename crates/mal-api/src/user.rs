//! User profile and lists
//!
//! `@me` refers to the signed-in user and needs a token; other user names
//! are public.

use mal_auth::{Method, Session};
use serde_json::Value;

use crate::{Access, Result, call};

const SELF_USER: &str = "@me";

pub struct User<'s> {
    session: &'s Session,
}

impl<'s> User<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Profile of the signed-in user.
    pub async fn me(&self, fields: Option<&str>) -> Result<Value> {
        let path = format!("users/{SELF_USER}");
        let params: Vec<(&str, &str)> = fields.map(|f| ("fields", f)).into_iter().collect();
        call(self.session, Access::SignedIn, Method::GET, &path, &params).await
    }

    /// A user's anime list, optionally filtered by status
    /// (`watching`, `completed`, ...).
    pub async fn anime_list(&self, user_name: &str, status: Option<&str>) -> Result<Value> {
        let path = format!("users/{user_name}/animelist");
        let params: Vec<(&str, &str)> = status.map(|s| ("status", s)).into_iter().collect();
        call(self.session, access_for(user_name), Method::GET, &path, &params).await
    }
}

fn access_for(user_name: &str) -> Access {
    if user_name == SELF_USER {
        Access::SignedIn
    } else {
        Access::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{guest, signed_in};
    use crate::{Error, SessionExt};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn only_self_requires_sign_in() {
        assert_eq!(access_for("@me"), Access::SignedIn);
        assert_eq!(access_for("some_user"), Access::Public);
    }

    #[tokio::test]
    async fn me_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/@me"))
            .and(header("authorization", "Bearer at_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "alice"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = signed_in(&server).user().me(None).await.unwrap();
        assert_eq!(body["name"], "alice");
    }

    #[tokio::test]
    async fn guest_me_is_refused_locally() {
        let server = MockServer::start().await;
        let err = guest(&server).user().me(None).await.unwrap_err();
        assert!(matches!(err, Error::NoToken(_)), "got: {err:?}");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_token_surfaces_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/alice/animelist"))
            .and(query_param("status", "watching"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_token"})),
            )
            .mount(&server)
            .await;

        let err = signed_in(&server)
            .user()
            .anime_list("alice", Some("watching"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
