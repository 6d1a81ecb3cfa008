//! Forum boards and topics (public)

use mal_auth::{Method, Session};
use serde_json::Value;

use crate::{Access, Result, call};

pub struct Forum<'s> {
    session: &'s Session,
}

impl<'s> Forum<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    pub async fn boards(&self) -> Result<Value> {
        call(self.session, Access::Public, Method::GET, "forum/boards", &[]).await
    }

    pub async fn topic(&self, topic_id: u64, limit: u32) -> Result<Value> {
        let path = format!("forum/topic/{topic_id}");
        let limit = limit.to_string();
        call(
            self.session,
            Access::Public,
            Method::GET,
            &path,
            &[("limit", limit.as_str())],
        )
        .await
    }

    pub async fn search_topics(&self, query: &str, limit: u32) -> Result<Value> {
        let limit = limit.to_string();
        call(
            self.session,
            Access::Public,
            Method::GET,
            "forum/topics",
            &[("q", query), ("limit", limit.as_str())],
        )
        .await
    }
}
