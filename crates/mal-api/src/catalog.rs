//! Anime and manga lookups and list updates
//!
//! Both catalogs share the same endpoint layout under `anime/` or `manga/`.

use mal_auth::{Method, Session};
use serde_json::Value;

use crate::{Access, Result, call};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Anime,
    Manga,
}

impl Kind {
    pub fn path(&self) -> &'static str {
        match self {
            Kind::Anime => "anime",
            Kind::Manga => "manga",
        }
    }
}

pub struct Catalog<'s> {
    session: &'s Session,
    kind: Kind,
}

impl<'s> Catalog<'s> {
    pub fn new(session: &'s Session, kind: Kind) -> Self {
        Self { session, kind }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Search titles. `fields` is MAL's comma-separated field selector.
    pub async fn search(&self, query: &str, limit: u32, fields: Option<&str>) -> Result<Value> {
        let limit = limit.to_string();
        let mut params = vec![("q", query), ("limit", limit.as_str())];
        if let Some(fields) = fields {
            params.push(("fields", fields));
        }
        call(self.session, Access::Public, Method::GET, self.kind.path(), &params).await
    }

    pub async fn details(&self, id: u64, fields: Option<&str>) -> Result<Value> {
        let path = format!("{}/{id}", self.kind.path());
        let params: Vec<(&str, &str)> = fields.map(|f| ("fields", f)).into_iter().collect();
        call(self.session, Access::Public, Method::GET, &path, &params).await
    }

    /// Ranked list, e.g. `ranking_type = "all"`, `"airing"`, `"manga"`.
    pub async fn ranking(&self, ranking_type: &str, limit: u32) -> Result<Value> {
        let path = format!("{}/ranking", self.kind.path());
        let limit = limit.to_string();
        let params = [("ranking_type", ranking_type), ("limit", limit.as_str())];
        call(self.session, Access::Public, Method::GET, &path, &params).await
    }

    /// Update the signed-in user's list entry, e.g. `[("status", "watching")]`.
    pub async fn update_my_list_status(&self, id: u64, fields: &[(&str, &str)]) -> Result<Value> {
        let path = format!("{}/{id}/my_list_status", self.kind.path());
        call(self.session, Access::SignedIn, Method::PATCH, &path, fields).await
    }

    pub async fn delete_my_list_item(&self, id: u64) -> Result<Value> {
        let path = format!("{}/{id}/my_list_status", self.kind.path());
        call(self.session, Access::SignedIn, Method::DELETE, &path, &[]).await
    }
}
