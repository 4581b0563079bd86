//! Generic CRUD over the backend's REST collections

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::{ApiClient, Auth};
use crate::error::Result;

/// A record type backed by a REST collection such as `/facilities/tanks/`
pub trait Resource: DeserializeOwned + Serialize + Clone + Send + Sync {
    /// Collection path with leading and trailing slash
    const PATH: &'static str;
    /// Singular name used in messages
    const NAME: &'static str;

    /// Body for `POST` to the collection
    type Create: Serialize + Send + Sync;
    /// Body for `PATCH` to a member; unset fields are not sent
    type Update: Serialize + Send + Sync;

    fn id(&self) -> i64;

    fn member_path(id: i64) -> String {
        format!("{}{}/", Self::PATH, id)
    }
}

impl ApiClient {
    pub async fn list<R: Resource>(&self, query: &[(&str, String)]) -> Result<Vec<R>> {
        self.list_all(R::PATH, query).await
    }

    pub async fn get<R: Resource>(&self, id: i64) -> Result<R> {
        self.request(Method::GET, &R::member_path(id), &[], None::<&()>, Auth::Bearer)
            .await
    }

    pub async fn create<R: Resource>(&self, payload: &R::Create) -> Result<R> {
        let created: R = self
            .request(Method::POST, R::PATH, &[], Some(payload), Auth::Bearer)
            .await?;
        tracing::info!("Created {} {}", R::NAME, created.id());
        Ok(created)
    }

    pub async fn update<R: Resource>(&self, id: i64, patch: &R::Update) -> Result<R> {
        let updated = self
            .request(Method::PATCH, &R::member_path(id), &[], Some(patch), Auth::Bearer)
            .await?;
        tracing::info!("Updated {} {}", R::NAME, id);
        Ok(updated)
    }

    pub async fn delete<R: Resource>(&self, id: i64) -> Result<()> {
        self.request_no_content(Method::DELETE, &R::member_path(id), None::<&()>, Auth::Bearer)
            .await?;
        tracing::info!("Deleted {} {}", R::NAME, id);
        Ok(())
    }
}
