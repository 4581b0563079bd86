//! List/detail state for a resource: the items on screen, whether a load is
//! pending, and the last error to show inline.

use std::sync::Arc;

use crate::api::{ApiClient, Resource};
use crate::error::Result;

pub struct ResourceView<R: Resource> {
    client: Arc<ApiClient>,
    items: Vec<R>,
    loading: bool,
    error: Option<String>,
}

impl<R: Resource> ResourceView<R> {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn find(&self, id: i64) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Replace the items from the server. A failed load keeps what was shown.
    pub async fn load(&mut self, query: &[(&str, String)]) -> Result<&[R]> {
        self.loading = true;
        let result = self.client.list::<R>(query).await;
        self.loading = false;

        let items = self.record(result)?;
        self.items = items;
        Ok(&self.items)
    }

    /// Create on the server and append the returned record
    pub async fn create(&mut self, payload: &R::Create) -> Result<&R> {
        let result = self.client.create::<R>(payload).await;
        let created = self.record(result)?;
        self.items.push(created);
        let last = self.items.len() - 1;
        Ok(&self.items[last])
    }

    /// Patch on the server and swap in the returned record
    pub async fn update(&mut self, id: i64, patch: &R::Update) -> Result<&R> {
        let result = self.client.update::<R>(id, patch).await;
        let updated = self.record(result)?;

        match self.items.iter().position(|item| item.id() == id) {
            Some(index) => {
                self.items[index] = updated;
                Ok(&self.items[index])
            }
            None => {
                self.items.push(updated);
                let last = self.items.len() - 1;
                Ok(&self.items[last])
            }
        }
    }

    /// Remove locally right away; put the item back if the server refuses
    pub async fn remove(&mut self, id: i64) -> Result<()> {
        let index = self.items.iter().position(|item| item.id() == id);
        let removed = index.map(|index| (index, self.items.remove(index)));

        let result = self.client.delete::<R>(id).await;
        if result.is_err() {
            if let Some((index, item)) = removed {
                tracing::debug!("Restoring {} {} after failed delete", R::NAME, id);
                self.items.insert(index, item);
            }
        }

        self.record(result)
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Ok(value)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}
