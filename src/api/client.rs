//! Authenticated HTTP client for the facility management backend

use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::models::{RefreshRequest, RefreshResponse};
use crate::auth::store::TokenStore;
use crate::config::ApiConfig;
use crate::error::{Error, Result};

const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Upper bound on `next` links followed by [`ApiClient::list_all`]
const MAX_PAGES: usize = 100;

/// Whether a request carries the stored bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Attach the access token and refresh once on 401
    Bearer,
    /// Login, token refresh and password reset: no token, no refresh
    Anonymous,
}

/// A list endpoint answers either with a bare array or with a DRF page
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    List(Vec<T>),
    Page(Page<T>),
}

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            ListResponse::List(items) => (items, None),
            ListResponse::Page(page) => (page.results, page.next),
        }
    }
}

/// HTTP client that attaches the bearer token and silently refreshes it
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a client for the configured backend
    pub fn new(config: &ApiConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("facility-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            store,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Build an endpoint URL with an encoded query string
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Send a request and decode the JSON response
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        auth: Auth,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path, query)?;
        let body = body.map(serde_json::to_value).transpose()?;
        let text = self.send(method, url, body.as_ref(), auth).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request whose response body is ignored (e.g. `204 No Content`)
    pub async fn request_no_content<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path, &[])?;
        let body = body.map(serde_json::to_value).transpose()?;
        self.send(method, url, body.as_ref(), auth).await?;
        Ok(())
    }

    /// Fetch a list endpoint, following DRF `next` links
    pub async fn list_all<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut url = self.url(path, query)?;
        let origin = url.origin();
        let mut items = Vec::new();

        for _ in 0..MAX_PAGES {
            let text = self.send(Method::GET, url, None, Auth::Bearer).await?;
            let (mut page, next) = serde_json::from_str::<ListResponse<T>>(&text)?.into_parts();
            items.append(&mut page);

            match next {
                Some(next) => {
                    let next_url =
                        Url::parse(&next).map_err(|e| Error::InvalidUrl(format!("{}: {}", next, e)))?;
                    // The bearer token never leaves the configured backend
                    if next_url.origin() != origin {
                        return Err(Error::InvalidUrl(format!(
                            "refusing to follow page link to another host: {}",
                            next
                        )));
                    }
                    url = next_url;
                }
                None => return Ok(items),
            }
        }

        tracing::warn!("Stopped following pages of {} after {} pages", path, MAX_PAGES);
        Ok(items)
    }

    /// Exchange the stored refresh token for a new access token
    pub async fn refresh_access_token(&self) -> Result<String> {
        let refresh = self.store.get_refresh()?.ok_or(Error::NotAuthenticated)?;
        let url = self.url(REFRESH_PATH, &[])?;
        let body = serde_json::to_value(RefreshRequest { refresh: &refresh })?;

        let response = self.dispatch(Method::POST, url, Some(&body), None).await?;
        let text = read_body(response).await?;
        let tokens: RefreshResponse = serde_json::from_str(&text)?;

        match tokens.refresh {
            Some(rotated) => self.store.save(&tokens.access, &rotated)?,
            None => self.store.save_access(&tokens.access)?,
        }

        tracing::info!("Access token refreshed");
        Ok(tokens.access)
    }

    /// Core request path: one attempt, then at most one refresh and one replay
    async fn send(&self, method: Method, url: Url, body: Option<&Value>, auth: Auth) -> Result<String> {
        let token = match auth {
            Auth::Bearer => self.store.get_access()?,
            Auth::Anonymous => None,
        };

        let response = self
            .dispatch(method.clone(), url.clone(), body, token.as_deref())
            .await?;

        if auth == Auth::Anonymous || response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response).await;
        }

        let status = response.status();
        let original = Error::from_response(status, &response.text().await?);

        // Only a rejected refresh token makes the original 401 final. An
        // unreachable or failing refresh endpoint says nothing about the session.
        let access = match self.refresh_after_rejection(token.as_deref()).await {
            Ok(access) => access,
            Err(e) if e.is_transient() => {
                tracing::warn!("Token refresh unavailable: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                return Err(original);
            }
        };

        tracing::debug!("Replaying {} {} with refreshed token", method, url.path());
        let replay = self.dispatch(method, url, body, Some(&access)).await?;
        read_body(replay).await
    }

    /// Refresh serialized behind a lock. If another request already replaced the
    /// rejected token while this one waited, its token is reused.
    async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.store.get_access()? {
            if rejected != Some(current.as_str()) {
                tracing::debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        self.refresh_access_token().await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response> {
        tracing::debug!("{} {}", method, url.path());

        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }
}

async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        Ok(text)
    } else {
        let err = Error::from_response(status, &text);
        tracing::debug!("Request failed with {}: {}", status, err.user_message());
        Err(err)
    }
}
