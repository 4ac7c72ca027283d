//! HTTP project store.
//!
//! Talks to the project server's REST surface: `GET {base}/projects` returns
//! every visible document, `POST {base}/projects` upserts a whole document and
//! `DELETE {base}/projects/{id}` removes one. There is no single-document
//! endpoint, so `load` filters the listing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::db::ProjectStore;
use crate::error::{Error, Result};
use crate::project::MainProject;

/// Environment variable holding the bearer token for the project server.
pub const TOKEN_ENV: &str = "HVT_TOKEN";

pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(HttpStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Build a store with the token taken from [`TOKEN_ENV`].
    pub fn from_env(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Self::new(base_url, std::env::var(TOKEN_ENV).ok(), timeout_secs)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

/// Normalize a listing body. Anything other than an array is an empty listing.
pub fn parse_listing(body: &Value) -> Vec<MainProject> {
    body.as_array()
        .map(|list| {
            list.iter()
                .filter(|v| v.is_object())
                .map(MainProject::ensure_valid)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ProjectStore for HttpStore {
    async fn list(&self) -> Result<Vec<MainProject>> {
        let url = self.url("projects");
        tracing::debug!(%url, "listing remote projects");
        let response = self.authorize(self.client.get(&url)).send().await?;
        let body: Value = Self::check(response).await?.json().await?;
        Ok(parse_listing(&body))
    }

    async fn load(&self, id: &str) -> Result<Option<MainProject>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    async fn save(&self, project: &MainProject) -> Result<()> {
        let url = self.url("projects");
        tracing::debug!(%url, project = %project.id, "saving remote project");
        let response = self
            .authorize(self.client.post(&url))
            .json(project)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("projects/{}", id));
        tracing::debug!(%url, "deleting remote project");
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("server at {}", self.base_url)
    }
}
