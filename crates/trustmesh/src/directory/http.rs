//! HTTP client for a remote key registry.
//!
//! Endpoints, relative to the base URL:
//! - `POST /keys/{identity}` register
//! - `GET  /keys/{identity}/current` (404 when nothing is registered)
//! - `GET  /keys/{identity}/history`
//! - `PUT  /keys/{identity}/current` rotate

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use url::Url;

use super::registry::{validate_document, KeyRegistry};
use crate::crypto::{KeyFormat, KeyRecord};
use crate::identity::IdentityId;
use crate::{Error, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyDocument<'a> {
    public_key: &'a str,
    format: KeyFormat,
}

pub struct HttpKeyRegistry {
    client: Client,
    base: Url,
}

impl HttpKeyRegistry {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| Error::Config(format!("invalid registry URL {base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("registry URL {base} cannot be a base")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base })
    }

    pub(crate) fn endpoint(&self, identity: &IdentityId, tail: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("registry URL cannot be a base".into()))?;
            segments.pop_if_empty().push("keys").push(identity.as_str());
            if let Some(tail) = tail {
                segments.push(tail);
            }
        }
        Ok(url)
    }

    async fn send_document(&self, request: reqwest::RequestBuilder, document: &str, format: KeyFormat) -> Result<KeyRecord> {
        let response = request
            .json(&KeyDocument { public_key: document, format })
            .send()
            .await
            .map_err(unavailable)?;
        let response = check_status(response).await?;
        response.json().await.map_err(unavailable)
    }
}

fn unavailable(e: reqwest::Error) -> Error {
    Error::DirectoryUnavailable(e.to_string())
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::InvalidKeyFormat(body),
        StatusCode::CONFLICT => Error::InvalidKeyFormat(format!("registry conflict: {body}")),
        _ => Error::DirectoryUnavailable(format!("registry returned HTTP {status}: {body}")),
    })
}

#[async_trait]
impl KeyRegistry for HttpKeyRegistry {
    async fn register(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord> {
        // Reject locally first so malformed keys never leave the client.
        validate_document(identity, document, format)?;
        let url = self.endpoint(identity, None)?;
        self.send_document(self.client.post(url), document, format).await
    }

    async fn get_current(&self, identity: &IdentityId) -> Result<Option<KeyRecord>> {
        let url = self.endpoint(identity, Some("current"))?;
        let response = self.client.get(url).send().await.map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        response.json().await.map(Some).map_err(unavailable)
    }

    async fn get_history(&self, identity: &IdentityId) -> Result<Vec<KeyRecord>> {
        let url = self.endpoint(identity, Some("history"))?;
        let response = self.client.get(url).send().await.map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = check_status(response).await?;
        response.json().await.map_err(unavailable)
    }

    async fn rotate(&self, identity: &IdentityId, document: &str, format: KeyFormat) -> Result<KeyRecord> {
        validate_document(identity, document, format)?;
        let url = self.endpoint(identity, Some("current"))?;
        self.send_document(self.client.put(url), document, format).await
    }
}
