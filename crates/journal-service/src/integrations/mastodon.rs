use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{Result, ensure_success};
use crate::config::MastodonConfig;
use crate::validation::DataUrl;

const SERVICE: &str = "mastodon";

/// Mastodon caps `limit` on account statuses at 40.
pub const MAX_PAGE_SIZE: u32 = 40;

#[derive(Debug, Clone, Deserialize)]
pub struct MastodonAccount {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MastodonStatus {
    pub id: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// HTML
    pub content: String,
    pub visibility: String,
    pub reblog: Option<Box<MastodonStatus>>,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
}

impl MastodonStatus {
    /// Public or unlisted posts written by the account itself.
    pub fn is_original_public(&self) -> bool {
        matches!(self.visibility.as_str(), "public" | "unlisted") && self.reblog.is_none()
    }

    pub fn first_media_url(&self) -> Option<&str> {
        self.media_attachments
            .iter()
            .find_map(|media| media.url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishedStatus {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedMedia {
    id: String,
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
    visibility: &'static str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    media_ids: &'a [String],
}

#[async_trait]
pub trait MastodonApi: Send + Sync {
    /// Instance base URL, without a trailing slash.
    fn base_url(&self) -> &str;

    async fn verify_credentials(&self) -> Result<MastodonAccount>;

    /// One page of the account's statuses, newest first. `max_id` pages
    /// backwards.
    async fn account_statuses(
        &self,
        account_id: &str,
        limit: u32,
        max_id: Option<&str>,
    ) -> Result<Vec<MastodonStatus>>;

    /// Returns the media id to attach to a status.
    async fn upload_media(&self, image: &DataUrl) -> Result<String>;

    async fn publish_status(&self, status: &str, media_ids: &[String]) -> Result<PublishedStatus>;
}

pub struct HttpMastodon {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpMastodon {
    pub fn new(client: reqwest::Client, config: &MastodonConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.access_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MastodonApi for HttpMastodon {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn verify_credentials(&self) -> Result<MastodonAccount> {
        let response = self
            .client
            .get(self.url("/api/v1/accounts/verify_credentials"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn account_statuses(
        &self,
        account_id: &str,
        limit: u32,
        max_id: Option<&str>,
    ) -> Result<Vec<MastodonStatus>> {
        let mut query = vec![
            ("limit", limit.min(MAX_PAGE_SIZE).to_string()),
            ("exclude_replies", "false".to_string()),
            ("exclude_reblogs", "false".to_string()),
        ];
        if let Some(max_id) = max_id {
            query.push(("max_id", max_id.to_string()));
        }

        let response = self
            .client
            .get(self.url(&format!("/api/v1/accounts/{account_id}/statuses")))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn upload_media(&self, image: &DataUrl) -> Result<String> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name())
            .mime_str(&image.mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/v2/media"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let media: UploadedMedia = ensure_success(SERVICE, response).await?.json().await?;
        Ok(media.id)
    }

    async fn publish_status(&self, status: &str, media_ids: &[String]) -> Result<PublishedStatus> {
        let payload = StatusPayload {
            status,
            visibility: "public",
            media_ids,
        };

        let response = self
            .client
            .post(self.url("/api/v1/statuses"))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }
}
