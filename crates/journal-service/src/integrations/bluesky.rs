use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Result, ensure_success};
use crate::config::BlueskyConfig;
use crate::content::url_spans;
use crate::validation::DataUrl;

const SERVICE: &str = "bluesky";

/// What to publish: text plus at most one embed. An image wins over a link
/// card.
#[derive(Debug, Clone, Copy)]
pub struct BlueskyPost<'a> {
    pub text: &'a str,
    pub image: Option<&'a DataUrl>,
    pub link: Option<&'a str>,
}

/// Strong reference to the created `app.bsky.feed.post` record.
#[derive(Debug, Clone, Deserialize)]
pub struct BlueskyRecord {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct UploadBlobResponse {
    blob: Value,
}

#[async_trait]
pub trait BlueskyApi: Send + Sync {
    async fn publish(&self, post: &BlueskyPost<'_>) -> Result<BlueskyRecord>;
}

/// XRPC client that logs in for every publish; no session outlives a call.
pub struct HttpBluesky {
    client: reqwest::Client,
    service_url: String,
    identifier: String,
    password: String,
}

impl HttpBluesky {
    pub fn new(client: reqwest::Client, config: &BlueskyConfig) -> Self {
        Self {
            client,
            service_url: config.service_url.clone(),
            identifier: config.identifier.clone(),
            password: config.app_password.clone(),
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }

    async fn create_session(&self) -> Result<SessionResponse> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": self.identifier,
                "password": self.password,
            }))
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn upload_blob(&self, session: &SessionResponse, image: &DataUrl) -> Result<Value> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, image.mime.as_str())
            .body(image.bytes.clone())
            .send()
            .await?;

        let uploaded: UploadBlobResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(uploaded.blob)
    }
}

#[async_trait]
impl BlueskyApi for HttpBluesky {
    async fn publish(&self, post: &BlueskyPost<'_>) -> Result<BlueskyRecord> {
        let session = self.create_session().await?;

        let embed = match (post.image, post.link) {
            (Some(image), _) => {
                let blob = self.upload_blob(&session, image).await?;
                Some(image_embed(blob))
            }
            (None, Some(link)) => Some(external_embed(link)),
            (None, None) => None,
        };

        let record = post_record(post.text, embed);
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }
}

fn post_record(text: &str, embed: Option<Value>) -> Value {
    let mut record = json!({
        "$type": "app.bsky.feed.post",
        "text": text,
        "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    let facets = link_facets(text);
    if !facets.is_empty() {
        record["facets"] = Value::Array(facets);
    }
    if let Some(embed) = embed {
        record["embed"] = embed;
    }
    record
}

/// Bluesky does not linkify plain text; links need facets with UTF-8 byte
/// offsets.
fn link_facets(text: &str) -> Vec<Value> {
    url_spans(text)
        .into_iter()
        .map(|(start, end, uri)| {
            json!({
                "index": { "byteStart": start, "byteEnd": end },
                "features": [{ "$type": "app.bsky.richtext.facet#link", "uri": uri }],
            })
        })
        .collect()
}

fn external_embed(link: &str) -> Value {
    json!({
        "$type": "app.bsky.embed.external",
        "external": {
            "uri": link,
            "title": link,
            "description": "",
        },
    })
}

fn image_embed(blob: Value) -> Value {
    json!({
        "$type": "app.bsky.embed.images",
        "images": [{ "alt": "", "image": blob }],
    })
}
