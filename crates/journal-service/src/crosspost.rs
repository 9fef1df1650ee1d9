//! Publishing local posts to Mastodon and Bluesky.
//!
//! The local row always exists before anything is sent out. Platforms are
//! independent: a failure on one is logged and the other still runs.

use std::borrow::Cow;

use tracing::{info, instrument, warn};

use crate::errors::ApiError;
use crate::integrations::{BlueskyPost, Integrations};
use crate::models::{Post, PostSource, Target};
use crate::repositories::{PostRepository, Share};
use crate::validation::DataUrl;

/// The text each platform receives. Platforms may need different text, e.g.
/// Mastodon gets an inline URL where Bluesky gets a link card.
#[derive(Debug, Clone)]
pub struct Outbound<'a> {
    pub mastodon_text: Cow<'a, str>,
    pub bluesky_text: Cow<'a, str>,
}

impl<'a> Outbound<'a> {
    pub fn same(text: &'a str) -> Self {
        Self {
            mastodon_text: Cow::Borrowed(text),
            bluesky_text: Cow::Borrowed(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrosspostOutcome {
    pub post: Post,
    pub mastodon: bool,
    pub bluesky: bool,
}

impl CrosspostOutcome {
    pub fn shared_count(&self) -> usize {
        usize::from(self.mastodon) + usize::from(self.bluesky)
    }
}

pub fn has_mastodon_share(post: &Post, mastodon_base: Option<&str>) -> bool {
    if post.mastodon_url.is_some() || post.source == PostSource::Mastodon {
        return true;
    }
    post.external_url.as_deref().is_some_and(|url| {
        mastodon_base.is_some_and(|base| !base.is_empty() && url.starts_with(base))
            || url.contains("mastodon")
    })
}

pub fn has_bluesky_share(post: &Post) -> bool {
    if post.bluesky_uri.is_some() {
        return true;
    }
    post.external_url
        .as_deref()
        .is_some_and(|url| url.starts_with("at://") || url.contains("bsky.app"))
}

pub struct CrossPoster<'a, R: PostRepository> {
    posts: &'a R,
    integrations: &'a Integrations,
}

impl<'a, R: PostRepository> CrossPoster<'a, R> {
    pub fn new(posts: &'a R, integrations: &'a Integrations) -> Self {
        Self {
            posts,
            integrations,
        }
    }

    /// Share `post` to every target it is not already shared to and record
    /// the links the platforms return. Only repository failures are errors.
    #[instrument(skip_all, fields(post_id = post.id))]
    pub async fn share(
        &self,
        post: Post,
        targets: &[Target],
        outbound: &Outbound<'_>,
    ) -> Result<CrosspostOutcome, ApiError> {
        let image = post
            .image_data
            .as_deref()
            .filter(|data| data.starts_with("data:"))
            .and_then(|data| DataUrl::parse(data).ok());

        let mut outcome = CrosspostOutcome {
            post,
            mastodon: false,
            bluesky: false,
        };

        if targets.contains(&Target::Mastodon) {
            let shared = self
                .to_mastodon(&outcome.post, &outbound.mastodon_text, image.as_ref())
                .await;
            if let Some(url) = shared {
                outcome.post = self
                    .posts
                    .record_share(outcome.post.id, &Share::Mastodon(url))
                    .await?;
                outcome.mastodon = true;
            }
        }

        if targets.contains(&Target::Bluesky) {
            let shared = self
                .to_bluesky(&outcome.post, &outbound.bluesky_text, image.as_ref())
                .await;
            if let Some(uri) = shared {
                outcome.post = self
                    .posts
                    .record_share(outcome.post.id, &Share::Bluesky(uri))
                    .await?;
                outcome.bluesky = true;
            }
        }

        Ok(outcome)
    }

    async fn to_mastodon(&self, post: &Post, text: &str, image: Option<&DataUrl>) -> Option<String> {
        let mastodon = self.integrations.mastodon.as_ref()?;
        if has_mastodon_share(post, Some(mastodon.base_url())) {
            return None;
        }

        let mut media_ids = Vec::new();
        if let Some(image) = image {
            match mastodon.upload_media(image).await {
                Ok(id) => media_ids.push(id),
                Err(err) => {
                    warn!(post_id = post.id, error = %err, "Mastodon media upload failed");
                    return None;
                }
            }
        }

        match mastodon.publish_status(text, &media_ids).await {
            Ok(status) => {
                info!(post_id = post.id, status_id = %status.id, "Cross-posted to Mastodon");
                status.url
            }
            Err(err) => {
                warn!(post_id = post.id, error = %err, "Mastodon cross-post failed");
                None
            }
        }
    }

    async fn to_bluesky(&self, post: &Post, text: &str, image: Option<&DataUrl>) -> Option<String> {
        let bluesky = self.integrations.bluesky.as_ref()?;
        if has_bluesky_share(post) {
            return None;
        }

        let request = BlueskyPost {
            text,
            image,
            link: post.link_url.as_deref(),
        };
        match bluesky.publish(&request).await {
            Ok(record) => {
                info!(post_id = post.id, uri = %record.uri, "Cross-posted to Bluesky");
                Some(record.uri)
            }
            Err(err) => {
                warn!(post_id = post.id, error = %err, "Bluesky cross-post failed");
                None
            }
        }
    }
}
