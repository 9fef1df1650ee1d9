use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Result, ensure_success};
use crate::config::GithubConfig;

const SERVICE: &str = "github";
const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub fork: bool,
    pub archived: bool,
    pub owner: RepoOwner,
}

impl GithubRepo {
    /// Public, original, active and owned by `owner` (case-insensitive).
    pub fn is_importable_for(&self, owner: &str) -> bool {
        !self.private && !self.fork && !self.archived && self.owner.login.eq_ignore_ascii_case(owner)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubPull {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub merged_at: Option<DateTime<Utc>>,
}

/// A repository the journal imports from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub full_name: String,
}

impl From<&GithubRepo> for RepoRef {
    fn from(repo: &GithubRepo) -> Self {
        Self {
            owner: repo.owner.login.clone(),
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
        }
    }
}

#[async_trait]
pub trait GithubApi: Send + Sync {
    /// The account the token belongs to.
    async fn viewer(&self) -> Result<GithubUser>;

    /// One page (1-based) of public repos the viewer owns.
    async fn owned_public_repos(&self, page: u32, per_page: u32) -> Result<Vec<GithubRepo>>;

    /// Most recently updated closed pull requests, merged or not.
    async fn closed_pulls(&self, repo: &RepoRef, per_page: u32) -> Result<Vec<GithubPull>>;
}

pub struct HttpGithub {
    client: reqwest::Client,
    token: String,
}

impl HttpGithub {
    pub fn new(client: reqwest::Client, config: &GithubConfig) -> Self {
        Self {
            client,
            token: config.token.clone(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }
}

#[async_trait]
impl GithubApi for HttpGithub {
    async fn viewer(&self) -> Result<GithubUser> {
        let response = self.get("/user").send().await?;
        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn owned_public_repos(&self, page: u32, per_page: u32) -> Result<Vec<GithubRepo>> {
        let response = self
            .get("/user/repos")
            .query(&[
                ("visibility", "public".to_string()),
                ("affiliation", "owner".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn closed_pulls(&self, repo: &RepoRef, per_page: u32) -> Result<Vec<GithubPull>> {
        let response = self
            .get(&format!("/repos/{}/{}/pulls", repo.owner, repo.name))
            .query(&[
                ("state", "closed".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await?;

        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }
}
