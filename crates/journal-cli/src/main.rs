use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use url::Url;

const SESSION_COOKIE: &str = "journal_session";

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Read the journal, post to it, and trigger its sync jobs")]
struct Cli {
    /// Base URL for the journal service
    #[arg(long, env = "JOURNAL_URL", default_value = "http://localhost:3000")]
    service_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a page of the feed
    Feed {
        /// Search query, e.g. "tag:rust type:links"
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
        /// Only posts older than this id
        #[arg(short, long)]
        cursor: Option<i32>,
    },
    /// Write a post, optionally sharing it
    Post {
        body: String,
        /// Share to this platform too; repeatable
        #[arg(short, long = "target", value_enum)]
        targets: Vec<Target>,
        #[arg(long, env = "JOURNAL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Run one of the sync jobs
    Sync {
        #[command(subcommand)]
        job: Job,
        /// Shared key configured as CRON_SECRET on the service
        #[arg(long, global = true, env = "JOURNAL_CRON_SECRET", hide_env_values = true)]
        key: Option<String>,
    },
}

#[derive(Subcommand)]
enum Job {
    /// Mirror own Mastodon statuses
    Mastodon {
        #[arg(long)]
        max: Option<u32>,
    },
    /// Import merged pull requests
    Github {
        #[arg(long)]
        window_days: Option<u32>,
    },
    /// Post the merged pull request digest
    GithubWeekly {
        #[arg(long)]
        window_days: Option<u32>,
    },
    /// Post the top artists and tracks snapshot
    Spotify {
        #[arg(long, value_enum)]
        time_range: Option<TimeRange>,
        #[arg(long)]
        artists: Option<u32>,
        #[arg(long)]
        tracks: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum Target {
    Mastodon,
    Bluesky,
}

#[derive(Clone, Copy, ValueEnum)]
enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    fn as_param(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

#[derive(Serialize)]
struct NewPost {
    body: String,
    targets: Vec<Target>,
}

#[derive(Serialize)]
struct Login<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedPage {
    posts: Vec<FeedPost>,
    next_cursor: Option<i32>,
}

#[derive(Deserialize)]
struct FeedPost {
    id: i32,
    created_at: String,
    kind: String,
    source: String,
    body: String,
    external_url: Option<String>,
}

#[derive(Deserialize)]
struct CreatedPost {
    post: FeedPost,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = Url::parse(&cli.service_url)?;

    match cli.command {
        Commands::Feed {
            query,
            limit,
            cursor,
        } => show_feed(&client, &base, query, limit, cursor).await?,
        Commands::Post {
            body,
            targets,
            password,
        } => create_post(&client, &base, body, targets, &password).await?,
        Commands::Sync { job, key } => run_job(&client, &base, job, key).await?,
    }

    Ok(())
}

async fn show_feed(
    client: &Client,
    base: &Url,
    query: Option<String>,
    limit: Option<u32>,
    cursor: Option<i32>,
) -> Result<(), Box<dyn Error>> {
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(query) = query {
        params.push(("q", query));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor.to_string()));
    }

    let response = client
        .get(base.join("api/v1/posts")?)
        .query(&params)
        .send()
        .await?;
    let Some(response) = check(response).await? else {
        return Ok(());
    };

    let page: FeedPage = response.json().await?;
    for post in &page.posts {
        print_post(post);
    }
    if let Some(next) = page.next_cursor {
        println!("more: --cursor {next}");
    }

    Ok(())
}

async fn create_post(
    client: &Client,
    base: &Url,
    body: String,
    targets: Vec<Target>,
    password: &str,
) -> Result<(), Box<dyn Error>> {
    let Some(session) = login(client, base, password).await? else {
        return Ok(());
    };

    let response = client
        .post(base.join("api/v1/posts")?)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
        .json(&NewPost { body, targets })
        .send()
        .await?;
    let Some(response) = check(response).await? else {
        return Ok(());
    };

    let created: CreatedPost = response.json().await?;
    println!("Post created with ID: {}", created.post.id);
    if let Some(url) = created.post.external_url {
        println!("Shared at: {url}");
    }

    Ok(())
}

/// Log in and return the session cookie value.
async fn login(client: &Client, base: &Url, password: &str) -> Result<Option<String>, Box<dyn Error>> {
    let response = client
        .post(base.join("api/v1/login")?)
        .json(&Login { password })
        .send()
        .await?;
    let Some(response) = check(response).await? else {
        return Ok(None);
    };

    let session = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.trim().strip_prefix(&format!("{SESSION_COOKIE}=")))
                .map(str::to_string)
        });

    match session {
        Some(session) => Ok(Some(session)),
        None => Err("login succeeded but no session cookie was returned".into()),
    }
}

async fn run_job(client: &Client, base: &Url, job: Job, key: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(key) = key {
        params.push(("key", key));
    }

    let path = match job {
        Job::Mastodon { max } => {
            if let Some(max) = max {
                params.push(("max", max.to_string()));
            }
            "api/v1/sync/mastodon"
        }
        Job::Github { window_days } => {
            if let Some(days) = window_days {
                params.push(("windowDays", days.to_string()));
            }
            "api/v1/integrations/github-sync"
        }
        Job::GithubWeekly { window_days } => {
            if let Some(days) = window_days {
                params.push(("windowDays", days.to_string()));
            }
            "api/v1/integrations/github-weekly-sync"
        }
        Job::Spotify {
            time_range,
            artists,
            tracks,
        } => {
            if let Some(range) = time_range {
                params.push(("timeRange", range.as_param().to_string()));
            }
            if let Some(artists) = artists {
                params.push(("artists", artists.to_string()));
            }
            if let Some(tracks) = tracks {
                params.push(("tracks", tracks.to_string()));
            }
            "api/v1/integrations/spotify-sync"
        }
    };

    let request: RequestBuilder = client.get(base.join(path)?).query(&params);
    let Some(response) = check(request.send().await?).await? else {
        return Ok(());
    };

    let summary: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Pass successful responses on; report anything else and yield `None`.
async fn check(response: Response) -> Result<Option<Response>, Box<dyn Error>> {
    if response.status().is_success() {
        return Ok(Some(response));
    }

    eprintln!("Request failed: {}", response.status());
    eprintln!("Response: {}", response.text().await?);
    Ok(None)
}

fn print_post(post: &FeedPost) {
    println!("#{} [{}/{}] {}", post.id, post.source, post.kind, post.created_at);
    for line in post.body.lines() {
        println!("    {line}");
    }
    if let Some(url) = &post.external_url {
        println!("    -> {url}");
    }
    println!();
}
