use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{classify_kind, extract_single_url};
use crate::text::{BLUESKY_LIMIT, MASTODON_LIMIT};

#[derive(Error, Debug)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Photo,
    Link,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Text => "text",
            PostKind::Photo => "photo",
            PostKind::Link => "link",
        }
    }
}

impl FromStr for PostKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(PostKind::Text),
            "photo" => Ok(PostKind::Photo),
            "link" => Ok(PostKind::Link),
            other => Err(UnknownVariant {
                kind: "post kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Where a post came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PostSource {
    Local,
    Mastodon,
    Github,
    Spotify,
}

impl PostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSource::Local => "local",
            PostSource::Mastodon => "mastodon",
            PostSource::Github => "github",
            PostSource::Spotify => "spotify",
        }
    }
}

impl FromStr for PostSource {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(PostSource::Local),
            "mastodon" => Ok(PostSource::Mastodon),
            "github" => Ok(PostSource::Github),
            "spotify" => Ok(PostSource::Spotify),
            other => Err(UnknownVariant {
                kind: "post source",
                value: other.to_string(),
            }),
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql<Text, Sqlite> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.as_str());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $ty {
            fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let value = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
                Ok(value.parse()?)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum_sql!(PostKind);
text_enum_sql!(PostSource);

/// A platform a post can be cross-posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Mastodon,
    Bluesky,
}

impl Target {
    pub fn post_limit(&self) -> usize {
        match self {
            Target::Mastodon => MASTODON_LIMIT,
            Target::Bluesky => BLUESKY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Post {
    pub id: i32,
    pub created_at: NaiveDateTime,
    pub kind: PostKind,
    pub body: String,
    pub image_data: Option<String>,
    pub source: PostSource,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub mastodon_url: Option<String>,
    pub bluesky_uri: Option<String>,
    pub source_deleted: bool,
    pub link_url: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub created_at: NaiveDateTime,
    pub kind: PostKind,
    pub body: String,
    pub image_data: Option<String>,
    pub source: PostSource,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub mastodon_url: Option<String>,
    pub bluesky_uri: Option<String>,
    pub source_deleted: bool,
    pub link_url: Option<String>,
}

impl NewPost {
    /// A post written in the composer. Kind and link are derived from the
    /// content.
    pub fn local(body: String, image_data: Option<String>) -> Self {
        let link_url = extract_single_url(&body);
        let kind = classify_kind(image_data.is_some(), link_url.is_some());

        NewPost {
            created_at: Utc::now().naive_utc(),
            kind,
            body,
            image_data,
            source: PostSource::Local,
            external_id: None,
            external_url: None,
            mastodon_url: None,
            bluesky_uri: None,
            source_deleted: false,
            link_url,
        }
    }

    /// A post that mirrors or summarizes a remote item.
    pub fn imported(
        source: PostSource,
        external_id: String,
        kind: PostKind,
        body: String,
    ) -> Self {
        NewPost {
            created_at: Utc::now().naive_utc(),
            kind,
            body,
            image_data: None,
            source,
            external_id: Some(external_id),
            external_url: None,
            mastodon_url: None,
            bluesky_uri: None,
            source_deleted: false,
            link_url: None,
        }
    }

    pub fn created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn image_data(mut self, image_data: Option<String>) -> Self {
        self.image_data = image_data;
        self
    }

    pub fn link_url(mut self, link_url: Option<String>) -> Self {
        self.link_url = link_url;
        self
    }

    pub fn mastodon_url(mut self, url: Option<String>) -> Self {
        self.external_url = url.clone();
        self.mastodon_url = url;
        self
    }
}

/// Fields a reconciler rewrites when a remote item it already mirrors is seen
/// again. Applying it always makes the row visible.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(treat_none_as_null = true)]
pub struct RemoteRefresh {
    pub kind: PostKind,
    pub body: String,
    pub image_data: Option<String>,
    pub link_url: Option<String>,
    pub mastodon_url: Option<String>,
    pub source_deleted: bool,
}
