//! Feed search syntax.
//!
//! `tag:foo`, `#foo` and `:tag foo` filter by hashtag, `type:photos` by kind,
//! `source:mastodon` by provenance. Everything else is matched as free text.

use crate::models::{PostKind, PostSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Tag(String),
    Kind(PostKind),
    Source(PostSource),
    Term(String),
}

/// Structured form of a search box query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// lowercase, without the leading `#`; all must match
    pub tags: Vec<String>,
    pub kind: Option<PostKind>,
    pub source: Option<PostSource>,
    /// all must appear in the body
    pub terms: Vec<String>,
}

impl SearchFilter {
    pub fn parse(query: &str) -> Self {
        let mut filter = SearchFilter::default();
        for token in tokenize(query) {
            match token {
                Token::Tag(tag) => {
                    if !filter.tags.contains(&tag) {
                        filter.tags.push(tag);
                    }
                }
                Token::Kind(kind) => filter.kind = Some(kind),
                Token::Source(source) => filter.source = Some(source),
                Token::Term(term) => filter.terms.push(term),
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.kind.is_none() && self.source.is_none() && self.terms.is_empty()
    }
}

pub fn tokenize(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut words = query.split_whitespace();

    while let Some(word) = words.next() {
        let lower = word.to_lowercase();

        if lower == ":tag" {
            if let Some(tag) = words.next().and_then(normalize_tag) {
                tokens.push(Token::Tag(tag));
            }
            continue;
        }

        if let Some(value) = lower.strip_prefix("tag:") {
            if let Some(tag) = normalize_tag(value) {
                tokens.push(Token::Tag(tag));
            }
            continue;
        }

        if lower.starts_with('#') {
            if let Some(tag) = normalize_tag(&lower) {
                tokens.push(Token::Tag(tag));
            }
            continue;
        }

        if let Some(kind) = lower.strip_prefix("type:").and_then(parse_kind) {
            tokens.push(Token::Kind(kind));
            continue;
        }

        if let Some(source) = lower
            .strip_prefix("source:")
            .and_then(|value| value.parse::<PostSource>().ok())
        {
            tokens.push(Token::Source(source));
            continue;
        }

        tokens.push(Token::Term(word.to_string()));
    }

    tokens
}

fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim_start_matches('#').to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

fn parse_kind(value: &str) -> Option<PostKind> {
    match value {
        "text" | "note" | "notes" => Some(PostKind::Text),
        "photo" | "photos" | "image" | "images" => Some(PostKind::Photo),
        "link" | "links" => Some(PostKind::Link),
        _ => None,
    }
}
