use std::collections::HashSet;

use axum::http::StatusCode;
use journal_service::content::{classify_kind, extract_single_url};
use journal_service::models::PostKind;
use journal_service::search::{SearchFilter, Token, tokenize};
use journal_service::text::{TAG_SEPARATOR, budget_with_tag, grapheme_length};
use proptest::prelude::*;
use serde_json::{Value, json};

mod common;

// Lines mixing ASCII, accented letters and multi-codepoint emoji
prop_compose! {
    fn arb_line()(
        words in prop::collection::vec(
            prop_oneof![
                "[a-zA-Z0-9]{1,12}",
                Just("café".to_string()),
                Just("e\u{301}".to_string()),
                Just("👨‍👩‍👧".to_string()),
                Just("🇫🇷".to_string()),
            ],
            1..8
        )
    ) -> String {
        words.join(" ")
    }
}

prop_compose! {
    fn arb_core()(lines in prop::collection::vec(arb_line(), 0..12)) -> String {
        lines.join("\n")
    }
}

prop_compose! {
    fn arb_tag_line()(tags in prop::collection::vec("[a-z]{1,10}", 1..4)) -> String {
        tags.iter().map(|tag| format!("#{tag}")).collect::<Vec<_>>().join(" ")
    }
}

proptest! {
    #[test]
    fn budget_fits_limit(core in arb_core(), tag in arb_tag_line(), limit in 0usize..600) {
        let body = budget_with_tag(&core, &tag, limit);
        prop_assert!(grapheme_length(&body) <= limit);
    }

    #[test]
    fn budget_keeps_tag_and_whole_leading_lines(
        core in arb_core(),
        tag in arb_tag_line(),
        limit in 0usize..600,
    ) {
        let body = budget_with_tag(&core, &tag, limit);
        if body.is_empty() {
            prop_assert!(grapheme_length(&tag) > limit);
            return Ok(());
        }

        prop_assert!(body.ends_with(&tag));
        if let Some(kept) = body.strip_suffix(&format!("{TAG_SEPARATOR}{tag}")) {
            // Whatever survives is a prefix of the original made of whole lines
            let kept_lines: Vec<&str> = kept.lines().collect();
            let core_lines: Vec<&str> = core.trim_end().lines().collect();
            prop_assert!(kept_lines.len() <= core_lines.len());
            let last = kept_lines.len() - 1;
            for (idx, line) in kept_lines.iter().enumerate() {
                if idx == last {
                    prop_assert_eq!(*line, core_lines[idx].trim_end());
                } else {
                    prop_assert_eq!(*line, core_lines[idx]);
                }
            }
        } else {
            prop_assert_eq!(body, tag);
        }
    }

    #[test]
    fn budget_is_identity_when_everything_fits(core in arb_core(), tag in arb_tag_line()) {
        let core = core.trim_end();
        prop_assume!(!core.is_empty());
        let body = budget_with_tag(core, &tag, usize::MAX);
        prop_assert_eq!(body, format!("{core}{TAG_SEPARATOR}{tag}"));
    }

    #[test]
    fn classification_follows_content(text in "[a-z ]{0,40}", has_image in prop::bool::ANY, links in 0usize..3) {
        let urls: Vec<String> = (0..links).map(|i| format!("https://example.com/{i}")).collect();
        let body = format!("{text} {}", urls.join(" "));

        let link = extract_single_url(&body);
        prop_assert_eq!(link.is_some(), links == 1);

        let kind = classify_kind(has_image, link.is_some());
        let expected = match (has_image, links) {
            (true, _) => PostKind::Photo,
            (false, 1) => PostKind::Link,
            _ => PostKind::Text,
        };
        prop_assert_eq!(kind, expected);
    }

    #[test]
    fn search_tags_are_normalized(query in "[ #:a-zA-Z]{0,60}") {
        for token in tokenize(&query) {
            if let Token::Tag(tag) = token {
                prop_assert!(!tag.is_empty());
                prop_assert!(!tag.starts_with('#'));
                prop_assert_eq!(tag.clone(), tag.to_lowercase());
            }
        }

        let filter = SearchFilter::parse(&query);
        let unique: HashSet<&String> = filter.tags.iter().collect();
        prop_assert_eq!(unique.len(), filter.tags.len());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use crate::common::server_utils::{create_test_server, session_cookie};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn composer_accepts_exactly_what_fits(
            length in 1usize..1100,
            mastodon in prop::bool::ANY,
            bluesky in prop::bool::ANY,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (server, _db) = create_test_server();
                let cookie = session_cookie(&server).await;

                let mut targets = Vec::new();
                let mut limit = 1000;
                if mastodon {
                    targets.push("mastodon");
                    limit = limit.min(500);
                }
                if bluesky {
                    targets.push("bluesky");
                    limit = limit.min(300);
                }

                // One grapheme per repetition, several code points each
                let body = "👍🏽".repeat(length);
                let response = server
                    .post("/api/v1/posts")
                    .add_cookie(cookie)
                    .json(&json!({ "body": body, "targets": targets }))
                    .await;

                if length <= limit {
                    prop_assert_eq!(response.status_code(), StatusCode::OK);
                } else {
                    prop_assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
                    let error: Value = response.json();
                    prop_assert_eq!(
                        error["error"].as_str().unwrap(),
                        format!("Body is too long ({length} characters, limit is {limit})")
                    );
                }
                Ok(())
            }).expect("Async proptest should not fail")
        }
    }
}
