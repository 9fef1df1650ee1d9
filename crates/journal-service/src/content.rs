//! Classification of post content: links, kinds, and plain text from remote
//! HTML.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::PostKind;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://[^\s/$.?#].[^\s]*").unwrap());

static LINE_BREAK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The URL in `text` when there is exactly one, otherwise `None`.
pub fn extract_single_url(text: &str) -> Option<String> {
    let mut matches = URL_RE.find_iter(text);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.as_str().to_string())
}

/// Byte ranges of every URL in `text`, with the URL itself.
pub fn url_spans(text: &str) -> Vec<(usize, usize, &str)> {
    URL_RE
        .find_iter(text)
        .map(|found| (found.start(), found.end(), found.as_str()))
        .collect()
}

/// Photo wins over link, link wins over text.
pub fn classify_kind(has_image: bool, has_single_link: bool) -> PostKind {
    if has_image {
        PostKind::Photo
    } else if has_single_link {
        PostKind::Link
    } else {
        PostKind::Text
    }
}

/// Reduce status HTML to a single line of plain text.
///
/// Tags are removed without inserting spaces so that links Mastodon splits
/// across several `<span>`s stay intact; paragraph and line breaks become
/// spaces.
pub fn strip_html(html: &str) -> String {
    let text = LINE_BREAK_TAG_RE.replace_all(html, " ");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_url() {
        assert_eq!(
            extract_single_url("read this https://example.com/post?id=1 today").as_deref(),
            Some("https://example.com/post?id=1")
        );
        assert_eq!(extract_single_url("no links here"), None);
        assert_eq!(
            extract_single_url("https://a.example and http://b.example"),
            None
        );
        assert_eq!(extract_single_url(""), None);
    }

    #[test]
    fn test_extract_single_url_is_case_insensitive() {
        assert_eq!(
            extract_single_url("HTTPS://Example.com/X").as_deref(),
            Some("HTTPS://Example.com/X")
        );
    }

    #[test]
    fn test_url_spans() {
        let text = "a https://one.example b http://two.example/x";
        assert_eq!(
            url_spans(text),
            vec![
                (2, 21, "https://one.example"),
                (24, 44, "http://two.example/x"),
            ]
        );
        assert!(url_spans("nothing").is_empty());
    }

    #[test]
    fn test_classify_kind() {
        assert_eq!(classify_kind(true, true), PostKind::Photo);
        assert_eq!(classify_kind(true, false), PostKind::Photo);
        assert_eq!(classify_kind(false, true), PostKind::Link);
        assert_eq!(classify_kind(false, false), PostKind::Text);
    }

    #[test]
    fn test_strip_html_keeps_split_links_whole() {
        let html = r#"<p>new post <a href="https://example.com/a"><span class="invisible">https://</span><span>example.com/a</span></a></p>"#;
        assert_eq!(strip_html(html), "new post https://example.com/a");
    }

    #[test]
    fn test_strip_html_separates_paragraphs() {
        assert_eq!(
            strip_html("<p>first</p><p>second<br/>third</p>"),
            "first second third"
        );
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        assert_eq!(
            strip_html("<p>fish &amp; chips &lt;3 it&#39;s &quot;fine&quot;</p>"),
            "fish & chips <3 it's \"fine\""
        );
    }

    #[test]
    fn test_strip_html_of_empty_markup_is_empty() {
        assert_eq!(strip_html("<p></p>"), "");
    }
}
