//! Character budgeting for generated post bodies.
//!
//! Every limit here is counted in user-perceived characters (extended
//! grapheme clusters), which is how Mastodon and Bluesky count them too.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::Target;

/// Ceiling for posts that stay in the journal.
pub const JOURNAL_LIMIT: usize = 1000;
pub const MASTODON_LIMIT: usize = 500;
pub const BLUESKY_LIMIT: usize = 300;

/// Placed between the budgeted body and its trailing tag line.
pub const TAG_SEPARATOR: &str = "\n\n";

pub fn grapheme_length(value: &str) -> usize {
    value.graphemes(true).count()
}

/// Limit a composer post must respect given where it is going to be shared.
pub fn effective_post_limit(targets: &[Target]) -> usize {
    targets
        .iter()
        .map(Target::post_limit)
        .fold(JOURNAL_LIMIT, usize::min)
}

/// Fit `core` plus a mandatory `tag` line into `limit` graphemes.
///
/// Lines are dropped from the end of `core` until `core + "\n\n" + tag` fits.
/// A line is never cut in the middle. When no line survives the result is the
/// tag line on its own, and when even the tag is too long the result is empty.
pub fn budget_with_tag(core: &str, tag: &str, limit: usize) -> String {
    let tag_len = grapheme_length(tag);
    let separator_len = grapheme_length(TAG_SEPARATOR);

    let mut core = core.trim_end();
    while !core.is_empty() && grapheme_length(core) + separator_len + tag_len > limit {
        core = match core.rfind('\n') {
            Some(idx) => core[..idx].trim_end(),
            None => "",
        };
    }

    if !core.is_empty() {
        return format!("{core}{TAG_SEPARATOR}{tag}");
    }

    if tag_len <= limit {
        tag.to_string()
    } else {
        String::new()
    }
}
