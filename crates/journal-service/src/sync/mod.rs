//! Reconcilers that converge the post store with a remote source.
//!
//! Each reconciler runs to completion inside one request, writes one row at a
//! time, and reports what it did in a summary. A failing remote call stops
//! the run; whatever was already written stays written and the failure is
//! reported in the summary's `error`. Repository failures are returned as
//! errors.

mod github;
pub mod github_pulls;
pub mod github_weekly;
pub mod mastodon;
pub mod spotify;

pub use github_pulls::{PullImportOptions, PullImportSummary, import_merged_pulls};
pub use github_weekly::{WeeklyDigestOptions, WeeklyDigestSummary, post_weekly_digest};
pub use mastodon::{MirrorOptions, MirrorSummary, mirror_mastodon};
pub use spotify::{SnapshotOptions, SnapshotSummary, post_listening_snapshot};

/// Merged pull requests are looked up this many days back unless asked
/// otherwise.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Message reported when a reconciler runs without its platform configured.
pub(crate) fn not_configured(service: &str) -> String {
    format!("{service} not configured")
}
