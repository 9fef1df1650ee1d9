//! Deterministic external ids.
//!
//! Together with the post source, an external id is the only thing that
//! keeps a rerun of a sync from importing the same item twice, so none of
//! these may depend on when they are computed other than through the date a
//! caller passes in.

use chrono::NaiveDate;

/// `pr:{owner}/{repo}#{number}`, one row per merged pull request forever.
pub fn pull_request(repo_full_name: &str, number: u64) -> String {
    format!("pr:{repo_full_name}#{number}")
}

/// `{prefix}-{qualifier}-{YYYY-MM-DD}`, at most one digest per window a day.
pub fn daily_digest(prefix: &str, qualifier: &str, day: NaiveDate) -> String {
    format!("{prefix}-{qualifier}-{}", day.format("%Y-%m-%d"))
}

pub fn github_weekly(window_days: i64, day: NaiveDate) -> String {
    daily_digest("github-weekly", &window_days.to_string(), day)
}

pub fn spotify_top(time_range: &str, day: NaiveDate) -> String {
    daily_digest("spotify-top", time_range, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_pull_request_id() {
        assert_eq!(pull_request("owner/repo", 42), "pr:owner/repo#42");
    }

    #[test]
    fn test_digest_ids_are_zero_padded_dates() {
        assert_eq!(github_weekly(7, day()), "github-weekly-7-2026-03-07");
        assert_eq!(
            spotify_top("short_term", day()),
            "spotify-top-short_term-2026-03-07"
        );
    }

    #[test]
    fn test_ids_are_stable_across_calls() {
        assert_eq!(pull_request("a/b", 1), pull_request("a/b", 1));
        assert_eq!(github_weekly(14, day()), github_weekly(14, day()));
        assert_ne!(github_weekly(7, day()), github_weekly(14, day()));
    }
}
