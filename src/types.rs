use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::collections::HashSet;

/// Language shown for repositories the API reports none for.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Pull requests not updated within this many days are flagged as stale.
pub const STALE_AFTER_DAYS: i64 = 30;

/// One page of a listing endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

#[cfg(test)]
impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_next: false,
        }
    }

    pub fn more(items: Vec<T>) -> Self {
        Self {
            items,
            has_next: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub language: Option<String>,
}

impl Repository {
    pub fn display_language(&self) -> &str {
        self.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE)
    }
}

/// Pull request as it appears in a listing; only the number is needed to
/// fetch the full record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrSummary {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// `None` while GitHub is still computing mergeability.
    pub mergeable: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

/// A pull request with its display flags resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedPullRequest {
    pub number: u64,
    pub title: String,
    pub mergeable: bool,
    pub stale: bool,
}

impl AnnotatedPullRequest {
    pub fn new(pr: PullRequest, threshold: StalenessThreshold) -> Self {
        Self {
            mergeable: pr.mergeable.unwrap_or(false),
            stale: threshold.is_stale(pr.updated_at),
            number: pr.number,
            title: pr.title,
        }
    }
}

/// Cut-off before which a pull request counts as stale: the start of the
/// current UTC day minus [`STALE_AFTER_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessThreshold(DateTime<Utc>);

impl StalenessThreshold {
    pub fn at(now: DateTime<Utc>) -> Self {
        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self(start_of_day - Duration::days(STALE_AFTER_DAYS))
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_stale(&self, updated_at: DateTime<Utc>) -> bool {
        updated_at < self.0
    }
}

/// Repository names to restrict a run to. Empty admits everything.
#[derive(Debug, Clone, Default)]
pub struct Whitelist(HashSet<String>);

impl Whitelist {
    pub fn admits(&self, name: &str) -> bool {
        self.0.is_empty() || self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Whitelist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// What the lister does with an error reported by any stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the whole run on the first error.
    #[default]
    Abort,
    /// Log the error, count it, and keep going.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub repositories_seen: usize,
    pub repositories_listed: usize,
    pub pull_requests: usize,
    pub errors: usize,
}
