//! Paginated listings as streaming [`Feed`]s.
//!
//! A listing is walked page by page on its own task. Items go out one at a
//! time on the feed's item channel, failures on its error channel. A failed
//! page is reported and skipped rather than ending the listing.
//!
//! Listings whose entries need a second call for the full record
//! (pull requests) fetch every entry of a page concurrently and wait for
//! all of them before moving on to the next page.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{GhprsError, Result};
use crate::feed::{deliver, Feed};
use crate::forge::Forge;
use crate::types::{Page, PrSummary, PullRequest, Repository};

/// A listing gives up after this many failed pages in a row.
pub const MAX_CONSECUTIVE_PAGE_ERRORS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageCursor {
    page: u32,
    more: bool,
}

impl PageCursor {
    fn start() -> Self {
        Self {
            page: 1,
            more: true,
        }
    }

    fn advance(&mut self, has_next: bool) {
        self.more = has_next;
        if has_next {
            self.page += 1;
        }
    }
}

/// Streams every item of a paginated listing. `list_page` is called with
/// page numbers starting at 1.
pub fn paged<T, L, Fut>(list_page: L) -> Feed<T>
where
    T: Send + 'static,
    L: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Page<T>>> + Send + 'static,
{
    Feed::spawn(move |items, errors, cancel| async move {
        drive_pages(list_page, &errors, &cancel, |page_items| {
            let items = items.clone();
            let cancel = cancel.clone();
            async move {
                for item in page_items {
                    if !deliver(&items, item, &cancel).await {
                        return false;
                    }
                }
                true
            }
        })
        .await;
    })
}

/// Streams the detail record of every entry of a paginated listing.
///
/// Details within a page arrive in completion order. The next page is only
/// listed once every detail fetch of the current one has been delivered.
pub fn paged_with_details<S, D, L, LFut, F, FFut>(list_page: L, fetch_detail: F) -> Feed<D>
where
    S: Send + 'static,
    D: Send + 'static,
    L: FnMut(u32) -> LFut + Send + 'static,
    LFut: Future<Output = Result<Page<S>>> + Send + 'static,
    F: Fn(S) -> FFut + Clone + Send + Sync + 'static,
    FFut: Future<Output = Result<D>> + Send + 'static,
{
    Feed::spawn(move |details, errors, cancel| async move {
        drive_pages(list_page, &errors, &cancel, |entries| {
            fetch_all(
                entries,
                fetch_detail.clone(),
                details.clone(),
                errors.clone(),
                cancel.clone(),
            )
        })
        .await;
    })
}

/// Fetches the detail of every id concurrently, one task each. Results are
/// sent as they complete; a failure does not affect its siblings.
///
/// Returns once every task has finished. `false` means the consumer is gone.
pub async fn fetch_all<I, D, F, Fut>(
    ids: Vec<I>,
    fetch_detail: F,
    details: mpsc::Sender<D>,
    errors: mpsc::Sender<GhprsError>,
    cancel: CancellationToken,
) -> bool
where
    I: Send + 'static,
    D: Send + 'static,
    F: Fn(I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<D>> + Send + 'static,
{
    let mut fetches = JoinSet::new();

    for id in ids {
        let fetch_detail = fetch_detail.clone();
        let details = details.clone();
        let errors = errors.clone();
        let cancel = cancel.clone();

        fetches.spawn(async move {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return false,
                fetched = fetch_detail(id) => fetched,
            };
            match fetched {
                Ok(detail) => deliver(&details, detail, &cancel).await,
                Err(err) => {
                    debug!(error = %err, "detail fetch failed");
                    deliver(&errors, err, &cancel).await
                }
            }
        });
    }

    let mut open = true;
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok(delivered) => open &= delivered,
            Err(err) => {
                open &= deliver(&errors, GhprsError::Task(err.to_string()), &cancel).await;
            }
        }
    }
    open
}

/// Walks pages until one reports no successor, handing each page's items to
/// `emit`. Stops early when `emit` reports the consumer gone.
async fn drive_pages<S, L, LFut, E, EFut>(
    mut list_page: L,
    errors: &mpsc::Sender<GhprsError>,
    cancel: &CancellationToken,
    mut emit: E,
) where
    L: FnMut(u32) -> LFut,
    LFut: Future<Output = Result<Page<S>>>,
    E: FnMut(Vec<S>) -> EFut,
    EFut: Future<Output = bool>,
{
    let mut cursor = PageCursor::start();
    let mut failures = 0;

    while cursor.more {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = list_page(cursor.page) => fetched,
        };

        match fetched {
            Ok(Page { items, has_next }) => {
                failures = 0;
                debug!(page = cursor.page, items = items.len(), has_next, "fetched page");
                if !emit(items).await {
                    return;
                }
                cursor.advance(has_next);
            }
            Err(err) => {
                failures += 1;
                debug!(page = cursor.page, error = %err, "page fetch failed");
                if !deliver(errors, err, cancel).await {
                    return;
                }
                if failures >= MAX_CONSECUTIVE_PAGE_ERRORS {
                    warn!(failures, "giving up on listing");
                    return;
                }
                cursor.advance(true);
            }
        }
    }
}

/// Every repository of `org`.
pub fn repositories(forge: Arc<dyn Forge>, org: String) -> Feed<Repository> {
    paged(move |page| {
        let forge = Arc::clone(&forge);
        let org = org.clone();
        async move { forge.list_repos(&org, page).await }
    })
}

/// The full record of every open pull request of `org/repo`.
pub fn pull_requests(forge: Arc<dyn Forge>, org: String, repo: String) -> Feed<PullRequest> {
    let list_page = {
        let forge = Arc::clone(&forge);
        let org = org.clone();
        let repo = repo.clone();
        move |page: u32| {
            let forge = Arc::clone(&forge);
            let org = org.clone();
            let repo = repo.clone();
            async move { forge.list_prs(&org, &repo, page).await }
        }
    };

    paged_with_details(list_page, move |summary: PrSummary| {
        let forge = Arc::clone(&forge);
        let org = org.clone();
        let repo = repo.clone();
        async move { forge.get_pr(&org, &repo, summary.number).await }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::event::Event;
    use crate::forge::mock::{pr, repo, MockForge, Scripted};

    async fn collect<T: Send + 'static>(mut feed: Feed<T>) -> (Vec<T>, Vec<String>) {
        let mut items = Vec::new();
        let mut errors = Vec::new();
        loop {
            match feed.next().await {
                Event::Item(item) => items.push(item),
                Event::Error(err) => errors.push(err.to_string()),
                Event::Done => return (items, errors),
            }
        }
    }

    fn names(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn cursor_stops_on_last_page() {
        let mut cursor = PageCursor::start();
        assert_eq!(cursor.page, 1);
        cursor.advance(true);
        assert_eq!(cursor, PageCursor { page: 2, more: true });
        cursor.advance(false);
        assert!(!cursor.more);
        assert_eq!(cursor.page, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn emits_every_page_in_order_despite_latency() {
        let forge = MockForge::new()
            .repos(
                1,
                Scripted::page(Page::more(vec![repo("a", None), repo("b", None)])).delayed(40),
            )
            .repos(2, Scripted::page(Page::more(vec![repo("c", None)])))
            .repos(
                3,
                Scripted::page(Page::last(vec![repo("d", None), repo("e", None)])).delayed(15),
            );
        let forge = Arc::new(forge);

        let (repos, errors) = collect(repositories(forge.clone(), "acme".to_string())).await;

        assert_eq!(names(&repos), vec!["a", "b", "c", "d", "e"]);
        assert!(errors.is_empty());
        assert_eq!(forge.calls(), vec!["repos 1", "repos 2", "repos 3"]);
    }

    #[tokio::test]
    async fn empty_listing_closes_without_items() {
        let forge = Arc::new(MockForge::new());

        let (repos, errors) = collect(repositories(forge.clone(), "acme".to_string())).await;

        assert!(repos.is_empty());
        assert!(errors.is_empty());
        assert_eq!(forge.calls(), vec!["repos 1"]);
    }

    #[tokio::test]
    async fn failed_page_is_reported_and_skipped() {
        let forge = MockForge::new()
            .repos(1, Scripted::page(Page::more(vec![repo("a", None)])))
            .repos(2, Scripted::failure("page two exploded"))
            .repos(3, Scripted::page(Page::last(vec![repo("c", None)])));
        let forge = Arc::new(forge);

        let (repos, errors) = collect(repositories(forge.clone(), "acme".to_string())).await;

        assert_eq!(names(&repos), vec!["a", "c"]);
        assert_eq!(errors, vec!["API error: page two exploded".to_string()]);
        assert_eq!(forge.calls(), vec!["repos 1", "repos 2", "repos 3"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_page_holds_the_listing_until_its_error_is_taken() {
        let forge = MockForge::new()
            .repos(1, Scripted::page(Page::more(vec![repo("a", None)])))
            .repos(2, Scripted::failure("page two exploded"))
            .repos(3, Scripted::page(Page::last(vec![repo("c", None)])));
        let forge = Arc::new(forge);
        let mut feed = repositories(forge.clone(), "acme".to_string());

        assert!(matches!(feed.next().await, Event::Item(ref r) if r.name == "a"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(forge.calls(), vec!["repos 1", "repos 2"]);

        assert!(matches!(feed.next().await, Event::Error(_)));
        assert!(matches!(feed.next().await, Event::Item(ref r) if r.name == "c"));
    }

    #[tokio::test]
    async fn gives_up_after_consecutive_failures() {
        let forge = MockForge::new()
            .repos(1, Scripted::failure("down"))
            .repos(2, Scripted::failure("down"))
            .repos(3, Scripted::failure("down"))
            .repos(4, Scripted::page(Page::last(vec![repo("never", None)])));
        let forge = Arc::new(forge);

        let (repos, errors) = collect(repositories(forge.clone(), "acme".to_string())).await;

        assert!(repos.is_empty());
        assert_eq!(errors.len(), MAX_CONSECUTIVE_PAGE_ERRORS as usize);
        assert_eq!(forge.calls(), vec!["repos 1", "repos 2", "repos 3"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_detail_does_not_block_siblings() {
        let forge = MockForge::new()
            .prs(
                "web",
                1,
                Scripted::page(Page::more(vec![
                    PrSummary { number: 3 },
                    PrSummary { number: 2 },
                    PrSummary { number: 1 },
                ])),
            )
            .prs("web", 2, Scripted::page(Page::last(vec![PrSummary { number: 4 }])))
            .detail("web", 1, Ok(pr(1, "slow", Some(true), 0)), Some(Duration::from_millis(50)))
            .detail("web", 2, Err("detail two exploded".to_string()), None)
            .pull_request("web", pr(3, "three", None, 0))
            .pull_request("web", pr(4, "four", Some(false), 0));
        let forge = Arc::new(forge);

        let feed = pull_requests(forge.clone(), "acme".to_string(), "web".to_string());
        let (prs, errors) = collect(feed).await;

        let mut numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 3, 4]);
        assert_eq!(errors, vec!["API error: detail two exploded".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn next_page_waits_for_every_detail() {
        let forge = MockForge::new()
            .prs(
                "web",
                1,
                Scripted::page(Page::more(vec![PrSummary { number: 1 }, PrSummary { number: 2 }])),
            )
            .prs("web", 2, Scripted::page(Page::last(vec![PrSummary { number: 3 }])))
            .detail("web", 1, Ok(pr(1, "one", None, 0)), Some(Duration::from_millis(60)))
            .detail("web", 2, Err("gone".to_string()), Some(Duration::from_millis(30)))
            .pull_request("web", pr(3, "three", None, 0));
        let forge = Arc::new(forge);

        let feed = pull_requests(forge.clone(), "acme".to_string(), "web".to_string());
        let _ = collect(feed).await;

        let calls = forge.calls();
        let position = |call: &str| calls.iter().position(|c| c == call).unwrap();
        assert!(position("prs web 2") > position("resolved web 1"));
        assert!(position("prs web 2") > position("resolved web 2"));
        assert!(position("pr web 3") > position("prs web 2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_feed_stops_listing() {
        let listed = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&listed);
        let mut feed = paged(move |page| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, GhprsError>(Page::more(vec![page])) }
        });

        assert!(matches!(feed.next().await, Event::Item(1)));
        drop(feed);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = listed.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(listed.load(Ordering::SeqCst), after_drop);
    }
}
