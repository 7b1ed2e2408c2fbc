//! Cursor-driven page sequence over an [`IssueSource`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::platform::{
    IssueQuery, IssueSource, PlatformError, RateLimitHint, RemoteIssueRecord,
};

use super::error::PagerError;

/// Floor for advertised rate limit delays, so a `retry-after: 0` cannot spin.
const MIN_RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// One fetched page.
#[derive(Debug, Clone)]
pub struct RemotePage {
    /// 1-based position in the sequence, counting skipped pages.
    pub number: u32,
    pub records: Vec<RemoteIssueRecord>,
}

/// Lazy, finite, non-restartable sequence of issue pages.
///
/// A failed call leaves the cursor where it was, so calling
/// [`next_page`](Self::next_page) again retries the same page. Rate limit
/// signals are absorbed by sleeping, up to `max_wait` in total over the
/// pager's lifetime.
pub struct RemotePager {
    source: Arc<dyn IssueSource>,
    query: IssueQuery,
    cursor: Option<String>,
    exhausted: bool,
    position: u32,
    pages_fetched: u32,
    /// Delay owed before the next request, from an exhausted budget hint.
    pending_wait: Option<Duration>,
    total_waited: Duration,
    max_wait: Duration,
}

impl std::fmt::Debug for RemotePager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePager")
            .field("repo", &self.query.full_name())
            .field("cursor", &self.cursor)
            .field("exhausted", &self.exhausted)
            .field("pages_fetched", &self.pages_fetched)
            .field("total_waited", &self.total_waited)
            .finish_non_exhaustive()
    }
}

impl RemotePager {
    pub fn new(source: Arc<dyn IssueSource>, query: IssueQuery, max_wait: Duration) -> Self {
        Self {
            source,
            query,
            cursor: None,
            exhausted: false,
            position: 0,
            pages_fetched: 0,
            pending_wait: None,
            total_waited: Duration::ZERO,
            max_wait,
        }
    }

    /// Fetch the next page, or `None` once the sequence has ended.
    pub async fn next_page(&mut self) -> Result<Option<RemotePage>, PagerError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            self.settle_pending_wait().await?;

            match self
                .source
                .fetch_issues(&self.query, self.cursor.as_deref())
                .await
            {
                Ok(page) => {
                    self.note_hint(page.rate_limit.as_ref());
                    self.advance(page.next_cursor);
                    self.pages_fetched += 1;
                    tracing::debug!(
                        repo = %self.query.full_name(),
                        page = self.position,
                        records = page.records.len(),
                        "page fetched"
                    );
                    return Ok(Some(RemotePage {
                        number: self.position,
                        records: page.records,
                    }));
                }
                Err(PlatformError::RateLimited { retry_after }) => {
                    self.suspend(retry_after).await?;
                }
                Err(e) => return Err(PagerError::Transport(e)),
            }
        }
    }

    /// Step over the next page without its records.
    ///
    /// Returns `false` when there was no page left to skip.
    pub async fn skip_page(&mut self) -> Result<bool, PagerError> {
        if self.exhausted {
            return Ok(false);
        }

        loop {
            self.settle_pending_wait().await?;

            match self
                .source
                .fetch_page_boundary(&self.query, self.cursor.as_deref())
                .await
            {
                Ok(boundary) => {
                    self.note_hint(boundary.rate_limit.as_ref());
                    self.advance(boundary.next_cursor);
                    tracing::debug!(
                        repo = %self.query.full_name(),
                        page = self.position,
                        "page skipped"
                    );
                    return Ok(true);
                }
                Err(PlatformError::RateLimited { retry_after }) => {
                    self.suspend(retry_after).await?;
                }
                Err(e) => return Err(PagerError::Transport(e)),
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Pages successfully fetched (skipped pages excluded).
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Cumulative time spent sleeping on rate limits.
    pub fn total_waited(&self) -> Duration {
        self.total_waited
    }

    fn advance(&mut self, next_cursor: Option<String>) {
        self.position += 1;
        self.exhausted = next_cursor.is_none();
        self.cursor = next_cursor;
    }

    fn note_hint(&mut self, hint: Option<&RateLimitHint>) {
        if let Some(hint) = hint
            && hint.is_exhausted()
        {
            self.pending_wait = Some(hint.delay_from(Utc::now()));
        }
    }

    async fn settle_pending_wait(&mut self) -> Result<(), PagerError> {
        if let Some(delay) = self.pending_wait {
            self.suspend(delay).await?;
            self.pending_wait = None;
        }
        Ok(())
    }

    /// Sleep for `delay`, charging it against the cumulative budget.
    async fn suspend(&mut self, delay: Duration) -> Result<(), PagerError> {
        let delay = delay.max(MIN_RATE_LIMIT_DELAY);
        if self.total_waited + delay > self.max_wait {
            tracing::warn!(
                repo = %self.query.full_name(),
                waited_ms = self.total_waited.as_millis() as u64,
                requested_ms = delay.as_millis() as u64,
                "rate limit wait budget exhausted"
            );
            return Err(PagerError::RateLimitExceeded {
                waited: self.total_waited,
            });
        }

        tracing::info!(
            repo = %self.query.full_name(),
            delay_ms = delay.as_millis() as u64,
            "rate limited, waiting"
        );
        tokio::time::sleep(delay).await;
        self.total_waited += delay;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::platform::{IssuePage, PageBoundary};

    /// Scripted source: replies are consumed in order, cursors are recorded.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<IssuePage, PlatformError>>>,
        boundaries: Mutex<VecDeque<Result<PageBoundary, PlatformError>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<IssuePage, PlatformError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl IssueSource for Scripted {
        async fn fetch_issues(
            &self,
            _query: &IssueQuery,
            cursor: Option<&str>,
        ) -> Result<IssuePage, PlatformError> {
            self.cursors.lock().expect("lock").push(cursor.map(String::from));
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(PlatformError::internal("script exhausted")))
        }

        async fn fetch_page_boundary(
            &self,
            _query: &IssueQuery,
            cursor: Option<&str>,
        ) -> Result<PageBoundary, PlatformError> {
            self.cursors.lock().expect("lock").push(cursor.map(String::from));
            self.boundaries
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(PlatformError::internal("script exhausted")))
        }
    }

    fn query() -> IssueQuery {
        IssueQuery {
            owner: "octo".to_string(),
            name: "widgets".to_string(),
            states: Vec::new(),
            since: None,
            page_size: 2,
        }
    }

    fn page(next: Option<&str>, hint: Option<RateLimitHint>) -> Result<IssuePage, PlatformError> {
        Ok(IssuePage {
            records: Vec::new(),
            next_cursor: next.map(String::from),
            rate_limit: hint,
        })
    }

    fn pager(source: Arc<Scripted>, max_wait: Duration) -> RemotePager {
        RemotePager::new(source, query(), max_wait)
    }

    #[tokio::test(start_paused = true)]
    async fn follows_cursors_until_exhausted() {
        let source = Scripted::new(vec![page(Some("c1"), None), page(None, None)]);
        let mut pager = pager(source.clone(), Duration::from_secs(60));

        assert_eq!(pager.next_page().await.expect("p1").map(|p| p.number), Some(1));
        assert!(!pager.is_exhausted());
        assert_eq!(pager.next_page().await.expect("p2").map(|p| p.number), Some(2));
        assert!(pager.is_exhausted());
        assert!(pager.next_page().await.expect("end").is_none());

        assert_eq!(pager.pages_fetched(), 2);
        assert_eq!(source.cursors(), vec![None, Some("c1".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_call_does_not_advance_cursor() {
        let source = Scripted::new(vec![
            page(Some("c1"), None),
            Err(PlatformError::network("reset")),
            page(None, None),
        ]);
        let mut pager = pager(source.clone(), Duration::from_secs(60));

        pager.next_page().await.expect("p1");
        let err = pager.next_page().await.expect_err("transport");
        assert!(matches!(err, PagerError::Transport(PlatformError::Network { .. })));
        assert!(err.is_transient());

        let retried = pager.next_page().await.expect("retry").expect("page");
        assert_eq!(retried.number, 2);
        assert_eq!(
            source.cursors(),
            vec![None, Some("c1".to_string()), Some("c1".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_absorbed_by_waiting() {
        let source = Scripted::new(vec![
            Err(PlatformError::RateLimited {
                retry_after: Duration::from_secs(10),
            }),
            page(None, None),
        ]);
        let mut pager = pager(source, Duration::from_secs(60));

        let started = tokio::time::Instant::now();
        assert!(pager.next_page().await.expect("page").is_some());
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(pager.total_waited(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_hint_delays_the_next_request() {
        let hint = RateLimitHint {
            remaining: 0,
            reset_at: Utc::now() + TimeDelta::seconds(20),
        };
        let source = Scripted::new(vec![page(Some("c1"), Some(hint)), page(None, None)]);
        let mut pager = pager(source, Duration::from_secs(60));

        pager.next_page().await.expect("p1");
        assert_eq!(pager.total_waited(), Duration::ZERO);
        pager.next_page().await.expect("p2");
        assert!(pager.total_waited() >= Duration::from_secs(18));
    }

    #[tokio::test(start_paused = true)]
    async fn cumulative_wait_beyond_budget_fails() {
        let limited = || {
            Err(PlatformError::RateLimited {
                retry_after: Duration::from_secs(40),
            })
        };
        let source = Scripted::new(vec![limited(), limited(), page(None, None)]);
        let mut pager = pager(source, Duration::from_secs(60));

        let err = pager.next_page().await.expect_err("budget");
        match err {
            PagerError::RateLimitExceeded { waited } => {
                assert_eq!(waited, Duration::from_secs(40));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!pager.is_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn skip_page_advances_past_failed_page() {
        let source = Scripted::new(vec![
            page(Some("c1"), None),
            Err(PlatformError::api_status(502, "bad gateway")),
            page(None, None),
        ]);
        source
            .boundaries
            .lock()
            .expect("lock")
            .push_back(Ok(PageBoundary {
                next_cursor: Some("c2".to_string()),
                rate_limit: None,
            }));
        let mut pager = pager(source.clone(), Duration::from_secs(60));

        pager.next_page().await.expect("p1");
        pager.next_page().await.expect_err("p2 fails");
        assert!(pager.skip_page().await.expect("skip"));

        let third = pager.next_page().await.expect("p3").expect("page");
        assert_eq!(third.number, 3);
        assert_eq!(pager.pages_fetched(), 2);
        assert_eq!(
            source.cursors(),
            vec![
                None,
                Some("c1".to_string()),
                Some("c1".to_string()),
                Some("c2".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skip_on_exhausted_pager_is_a_noop() {
        let source = Scripted::new(vec![page(None, None)]);
        let mut pager = pager(source, Duration::from_secs(60));
        pager.next_page().await.expect("only page");
        assert!(!pager.skip_page().await.expect("noop"));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_surface_unchanged() {
        let source = Scripted::new(vec![Err(PlatformError::AuthRequired)]);
        let mut pager = pager(source, Duration::from_secs(60));
        let err = pager.next_page().await.expect_err("auth");
        assert!(err.is_fatal());
    }
}
