//! Page iteration controller for one player.
//!
//! Fetches pages in increasing order until the history looks exhausted
//! (several empty pages in a row), a page ceiling is hit, or the renderer
//! fails. Matches are handed to the sink page by page.

use anyhow::Result;
use tracing::{info, warn};

use super::browser::{PageRenderer, RenderError};
use super::parsers::MatchParser;
use super::rate_limiter::RateLimiter;
use super::page_url;
use crate::storage::MatchSink;
use crate::types::StructuredMatch;

/// Why a player's run ended.
#[derive(Debug, Clone)]
pub enum StopReason {
    /// Enough consecutive empty pages; the normal end of a history.
    Exhausted,
    /// The caller's page ceiling was reached.
    MaxPages,
    /// A page could not be rendered. Earlier pages are already persisted.
    RenderFailed(RenderError),
}

/// Controller phases.
#[derive(Debug)]
pub enum ControllerState {
    Fetching,
    Accumulating(Vec<StructuredMatch>),
    Stopped(StopReason),
}

/// Stop conditions for a run.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    /// Hard ceiling on pages fetched in this run.
    pub max_pages: Option<u32>,
    /// Consecutive empty pages that end the run.
    pub max_empty_pages: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_empty_pages: 3,
        }
    }
}

/// Per-run state, owned by the controller and returned when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    pub current_page: u32,
    pub pages_fetched: u32,
    pub consecutive_empty_pages: u32,
    pub accumulated_matches: Vec<StructuredMatch>,
}

impl PaginationState {
    pub fn new(start_page: u32) -> Self {
        Self {
            current_page: start_page.max(1),
            pages_fetched: 0,
            consecutive_empty_pages: 0,
            accumulated_matches: Vec::new(),
        }
    }

    /// Whether the page ceiling allows another fetch.
    pub fn may_fetch(&self, limits: &PageLimits) -> bool {
        limits.max_pages.map_or(true, |max| self.pages_fetched < max)
    }

    /// Fold one parsed page into the state and decide what comes next.
    pub fn record_page(&mut self, matches: Vec<StructuredMatch>, limits: &PageLimits) -> ControllerState {
        self.pages_fetched += 1;

        if matches.is_empty() {
            self.consecutive_empty_pages += 1;
            if self.consecutive_empty_pages >= limits.max_empty_pages {
                return ControllerState::Stopped(StopReason::Exhausted);
            }
        } else {
            self.consecutive_empty_pages = 0;
            self.accumulated_matches.extend(matches);
        }

        if !self.may_fetch(limits) {
            return ControllerState::Stopped(StopReason::MaxPages);
        }

        self.current_page += 1;
        ControllerState::Fetching
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: PaginationState,
    pub stop: StopReason,
}

/// Drives the renderer over one player's pages.
pub struct PageIterator<'a, R> {
    renderer: &'a R,
    limiter: RateLimiter,
    limits: PageLimits,
    player_url: String,
    player_name: String,
}

impl<'a, R: PageRenderer> PageIterator<'a, R> {
    pub fn new(
        renderer: &'a R,
        limiter: RateLimiter,
        limits: PageLimits,
        player_url: impl Into<String>,
        player_name: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            limiter,
            limits,
            player_url: player_url.into(),
            player_name: player_name.into(),
        }
    }

    /// Run from `start_page` until a stop condition. Only sink failures are
    /// returned as errors; render failures end the run with
    /// [`StopReason::RenderFailed`].
    pub async fn run<S: MatchSink>(&self, start_page: u32, sink: &mut S) -> Result<RunOutcome> {
        let mut state = PaginationState::new(start_page);
        let mut phase = if state.may_fetch(&self.limits) {
            ControllerState::Fetching
        } else {
            ControllerState::Stopped(StopReason::MaxPages)
        };

        loop {
            phase = match phase {
                ControllerState::Fetching => {
                    self.limiter.acquire().await;
                    let url = page_url(&self.player_url, state.current_page);
                    info!("Scraping page {}...", state.current_page);

                    let rendered = self.renderer.render(&url).await;
                    self.limiter.release().await;

                    match rendered {
                        Ok(html) => {
                            let parsed = MatchParser::parse_page(&html, &self.player_name);
                            info!(
                                "Page {}: {} fragments, {} matches, {} dropped",
                                state.current_page,
                                parsed.fragments,
                                parsed.matches.len(),
                                parsed.rejections.len()
                            );
                            ControllerState::Accumulating(parsed.matches)
                        }
                        Err(e) => {
                            warn!("Page {} failed: {}", state.current_page, e);
                            ControllerState::Stopped(StopReason::RenderFailed(e))
                        }
                    }
                }
                ControllerState::Accumulating(matches) => {
                    if !matches.is_empty() {
                        sink.push_matches(&matches)?;
                    }
                    state.record_page(matches, &self.limits)
                }
                ControllerState::Stopped(stop) => {
                    info!(
                        "Stopped after {} pages ({:?}): {} matches",
                        state.pages_fetched,
                        stop,
                        state.accumulated_matches.len()
                    );
                    return Ok(RunOutcome { state, stop });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const URL: &str = "https://pickleball.com/players/jessica-wang/rating-history";

    /// One valid doubles match for Jessica Wang on the given day.
    fn match_text(day: u32) -> String {
        format!(
            "Jessica WangF | WA, USADec {day}, 20244.1230.0524.175\
             Megan FoxF | CA, USA3.980-0.0203.960\
             Ann LeeF | TX, USA4.0500.0104.060\
             Bo KimF | NY, USA4.200-0.0304.17010>116"
        )
    }

    struct FakeSite {
        pages: HashMap<u32, String>,
        fail_on: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakeSite {
        fn new(pages: HashMap<u32, String>) -> Self {
            Self {
                pages,
                fail_on: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageRenderer for FakeSite {
        async fn render(&self, url: &str) -> Result<String, RenderError> {
            let page: u32 = url
                .rsplit("current_page=")
                .next()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            self.requested.lock().unwrap().push(page);

            if self.fail_on == Some(page) {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                    timeout: Duration::from_secs(30),
                });
            }
            Ok(self
                .pages
                .get(&page)
                .cloned()
                .unwrap_or_else(|| "<html><body>No results</body></html>".to_string()))
        }
    }

    /// Pages 1..=n with `per_page` matches each.
    fn site(n: u32, per_page: u32) -> HashMap<u32, String> {
        (1..=n)
            .map(|page| {
                let text: String = (0..per_page).map(|i| match_text(page + i)).collect();
                (page, format!("Rating History{}", text))
            })
            .collect()
    }

    fn iterator<'a>(renderer: &'a FakeSite, limits: PageLimits) -> PageIterator<'a, FakeSite> {
        PageIterator::new(renderer, RateLimiter::from_millis(0), limits, URL, "Jessica Wang")
    }

    #[tokio::test]
    async fn test_stops_after_three_empty_pages() {
        let renderer = FakeSite::new(site(5, 2));
        let mut sink: Vec<StructuredMatch> = Vec::new();

        let outcome = iterator(&renderer, PageLimits::default())
            .run(1, &mut sink)
            .await
            .unwrap();

        assert!(matches!(outcome.stop, StopReason::Exhausted));
        assert_eq!(outcome.state.consecutive_empty_pages, 3);
        assert_eq!(outcome.state.current_page, 8);
        assert_eq!(outcome.state.pages_fetched, 8);
        assert_eq!(outcome.state.accumulated_matches.len(), 10);
        assert_eq!(renderer.requested(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(sink, outcome.state.accumulated_matches);
    }

    #[tokio::test]
    async fn test_empty_page_mid_history_resets() {
        let mut pages = site(5, 1);
        pages.remove(&3);
        let renderer = FakeSite::new(pages);
        let mut sink: Vec<StructuredMatch> = Vec::new();

        let outcome = iterator(&renderer, PageLimits::default())
            .run(1, &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome.state.accumulated_matches.len(), 4);
        assert_eq!(renderer.requested(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_max_pages_ceiling() {
        let renderer = FakeSite::new(site(10, 1));
        let limits = PageLimits {
            max_pages: Some(3),
            ..Default::default()
        };
        let mut sink: Vec<StructuredMatch> = Vec::new();

        let outcome = iterator(&renderer, limits).run(2, &mut sink).await.unwrap();

        assert!(matches!(outcome.stop, StopReason::MaxPages));
        assert_eq!(renderer.requested(), vec![2, 3, 4]);
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_max_pages_fetches_nothing() {
        let renderer = FakeSite::new(site(2, 1));
        let limits = PageLimits {
            max_pages: Some(0),
            ..Default::default()
        };
        let mut sink: Vec<StructuredMatch> = Vec::new();

        let outcome = iterator(&renderer, limits).run(1, &mut sink).await.unwrap();
        assert!(matches!(outcome.stop, StopReason::MaxPages));
        assert!(renderer.requested().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_stops_and_keeps_earlier_pages() {
        let mut renderer = FakeSite::new(site(6, 1));
        renderer.fail_on = Some(4);
        let mut sink: Vec<StructuredMatch> = Vec::new();

        let outcome = iterator(&renderer, PageLimits::default())
            .run(1, &mut sink)
            .await
            .unwrap();

        assert!(matches!(
            outcome.stop,
            StopReason::RenderFailed(RenderError::Timeout { .. })
        ));
        assert_eq!(sink.len(), 3);
        assert_eq!(renderer.requested(), vec![1, 2, 3, 4]);
    }

    /// Renderer that takes a while per page and records when each render ran.
    struct SlowSite {
        render_time: Duration,
        spans: Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>,
    }

    impl PageRenderer for SlowSite {
        async fn render(&self, _url: &str) -> Result<String, RenderError> {
            let start = tokio::time::Instant::now();
            tokio::time::sleep(self.render_time).await;
            self.spans
                .lock()
                .unwrap()
                .push((start, tokio::time::Instant::now()));
            Ok("<html><body>No results</body></html>".to_string())
        }
    }

    #[tokio::test]
    async fn test_page_delay_follows_slow_render() {
        let renderer = SlowSite {
            render_time: Duration::from_millis(300),
            spans: Mutex::new(Vec::new()),
        };
        let limits = PageLimits {
            max_pages: Some(3),
            ..Default::default()
        };
        let iterator = PageIterator::new(
            &renderer,
            RateLimiter::from_millis(200),
            limits,
            URL,
            "Jessica Wang",
        );
        let mut sink: Vec<StructuredMatch> = Vec::new();

        iterator.run(1, &mut sink).await.unwrap();

        let spans = renderer.spans.lock().unwrap().clone();
        assert_eq!(spans.len(), 3);
        for pair in spans.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].1);
            assert!(gap >= Duration::from_millis(150), "gap was {:?}", gap);
        }
    }

    #[test]
    fn test_record_page_transitions() {
        let limits = PageLimits::default();
        let mut state = PaginationState::new(1);

        assert!(matches!(state.record_page(vec![], &limits), ControllerState::Fetching));
        assert!(matches!(state.record_page(vec![], &limits), ControllerState::Fetching));
        assert_eq!(state.consecutive_empty_pages, 2);
        assert_eq!(state.current_page, 3);

        assert!(matches!(
            state.record_page(vec![], &limits),
            ControllerState::Stopped(StopReason::Exhausted)
        ));
        assert_eq!(state.current_page, 3);
    }

    #[test]
    fn test_start_page_is_one_based() {
        assert_eq!(PaginationState::new(0).current_page, 1);
        assert_eq!(PaginationState::new(4).current_page, 4);
    }
}
