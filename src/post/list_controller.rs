use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use serde::Serialize;

use crate::notify::{Notice, Notifier, ViewHost};
use crate::post::post_gateway::PostGateway;
use crate::post::post_model::{ListQuery, PAGE_SIZE, Post, PostCard, PostPage};
use crate::utils::error::CustomError;

/// A list request that has been issued but not applied yet. Only the ticket
/// with the newest sequence number may change the controller's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    sequence: u64,
    query: ListQuery,
}

impl PendingFetch {
    pub fn query(&self) -> &ListQuery {
        &self.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the displayed page.
    Applied,
    /// The request failed; the previous page stays on display.
    Failed(CustomError),
    /// A newer request was issued after this one; the response was dropped.
    Stale,
    /// The current page no longer exists. The controller moved to the last
    /// page and issued this follow-up request, which still has to be run.
    Reissued(PendingFetch),
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    NoPosts,
    NoMatches,
}

/// Serializable copy of what the list view shows.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ListViewState {
    pub search_text: String,
    pub current_page: u64,
    pub total_pages: u64,
    pub is_loading: bool,
    pub items: Vec<PostCard>,
    pub show_pager: bool,
    pub empty_state: Option<EmptyState>,
}

/// State behind the searchable, paginated post list.
///
/// Every change of search text or page issues a new request. Requests are
/// numbered, and a response is applied only if it belongs to the most recent
/// request, so a slow earlier response can never overwrite a newer one.
pub struct PostListController {
    gateway: Arc<dyn PostGateway>,
    notifier: Arc<dyn Notifier>,
    host: Arc<dyn ViewHost>,
    search_text: String,
    current_page: u64,
    total_pages: u64,
    items: Vec<Post>,
    is_loading: bool,
    latest_request: u64,
}

impl PostListController {
    pub fn new(
        gateway: Arc<dyn PostGateway>,
        notifier: Arc<dyn Notifier>,
        host: Arc<dyn ViewHost>,
    ) -> Self {
        PostListController {
            gateway,
            notifier,
            host,
            search_text: String::new(),
            current_page: 1,
            total_pages: 1,
            items: Vec::new(),
            is_loading: false,
            latest_request: 0,
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn items(&self) -> &[Post] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn query(&self) -> ListQuery {
        ListQuery::new(self.search_text.clone(), self.current_page)
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// The page selector is only rendered when there is more than one page.
    pub fn show_pager(&self) -> bool {
        self.total_pages > 1
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u64> {
        1..=self.total_pages
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.is_loading || !self.items.is_empty() {
            None
        } else if self.search_text.is_empty() {
            Some(EmptyState::NoPosts)
        } else {
            Some(EmptyState::NoMatches)
        }
    }

    pub fn snapshot(&self) -> ListViewState {
        ListViewState {
            search_text: self.search_text.clone(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            is_loading: self.is_loading,
            items: self.items.iter().map(PostCard::from).collect(),
            show_pager: self.show_pager(),
            empty_state: self.empty_state(),
        }
    }

    /// Replaces the search text and jumps back to page 1.
    pub fn begin_set_search_text(&mut self, text: impl Into<String>) -> PendingFetch {
        self.search_text = text.into();
        self.current_page = 1;
        self.issue()
    }

    /// `None`, with nothing changed, when `page` is outside `1..=total_pages`.
    pub fn begin_go_to_page(&mut self, page: u64) -> Option<PendingFetch> {
        if page < 1 || page > self.total_pages {
            debug!(
                "Ignoring page {} outside 1..={}",
                page, self.total_pages
            );
            return None;
        }
        self.current_page = page;
        self.host.scroll_to_top();
        Some(self.issue())
    }

    /// Re-issues the current query, e.g. when the view is first shown.
    pub fn begin_refresh(&mut self) -> PendingFetch {
        self.issue()
    }

    fn issue(&mut self) -> PendingFetch {
        self.latest_request += 1;
        self.is_loading = true;
        PendingFetch {
            sequence: self.latest_request,
            query: self.query(),
        }
    }

    /// Runs the gateway call for `ticket`. The returned future does not
    /// borrow the controller, so the controller can keep taking input while
    /// it is in flight.
    pub fn request(
        &self,
        ticket: &PendingFetch,
    ) -> impl Future<Output = Result<PostPage, CustomError>> + Send + use<> {
        let gateway = Arc::clone(&self.gateway);
        let query = ticket.query.clone();
        async move { gateway.list_posts(&query).await }
    }

    /// Applies the response for `ticket` unless a newer request exists.
    pub fn complete(
        &mut self,
        ticket: PendingFetch,
        result: Result<PostPage, CustomError>,
    ) -> FetchOutcome {
        if ticket.sequence != self.latest_request {
            debug!(
                "Dropping stale response #{} (latest is #{})",
                ticket.sequence, self.latest_request
            );
            return FetchOutcome::Stale;
        }

        self.is_loading = false;
        match result {
            Ok(page) => {
                self.total_pages = page.total_pages(PAGE_SIZE);
                if self.current_page > self.total_pages {
                    debug!(
                        "Page {} no longer exists, moving to page {}",
                        self.current_page, self.total_pages
                    );
                    self.current_page = self.total_pages;
                    return FetchOutcome::Reissued(self.issue());
                }
                self.items = page.items;
                FetchOutcome::Applied
            }
            Err(err) => {
                error!("Error fetching posts: {}", err);
                self.notifier
                    .notify(Notice::error("Error", "Failed to load posts"));
                FetchOutcome::Failed(err)
            }
        }
    }

    async fn run(&mut self, mut ticket: PendingFetch) -> FetchOutcome {
        loop {
            let result = self.request(&ticket).await;
            match self.complete(ticket, result) {
                FetchOutcome::Reissued(next) => ticket = next,
                outcome => return outcome,
            }
        }
    }

    pub async fn refresh(&mut self) -> FetchOutcome {
        let ticket = self.begin_refresh();
        self.run(ticket).await
    }

    pub async fn set_search_text(&mut self, text: impl Into<String>) -> FetchOutcome {
        let ticket = self.begin_set_search_text(text);
        self.run(ticket).await
    }

    /// `None` when the page is out of range and nothing was fetched.
    pub async fn go_to_page(&mut self, page: u64) -> Option<FetchOutcome> {
        let ticket = self.begin_go_to_page(page)?;
        Some(self.run(ticket).await)
    }

    pub async fn previous_page(&mut self) -> Option<FetchOutcome> {
        let page = self.current_page.checked_sub(1)?;
        self.go_to_page(page).await
    }

    pub async fn next_page(&mut self) -> Option<FetchOutcome> {
        self.go_to_page(self.current_page + 1).await
    }
}
