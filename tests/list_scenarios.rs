use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use vibrant_journal::notify::{BufferedNotifier, NoticeKind, ViewHost};
use vibrant_journal::post::list_controller::{EmptyState, FetchOutcome, PostListController};
use vibrant_journal::post::memory_gateway::MemoryPostGateway;
use vibrant_journal::post::post_model::{ListQuery, NewPost, Post, PostForm, PostPage};
use vibrant_journal::{CustomError, PostGateway};

/// Memory gateway that counts list calls and answers searches for "slow"
/// only after a delay.
struct InstrumentedGateway {
    inner: MemoryPostGateway,
    list_calls: AtomicUsize,
}

impl InstrumentedGateway {
    fn new() -> Self {
        InstrumentedGateway {
            inner: MemoryPostGateway::new(),
            list_calls: AtomicUsize::new(0),
        }
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostGateway for InstrumentedGateway {
    async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, CustomError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if query.search_text == "slow" {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.inner.list_posts(query).await
    }

    async fn get_post(&self, id: &str) -> Result<Post, CustomError> {
        self.inner.get_post(id).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, CustomError> {
        self.inner.create_post(post).await
    }

    async fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: PostForm,
    ) -> Result<Post, CustomError> {
        self.inner.update_post(id, author_id, changes).await
    }

    async fn delete_post(&self, id: &str, author_id: &str) -> Result<(), CustomError> {
        self.inner.delete_post(id, author_id).await
    }
}

#[derive(Default)]
struct RecordingHost {
    scrolls: AtomicUsize,
}

impl ViewHost for RecordingHost {
    fn scroll_to_top(&self) {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    gateway: Arc<InstrumentedGateway>,
    notifier: Arc<BufferedNotifier>,
    host: Arc<RecordingHost>,
    controller: PostListController,
}

/// `count` posts titled "Post 0".."Post n-1", one minute apart, oldest first.
async fn harness(count: u32) -> Harness {
    let gateway = Arc::new(InstrumentedGateway::new());
    for i in 0..count {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, i, 0).unwrap();
        gateway
            .inner
            .insert(Post {
                id: format!("post-{}", i),
                title: format!("Post {}", i),
                content: format!("Body of post {}", i),
                author_id: "author".to_string(),
                created_at: at,
                updated_at: at,
                author_name: None,
            })
            .await;
    }
    let notifier = Arc::new(BufferedNotifier::new());
    let host = Arc::new(RecordingHost::default());
    let controller = PostListController::new(gateway.clone(), notifier.clone(), host.clone());
    Harness {
        gateway,
        notifier,
        host,
        controller,
    }
}

#[tokio::test]
async fn thirteen_posts_split_into_three_pages() {
    let mut h = harness(13).await;

    assert_eq!(h.controller.refresh().await, FetchOutcome::Applied);
    assert_eq!(h.controller.items().len(), 6);
    assert_eq!(h.controller.total_pages(), 3);
    assert_eq!(h.controller.items()[0].title, "Post 12");
    assert!(h.controller.show_pager());

    let calls = h.gateway.list_calls();
    assert_eq!(h.controller.go_to_page(4).await, None);
    assert_eq!(h.controller.current_page(), 1);
    assert_eq!(h.gateway.list_calls(), calls);
    assert_eq!(h.host.scrolls.load(Ordering::SeqCst), 0);

    assert_eq!(h.controller.go_to_page(3).await, Some(FetchOutcome::Applied));
    assert_eq!(h.controller.current_page(), 3);
    assert_eq!(h.controller.items().len(), 1);
    assert_eq!(h.controller.items()[0].title, "Post 0");
    assert_eq!(h.host.scrolls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn page_zero_is_ignored() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    let calls = h.gateway.list_calls();

    assert_eq!(h.controller.go_to_page(0).await, None);
    assert_eq!(h.controller.current_page(), 1);
    assert_eq!(h.gateway.list_calls(), calls);
}

#[tokio::test]
async fn new_search_resets_to_first_page() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    h.controller.go_to_page(2).await;
    assert_eq!(h.controller.current_page(), 2);

    h.controller.set_search_text("post").await;
    assert_eq!(h.controller.current_page(), 1);
    assert_eq!(h.controller.total_pages(), 3);
}

#[tokio::test]
async fn search_ignores_case() {
    let mut h = harness(0).await;
    let now = Utc::now();
    for (id, title) in [("a", "Hello world"), ("b", "HELLO again"), ("c", "Goodbye")] {
        h.gateway
            .inner
            .insert(Post {
                id: id.to_string(),
                title: title.to_string(),
                content: String::new(),
                author_id: "author".to_string(),
                created_at: now,
                updated_at: now,
                author_name: None,
            })
            .await;
    }

    h.controller.set_search_text("hello").await;
    let mut ids: Vec<_> = h.controller.items().iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn no_matches_leaves_one_empty_page() {
    let mut h = harness(13).await;
    h.controller.refresh().await;

    h.controller.set_search_text("no such text").await;
    assert!(h.controller.items().is_empty());
    assert_eq!(h.controller.total_pages(), 1);
    assert!(!h.controller.show_pager());
    assert_eq!(h.controller.empty_state(), Some(EmptyState::NoMatches));
}

#[tokio::test]
async fn failed_fetch_keeps_previous_page() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    let before = h.controller.items().to_vec();

    h.gateway.inner.set_offline(true);
    let outcome = h.controller.go_to_page(2).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Failed(_)));
    assert!(!h.controller.is_loading());
    assert_eq!(h.controller.items(), before.as_slice());
    assert_eq!(h.controller.total_pages(), 3);

    let notice = h.notifier.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
}

#[tokio::test]
async fn forbidden_delete_leaves_list_untouched() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    let before = h.controller.snapshot();

    let err = h
        .gateway
        .delete_post("post-12", "intruder")
        .await
        .unwrap_err();
    assert!(err.is_forbidden());

    h.controller.refresh().await;
    assert_eq!(h.controller.snapshot(), before);
}

#[tokio::test]
async fn slow_earlier_response_never_overwrites_newer_one() {
    let mut h = harness(13).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let slow = h.controller.begin_set_search_text("slow");
    let fast = h.controller.begin_set_search_text("Post 3");
    for ticket in [slow, fast] {
        let request = h.controller.request(&ticket);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = tx.send((ticket, result));
        });
    }
    drop(tx);

    let mut outcomes = Vec::new();
    while let Some((ticket, result)) = rx.recv().await {
        let query = ticket.query().search_text.clone();
        outcomes.push((query, h.controller.complete(ticket, result)));
    }

    assert_eq!(
        outcomes,
        vec![
            ("Post 3".to_string(), FetchOutcome::Applied),
            ("slow".to_string(), FetchOutcome::Stale),
        ]
    );
    assert_eq!(h.controller.search_text(), "Post 3");
    let titles: Vec<_> = h.controller.items().iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Post 3"]);
    assert!(!h.controller.is_loading());
}

#[tokio::test]
async fn refresh_after_deletes_moves_off_a_vanished_page() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    h.controller.go_to_page(3).await;
    assert_eq!(h.controller.items().len(), 1);

    h.gateway.delete_post("post-0", "author").await.unwrap();
    let calls = h.gateway.list_calls();

    assert_eq!(h.controller.refresh().await, FetchOutcome::Applied);
    assert_eq!(h.gateway.list_calls(), calls + 2);
    assert_eq!(h.controller.total_pages(), 2);
    assert_eq!(h.controller.current_page(), 2);
    assert_eq!(h.controller.items().len(), 6);
    assert_eq!(h.controller.items()[5].title, "Post 1");
    assert_eq!(h.controller.empty_state(), None);
    assert!(!h.controller.is_loading());
}

#[tokio::test]
async fn refresh_on_last_page_follows_the_shrinking_count() {
    let mut h = harness(13).await;
    h.controller.refresh().await;
    h.controller.go_to_page(3).await;

    for i in 0..7 {
        h.gateway
            .delete_post(&format!("post-{}", i), "author")
            .await
            .unwrap();
    }
    h.controller.refresh().await;
    assert_eq!(h.controller.current_page(), 1);
    assert_eq!(h.controller.total_pages(), 1);
    assert_eq!(h.controller.items().len(), 6);
    assert!(!h.controller.show_pager());

    for i in 7..13 {
        h.gateway
            .delete_post(&format!("post-{}", i), "author")
            .await
            .unwrap();
    }
    assert_eq!(h.controller.refresh().await, FetchOutcome::Applied);
    assert_eq!(h.controller.current_page(), 1);
    assert!(h.controller.items().is_empty());
    assert_eq!(h.controller.empty_state(), Some(EmptyState::NoPosts));
    assert_eq!(h.controller.go_to_page(1).await, Some(FetchOutcome::Applied));
}
