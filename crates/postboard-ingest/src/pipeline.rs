//! Two-level fan-out ingestion pipeline
//!
//! [`Pipeline::run`] fetches the post collection for one user, then spawns
//! one worker per post; each post worker persists its post, fetches the
//! post's comments, and spawns one nested worker per comment. A fresh
//! [`JoinSet`] per nesting level is the completion tracker: draining it
//! returns only after every spawned unit has finished exactly once,
//! whatever exit path the unit took, so a unit can never skip its
//! completion signal.
//!
//! Fan-out width is unbounded (one task per post, one per comment), which
//! is a scaling risk on large collections. There is no cancellation and no
//! deadline on in-flight calls: a hung fetch hangs its one worker and the
//! barrier waiting on it.

use crate::fetch::FetchError;
use crate::store::StoreError;
use postboard_common::types::{Comment, Post};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Source of post and comment collections.
///
/// Implemented by the HTTP client; tests substitute fakes.
pub trait PostSource: Send + Sync + 'static {
    /// Fetch the post collection selected by one user id
    fn fetch_posts(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Post>, FetchError>> + Send;

    /// Fetch the comment collection owned by one post
    fn fetch_comments(
        &self,
        post_id: i32,
    ) -> impl Future<Output = Result<Vec<Comment>, FetchError>> + Send;
}

/// Destination for decoded records.
///
/// Implemented by the record writer; tests substitute fakes.
pub trait RecordSink: Send + Sync + 'static {
    fn persist_post(&self, post: &Post) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn persist_comment(
        &self,
        comment: &Comment,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The fan-out orchestrator.
///
/// Holds the shared source and sink handles passed to every worker; no
/// ambient state.
pub struct Pipeline<S, W> {
    source: Arc<S>,
    sink: Arc<W>,
}

impl<S: PostSource, W: RecordSink> Pipeline<S, W> {
    pub fn new(source: Arc<S>, sink: Arc<W>) -> Self {
        Self { source, sink }
    }

    /// Run the full two-level ingestion for one user.
    ///
    /// The initial post fetch is the only fatal failure: it returns before
    /// any worker is dispatched. Once the fan-out starts, individual unit
    /// failures are logged and swallowed; `run` returns `Ok` after every
    /// post unit (and, transitively, every comment unit) has completed,
    /// regardless of how many failed internally.
    pub async fn run(&self, user_id: &str) -> Result<(), FetchError> {
        let posts = self.source.fetch_posts(user_id).await?;
        info!(user_id = %user_id, count = posts.len(), "fetched post collection");

        let mut workers = JoinSet::new();
        for post in posts {
            workers.spawn(post_unit(
                Arc::clone(&self.source),
                Arc::clone(&self.sink),
                post,
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "post worker aborted");
            }
        }

        info!(user_id = %user_id, "ingestion run complete");
        Ok(())
    }
}

/// One unit of work per post: persist the post, fetch its comments, fan out
/// one nested unit per comment, and wait for all of them.
///
/// Every early return still counts as completion for the parent barrier;
/// sibling posts are never affected by failures here.
async fn post_unit<S: PostSource, W: RecordSink>(source: Arc<S>, sink: Arc<W>, post: Post) {
    if let Err(err) = sink.persist_post(&post).await {
        warn!(post_id = post.id, error = %err, "failed to persist post");
    }

    let comments = match source.fetch_comments(post.id).await {
        Ok(comments) => comments,
        Err(err) => {
            warn!(post_id = post.id, error = %err, "failed to fetch comments");
            return;
        }
    };
    debug!(post_id = post.id, count = comments.len(), "fetched comment collection");

    let mut workers = JoinSet::new();
    for comment in comments {
        workers.spawn(comment_unit(Arc::clone(&sink), comment));
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            error!(post_id = post.id, error = %err, "comment worker aborted");
        }
    }
}

/// One unit of work per comment: persist it, log on failure, done.
async fn comment_unit<W: RecordSink>(sink: Arc<W>, comment: Comment) {
    if let Err(err) = sink.persist_comment(&comment).await {
        warn!(
            comment_id = comment.id,
            post_id = comment.post_id,
            error = %err,
            "failed to persist comment"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use postboard_common::types::RecordKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn post(id: i32) -> Post {
        Post {
            user_id: 7,
            id,
            title: format!("title {}", id),
            body: "body".to_string(),
        }
    }

    fn comment(post_id: i32, id: i32) -> Comment {
        Comment {
            post_id,
            id,
            name: "n".to_string(),
            email: "n@example.com".to_string(),
            body: "body".to_string(),
        }
    }

    fn fetch_failure() -> FetchError {
        FetchError::Decode {
            url: "http://test.invalid/posts?userId=7".to_string(),
            source: serde_json::from_str::<Vec<Post>>("!").unwrap_err(),
        }
    }

    fn write_failure(kind: RecordKind) -> StoreError {
        StoreError::Write {
            kind,
            source: sqlx::Error::PoolClosed,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        posts: Vec<Post>,
        comments: HashMap<i32, Vec<Comment>>,
        fail_posts: bool,
        fail_comments_for: Option<i32>,
        comment_fetches: Mutex<Vec<i32>>,
    }

    impl PostSource for FakeSource {
        fn fetch_posts(
            &self,
            _user_id: &str,
        ) -> impl Future<Output = Result<Vec<Post>, FetchError>> + Send {
            async move {
                if self.fail_posts {
                    return Err(fetch_failure());
                }
                Ok(self.posts.clone())
            }
        }

        fn fetch_comments(
            &self,
            post_id: i32,
        ) -> impl Future<Output = Result<Vec<Comment>, FetchError>> + Send {
            async move {
                self.comment_fetches.lock().unwrap().push(post_id);
                if self.fail_comments_for == Some(post_id) {
                    return Err(fetch_failure());
                }
                Ok(self.comments.get(&post_id).cloned().unwrap_or_default())
            }
        }
    }

    #[derive(Default)]
    struct FakeSink {
        persisted_posts: Mutex<Vec<i32>>,
        persisted_comments: Mutex<Vec<i32>>,
        post_attempts: AtomicUsize,
        comment_attempts: AtomicUsize,
        fail_post: Option<i32>,
        fail_comment: Option<i32>,
    }

    impl RecordSink for FakeSink {
        fn persist_post(&self, post: &Post) -> impl Future<Output = Result<(), StoreError>> + Send {
            let id = post.id;
            async move {
                self.post_attempts.fetch_add(1, Ordering::SeqCst);
                if self.fail_post == Some(id) {
                    return Err(write_failure(RecordKind::Post));
                }
                self.persisted_posts.lock().unwrap().push(id);
                Ok(())
            }
        }

        fn persist_comment(
            &self,
            comment: &Comment,
        ) -> impl Future<Output = Result<(), StoreError>> + Send {
            let id = comment.id;
            async move {
                self.comment_attempts.fetch_add(1, Ordering::SeqCst);
                if self.fail_comment == Some(id) {
                    return Err(write_failure(RecordKind::Comment));
                }
                self.persisted_comments.lock().unwrap().push(id);
                Ok(())
            }
        }
    }

    fn sorted(values: &Mutex<Vec<i32>>) -> Vec<i32> {
        let mut values = values.lock().unwrap().clone();
        values.sort_unstable();
        values
    }

    #[tokio::test]
    async fn test_two_level_nesting() {
        let source = Arc::new(FakeSource {
            posts: vec![post(1), post(2)],
            comments: HashMap::from([(1, vec![comment(1, 10)]), (2, vec![])]),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        assert_eq!(sorted(&source.comment_fetches), vec![1, 2]);
        assert_eq!(sorted(&sink.persisted_posts), vec![1, 2]);
        assert_eq!(sorted(&sink.persisted_comments), vec![10]);
        assert_eq!(sink.post_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.comment_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_post_collection() {
        let source = Arc::new(FakeSource::default());
        let sink = Arc::new(FakeSink::default());

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        assert_eq!(sink.post_attempts.load(Ordering::SeqCst), 0);
        assert!(source.comment_fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_short_circuit_on_post_fetch() {
        let source = Arc::new(FakeSource {
            posts: vec![post(1)],
            fail_posts: true,
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());

        let result = Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await;

        assert!(matches!(result, Err(FetchError::Decode { .. })));
        assert_eq!(sink.post_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(sink.comment_attempts.load(Ordering::SeqCst), 0);
        assert!(source.comment_fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_persist_failure_does_not_abort_unit_or_siblings() {
        let source = Arc::new(FakeSource {
            posts: vec![post(1), post(2)],
            comments: HashMap::from([
                (1, vec![comment(1, 10), comment(1, 11)]),
                (2, vec![comment(2, 20)]),
            ]),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink {
            fail_post: Some(1),
            ..Default::default()
        });

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        // Post 1 failed to persist, but its comments were still fetched and
        // persisted, and post 2 was untouched by the failure.
        assert_eq!(sink.post_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sorted(&sink.persisted_posts), vec![2]);
        assert_eq!(sorted(&sink.persisted_comments), vec![10, 11, 20]);
    }

    #[tokio::test]
    async fn test_comment_persist_failure_is_isolated() {
        let source = Arc::new(FakeSource {
            posts: vec![post(1), post(2)],
            comments: HashMap::from([
                (1, vec![comment(1, 10), comment(1, 11)]),
                (2, vec![comment(2, 20)]),
            ]),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink {
            fail_comment: Some(10),
            ..Default::default()
        });

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        assert_eq!(sink.comment_attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sorted(&sink.persisted_comments), vec![11, 20]);
        assert_eq!(sorted(&sink.persisted_posts), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_comment_fetch_failure_is_isolated() {
        let source = Arc::new(FakeSource {
            posts: vec![post(1), post(2)],
            comments: HashMap::from([(1, vec![comment(1, 10)]), (2, vec![comment(2, 20)])]),
            fail_comments_for: Some(1),
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        // Post 1's comment fetch failed; its unit completed anyway and post
        // 2's comments were unaffected.
        assert_eq!(sorted(&sink.persisted_posts), vec![1, 2]);
        assert_eq!(sorted(&sink.persisted_comments), vec![20]);
    }

    #[tokio::test]
    async fn test_completion_invariant_across_many_units() {
        let posts: Vec<Post> = (1..=25).map(post).collect();
        let comments: HashMap<i32, Vec<Comment>> = (1..=25)
            .map(|post_id| {
                let owned = (0..4)
                    .map(|n| comment(post_id, post_id * 100 + n))
                    .collect();
                (post_id, owned)
            })
            .collect();

        let source = Arc::new(FakeSource {
            posts,
            comments,
            ..Default::default()
        });
        let sink = Arc::new(FakeSink::default());

        Pipeline::new(Arc::clone(&source), Arc::clone(&sink))
            .run("7")
            .await
            .unwrap();

        // run returned, so every unit at both levels must be accounted for
        // exactly once.
        assert_eq!(sink.post_attempts.load(Ordering::SeqCst), 25);
        assert_eq!(sink.comment_attempts.load(Ordering::SeqCst), 100);
        assert_eq!(sink.persisted_posts.lock().unwrap().len(), 25);
        assert_eq!(sink.persisted_comments.lock().unwrap().len(), 100);
        assert_eq!(source.comment_fetches.lock().unwrap().len(), 25);
    }
}
