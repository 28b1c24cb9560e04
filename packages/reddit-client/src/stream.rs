//! Polling stream of new submissions.
//!
//! Reddit has no push API for new posts, so the stream polls `/r/{sr}/new`,
//! remembers recently seen ids, and yields anything unseen oldest-first. The
//! first poll yields the whole current page so posts made while the consumer
//! was offline are not missed.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use futures::stream::{self, Stream};

use crate::{RedditClient, Result, Submission};

/// How many ids to remember. Must exceed one page so a quiet subreddit never
/// re-yields its front page.
const SEEN_CAPACITY: usize = 300;

const PAGE_SIZE: u32 = 100;

/// Insertion-ordered set that forgets its oldest entries past `capacity`.
#[derive(Debug, Clone)]
pub struct SeenIds {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl SeenIds {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }

        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Filter a newest-first page down to unseen submissions, oldest first.
pub fn fresh_in_order(page: Vec<Submission>, seen: &mut SeenIds) -> Vec<Submission> {
    page.into_iter()
        .rev()
        .filter(|s| seen.insert(&s.id))
        .collect()
}

struct StreamState {
    client: RedditClient,
    subreddit: String,
    poll_interval: Duration,
    seen: SeenIds,
    buffered: VecDeque<Submission>,
    polled_once: bool,
}

/// An endless stream of new submissions in `subreddit`.
///
/// A failed poll yields the error and the stream keeps polling afterwards;
/// consumers decide whether to keep reading or resubscribe.
pub fn new_submissions(
    client: RedditClient,
    subreddit: impl Into<String>,
    poll_interval: Duration,
) -> impl Stream<Item = Result<Submission>> + Send + 'static {
    let state = StreamState {
        client,
        subreddit: subreddit.into(),
        poll_interval,
        seen: SeenIds::with_capacity(SEEN_CAPACITY),
        buffered: VecDeque::new(),
        polled_once: false,
    };

    stream::unfold(state, next_submission)
}

async fn next_submission(mut state: StreamState) -> Option<(Result<Submission>, StreamState)> {
    loop {
        if let Some(submission) = state.buffered.pop_front() {
            return Some((Ok(submission), state));
        }

        if state.polled_once {
            tokio::time::sleep(state.poll_interval).await;
        }
        state.polled_once = true;

        match state.client.new_submissions(&state.subreddit, PAGE_SIZE).await {
            Ok(page) => {
                let fresh = fresh_in_order(page, &mut state.seen);
                if !fresh.is_empty() {
                    tracing::debug!(subreddit = %state.subreddit, count = fresh.len(), "New submissions");
                }
                state.buffered.extend(fresh);
            }
            Err(e) => return Some((Err(e), state)),
        }
    }
}
