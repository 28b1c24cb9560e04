// MockPlatform - in-memory Reddit for testing
//
// Holds submissions, an inbox, pending moderator invites and contributor
// lists, and records every call so tests can assert on side effects.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::{BasePlatform, InboxItem, InboxItemKind, PlatformError, PlatformResult, Submission};

/// Build a submission for tests.
pub fn mock_submission(id: &str, author: &str, tag: Option<&str>) -> Submission {
    Submission {
        id: id.to_string(),
        author: Some(author.to_string()),
        tag: tag.map(str::to_string),
        title: format!("Request {}", id),
        body: String::new(),
    }
}

#[derive(Default)]
struct MockState {
    submissions: HashMap<String, Submission>,
    streams: VecDeque<Vec<PlatformResult<Submission>>>,
    subscriptions: usize,
    subreddits: HashSet<String>,
    moderated: HashSet<String>,
    pending_invites: HashSet<String>,
    accepted_invites: Vec<String>,
    inbox: Vec<InboxItem>,
    inbox_failures: VecDeque<PlatformError>,
    inbox_reads: usize,
    read: Vec<String>,
    next_message: usize,
    contributors: HashMap<String, BTreeSet<String>>,
    grant_calls: Vec<(String, String)>,
    failing_grants: HashMap<String, PlatformError>,
    replies: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Arrange
    // -------------------------------------------------------------------------

    /// Add (or replace) a submission that `submission()` will return
    pub fn add_submission(&self, submission: Submission) {
        self.state
            .lock()
            .unwrap()
            .submissions
            .insert(submission.id.clone(), submission);
    }

    /// Change a submission's flair, as a moderator would
    pub fn set_tag(&self, id: &str, tag: Option<&str>) {
        if let Some(submission) = self.state.lock().unwrap().submissions.get_mut(id) {
            submission.tag = tag.map(str::to_string);
        }
    }

    /// Delete a submission so lookups return NotFound
    pub fn delete_submission(&self, id: &str) {
        self.state.lock().unwrap().submissions.remove(id);
    }

    /// Queue the events for the next subscription. The stream stays open
    /// after the last event unless that event is an error.
    pub fn queue_stream(&self, events: Vec<PlatformResult<Submission>>) {
        self.state.lock().unwrap().streams.push_back(events);
    }

    pub fn add_subreddit(&self, name: &str, moderated: bool) {
        let mut state = self.state.lock().unwrap();
        state.subreddits.insert(name.to_string());
        if moderated {
            state.moderated.insert(name.to_string());
        }
    }

    /// Create a pending invite and deliver the matching inbox message.
    /// Returns the message fullname.
    pub fn invite_moderator(&self, subreddit: &str) -> String {
        let fullname = self.push_message(&format!("invitation to moderate /r/{}", subreddit));
        let mut state = self.state.lock().unwrap();
        state.subreddits.insert(subreddit.to_string());
        state.pending_invites.insert(subreddit.to_string());
        fullname
    }

    /// Withdraw a pending invite without touching the inbox
    pub fn expire_invite(&self, subreddit: &str) {
        self.state.lock().unwrap().pending_invites.remove(subreddit);
    }

    /// Deliver a private message with `subject`. Returns its fullname.
    pub fn push_message(&self, subject: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_message += 1;
        let fullname = format!("t4_{}", state.next_message);
        state.inbox.push(InboxItem {
            fullname: fullname.clone(),
            kind: InboxItemKind::Message,
            subject: subject.to_string(),
            author: None,
        });
        fullname
    }

    /// Deliver an arbitrary inbox item
    pub fn push_inbox_item(&self, item: InboxItem) {
        self.state.lock().unwrap().inbox.push(item);
    }

    /// Make every grant on `subreddit` fail with `error`
    pub fn fail_grants_on(&self, subreddit: &str, error: PlatformError) {
        self.state
            .lock()
            .unwrap()
            .failing_grants
            .insert(subreddit.to_string(), error);
    }

    /// Make the next `unread_inbox` call fail with `error`
    pub fn fail_next_inbox(&self, error: PlatformError) {
        self.state.lock().unwrap().inbox_failures.push_back(error);
    }

    pub fn clear_grant_failures(&self) {
        self.state.lock().unwrap().failing_grants.clear();
    }

    /// Seed a contributor without recording a grant call
    pub fn seed_contributor(&self, subreddit: &str, username: &str) {
        self.state
            .lock()
            .unwrap()
            .contributors
            .entry(subreddit.to_string())
            .or_default()
            .insert(username.to_string());
    }

    // -------------------------------------------------------------------------
    // Assert
    // -------------------------------------------------------------------------

    /// Contributors of `subreddit`, sorted
    pub fn contributors(&self, subreddit: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .contributors
            .get(subreddit)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every `(subreddit, username)` grant attempted, in order
    pub fn grant_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().grant_calls.clone()
    }

    /// Every `(submission_id, text)` reply posted, in order
    pub fn replies(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().replies.clone()
    }

    /// Fullnames of items marked read, in order
    pub fn read_items(&self) -> Vec<String> {
        self.state.lock().unwrap().read.clone()
    }

    /// Fullnames of items still unread
    pub fn unread_items(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .inbox
            .iter()
            .map(|item| item.fullname.clone())
            .collect()
    }

    pub fn accepted_invites(&self) -> Vec<String> {
        self.state.lock().unwrap().accepted_invites.clone()
    }

    /// How many times the inbox was listed, failed calls included
    pub fn inbox_reads(&self) -> usize {
        self.state.lock().unwrap().inbox_reads
    }

    /// How many times `submission_stream` was called
    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions
    }
}

#[async_trait]
impl BasePlatform for MockPlatform {
    fn submission_stream(&self, _subreddit: &str) -> BoxStream<'static, PlatformResult<Submission>> {
        let mut state = self.state.lock().unwrap();
        state.subscriptions += 1;

        match state.streams.pop_front() {
            Some(events) => {
                let closes = matches!(events.last(), Some(Err(_)));
                let events = stream::iter(events);
                if closes {
                    events.boxed()
                } else {
                    events.chain(stream::pending()).boxed()
                }
            }
            None => stream::pending().boxed(),
        }
    }

    async fn submission(&self, id: &str) -> PlatformResult<Submission> {
        self.state
            .lock()
            .unwrap()
            .submissions
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("submission {}", id)))
    }

    async fn reply(&self, submission_id: &str, text: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.submissions.contains_key(submission_id) {
            return Err(PlatformError::NotFound(format!("submission {}", submission_id)));
        }
        state
            .replies
            .push((submission_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn add_contributor(&self, subreddit: &str, username: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .grant_calls
            .push((subreddit.to_string(), username.to_string()));

        if let Some(error) = state.failing_grants.get(subreddit) {
            return Err(error.clone());
        }

        state
            .contributors
            .entry(subreddit.to_string())
            .or_default()
            .insert(username.to_string());
        Ok(())
    }

    async fn unread_inbox(&self) -> PlatformResult<Vec<InboxItem>> {
        let mut state = self.state.lock().unwrap();
        state.inbox_reads += 1;
        if let Some(error) = state.inbox_failures.pop_front() {
            return Err(error);
        }
        Ok(state.inbox.clone())
    }

    async fn mark_read(&self, item: &InboxItem) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state.inbox.retain(|unread| unread.fullname != item.fullname);
        state.read.push(item.fullname.clone());
        Ok(())
    }

    async fn accept_moderator_invite(&self, subreddit: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.pending_invites.remove(subreddit) {
            return Err(PlatformError::Rejected {
                status: 200,
                message: "NO_INVITE_FOUND: no invite found".to_string(),
            });
        }
        state.accepted_invites.push(subreddit.to_string());
        state.moderated.insert(subreddit.to_string());
        Ok(())
    }

    async fn subreddit_exists(&self, name: &str) -> PlatformResult<bool> {
        Ok(self.state.lock().unwrap().subreddits.contains(name))
    }

    async fn is_moderator_of(&self, subreddit: &str) -> PlatformResult<bool> {
        let state = self.state.lock().unwrap();
        if !state.subreddits.contains(subreddit) {
            return Err(PlatformError::NotFound(format!("r/{}", subreddit)));
        }
        Ok(state.moderated.contains(subreddit))
    }
}
