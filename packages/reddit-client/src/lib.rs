//! Pure Reddit REST API client.
//!
//! A minimal client for the parts of the Reddit API a moderation bot needs:
//! submission listings, replies, contributor management, the inbox, and
//! moderator invites. Authenticates as a script app with the OAuth password
//! grant and refreshes the bearer token before it expires.
//!
//! # Example
//!
//! ```rust,ignore
//! use reddit_client::{Credentials, RedditClient};
//!
//! let client = RedditClient::new(Credentials {
//!     client_id: "id".into(),
//!     client_secret: "secret".into(),
//!     username: "bot".into(),
//!     password: "hunter2".into(),
//!     user_agent: "my-bot/1.0".into(),
//! })?;
//!
//! for post in client.new_submissions("rust", 25).await? {
//!     println!("{} {:?}", post.id, post.link_flair_text);
//! }
//! ```

pub mod error;
pub mod stream;
pub mod types;

pub use error::{RedditError, Result};
pub use stream::{fresh_in_order, new_submissions, SeenIds};
pub use types::{
    Credentials, InboxItem, InboxItemData, Listing, Submission, SubredditAbout, Thing,
    LINK_PREFIX,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{redirect, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use types::{JsonEnvelope, SubredditNames, TokenResponse};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";

/// Refresh this long before Reddit says the token expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Largest page size Reddit accepts on listing endpoints.
const MAX_PAGE: u32 = 100;

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated Reddit API client. Cheap to clone; clones share the token.
#[derive(Clone)]
pub struct RedditClient {
    client: reqwest::Client,
    credentials: Arc<Credentials>,
    token: Arc<RwLock<Option<AccessToken>>>,
    api_url: String,
    auth_url: String,
}

impl RedditClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| RedditError::Network(e.to_string()))?;

        Ok(Self {
            client,
            credentials: Arc::new(credentials),
            token: Arc::new(RwLock::new(None)),
            api_url: API_URL.to_string(),
            auth_url: AUTH_URL.to_string(),
        })
    }

    /// Point the client at different endpoints (proxies, test servers).
    pub fn with_base_urls(mut self, api_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.auth_url = auth_url.into();
        self
    }

    /// The account this client acts as.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Newest submissions of a subreddit, newest first.
    pub async fn new_submissions(&self, subreddit: &str, limit: u32) -> Result<Vec<Submission>> {
        let limit = limit.clamp(1, MAX_PAGE).to_string();
        let listing: Listing<Submission> = self
            .get(&format!("/r/{}/new", subreddit), &[("limit", limit.as_str())])
            .await?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Fetch a single submission by its base-36 id (without the `t3_` prefix).
    pub async fn submission(&self, id: &str) -> Result<Submission> {
        let path = format!("/by_id/{}{}", LINK_PREFIX, id);
        let listing: Listing<Submission> = self.get(&path, &[]).await?;

        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|c| c.data)
            .ok_or(RedditError::NotFound(path))
    }

    /// Comment on a thing identified by fullname (e.g. `t3_abc`).
    pub async fn reply(&self, thing_fullname: &str, text: &str) -> Result<()> {
        self.post_form("/api/comment", &[("thing_id", thing_fullname), ("text", text)])
            .await
    }

    /// Add `username` to the approved-user (contributor) list of `subreddit`.
    pub async fn add_contributor(&self, subreddit: &str, username: &str) -> Result<()> {
        self.post_form(
            &format!("/r/{}/api/friend", subreddit),
            &[("name", username), ("type", "contributor")],
        )
        .await
    }

    /// All unread inbox items, following pagination. Does not mark anything read.
    pub async fn unread_messages(&self) -> Result<Vec<InboxItem>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        let limit = MAX_PAGE.to_string();

        loop {
            let listing: Listing<InboxItemData> = {
                let mut query = vec![("mark", "false"), ("limit", limit.as_str())];
                if let Some(cursor) = after.as_deref() {
                    query.push(("after", cursor));
                }
                self.get("/message/unread", &query).await?
            };
            items.extend(listing.data.children);

            match listing.data.after {
                Some(next) => after = Some(next),
                None => break,
            }
        }

        debug!(count = items.len(), "Fetched unread inbox");
        Ok(items)
    }

    /// Mark an inbox item read by fullname (e.g. `t4_abc`).
    pub async fn mark_read(&self, fullname: &str) -> Result<()> {
        self.post_form("/api/read_message", &[("id", fullname)]).await
    }

    /// Accept a pending moderator invite for `subreddit`.
    pub async fn accept_moderator_invite(&self, subreddit: &str) -> Result<()> {
        self.post_form(&format!("/r/{}/api/accept_moderator_invite", subreddit), &[])
            .await
    }

    /// Whether a subreddit with exactly this name exists.
    pub async fn subreddit_exists(&self, name: &str) -> Result<bool> {
        let result: Result<SubredditNames> = self
            .get(
                "/api/search_reddit_names",
                &[("query", name), ("exact", "true"), ("include_over_18", "true")],
            )
            .await;

        match result {
            Ok(found) => Ok(found.names.iter().any(|n| n.eq_ignore_ascii_case(name))),
            Err(RedditError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn about_subreddit(&self, subreddit: &str) -> Result<SubredditAbout> {
        let about: Thing<SubredditAbout> =
            self.get(&format!("/r/{}/about", subreddit), &[]).await?;
        Ok(about.data)
    }

    /// Whether the authenticated account moderates `subreddit`.
    pub async fn is_moderator(&self, subreddit: &str) -> Result<bool> {
        let about = self.about_subreddit(subreddit).await?;
        let moderator = about.user_is_moderator.unwrap_or(false);
        debug!(subreddit = %about.display_name, moderator, "Checked moderator status");
        Ok(moderator)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        let resp = self
            .send_authorized(path, |token| {
                self.client
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("raw_json", "1")])
                    .query(query)
            })
            .await?;

        resp.json()
            .await
            .map_err(|e| RedditError::Parse(format!("{}: {}", path, e)))
    }

    /// POST a form with `api_type=json` and surface any `json.errors`.
    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = format!("{}{}", self.api_url, path);
        let mut body: Vec<(&str, &str)> = vec![("api_type", "json")];
        body.extend_from_slice(form);

        let resp = self
            .send_authorized(path, |token| {
                self.client.post(&url).bearer_auth(token).form(&body)
            })
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }

        // Some endpoints answer `{}` or a bare object; only `json.errors` matters.
        let envelope: JsonEnvelope = serde_json::from_str(&text).unwrap_or_default();
        match envelope.error_message() {
            Some(message) => Err(RedditError::Api { status, message }),
            None => Ok(()),
        }
    }

    /// Send a request built around the current bearer token. A 401 means the
    /// token was revoked early, so it is dropped and the request is sent once
    /// more with a fresh one.
    async fn send_authorized<F>(&self, path: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let resp = build(&token).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return self.check_status(resp, path).await;
        }

        debug!(path, "Access token rejected; refreshing");
        self.token.write().await.take();
        let token = self.access_token().await?;
        let resp = build(&token).send().await?;
        self.check_status(resp, path).await
    }

    async fn check_status(&self, resp: Response, path: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh token on the next call.
            self.token.write().await.take();
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(path, status = status.as_u16(), "Reddit API error");
        Err(error_for_status(status, path, body))
    }

    async fn access_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let creds = &self.credentials;
        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Reddit token endpoint error");
            return Err(token_error(status, body));
        }

        let token: TokenResponse = resp.json().await?;
        if let Some(error) = token.error {
            return Err(RedditError::Auth(error));
        }

        let value = token
            .access_token
            .ok_or_else(|| RedditError::Parse("token response missing access_token".into()))?;
        let ttl = Duration::from_secs(token.expires_in.unwrap_or(3600))
            .saturating_sub(TOKEN_REFRESH_MARGIN);

        debug!(username = %creds.username, ttl_secs = ttl.as_secs(), "Obtained Reddit access token");
        Ok(AccessToken {
            value,
            expires_at: Instant::now() + ttl,
        })
    }
}

/// Map a failed token exchange. Bad credentials are an `Auth` error; anything
/// else (outages, rate limits) keeps its status so callers can retry it.
fn token_error(status: StatusCode, body: String) -> RedditError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RedditError::Auth(format!("token endpoint returned {}: {}", status, body))
        }
        _ => RedditError::Api {
            status: status.as_u16(),
            message: format!("token endpoint: {}", body),
        },
    }
}

/// Map a non-2xx status to an error. Missing things come back as 404, or as a
/// redirect to the search page for unknown subreddits.
fn error_for_status(status: StatusCode, path: &str, body: String) -> RedditError {
    if status == StatusCode::NOT_FOUND || status.is_redirection() {
        RedditError::NotFound(path.to_string())
    } else {
        RedditError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}
