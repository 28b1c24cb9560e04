use serde::{Deserialize, Serialize};

/// Fullname prefix for links (submissions).
pub const LINK_PREFIX: &str = "t3_";

/// Script-app credentials for the OAuth password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// Response of `POST /api/v1/access_token`.
///
/// Reddit answers a rejected password grant with HTTP 200 and an `error` field.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
}

/// A typed wrapper: `{"kind": "t3", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    pub children: Vec<Thing<T>>,
    pub after: Option<String>,
}

/// A page of things as returned by listing endpoints.
pub type Listing<T> = Thing<ListingData<T>>;

/// A link or self post.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: Option<String>,
    pub link_flair_text: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub created_utc: f64,
}

impl Submission {
    /// The author's username, or `None` once the account has been deleted.
    pub fn author_name(&self) -> Option<&str> {
        match self.author.as_deref() {
            None | Some("[deleted]") | Some("") => None,
            Some(name) => Some(name),
        }
    }
}

/// Data of an inbox item. Private messages (`t4`) and comment replies (`t1`)
/// share this shape closely enough for triage.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InboxItemData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub author: Option<String>,
    pub subreddit: Option<String>,
    #[serde(default)]
    pub was_comment: bool,
}

pub type InboxItem = Thing<InboxItemData>;

/// Subreddit metadata from `GET /r/{sr}/about`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubredditAbout {
    pub display_name: String,
    pub user_is_moderator: Option<bool>,
}

/// Response of `GET /api/search_reddit_names`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubredditNames {
    pub names: Vec<String>,
}

/// Envelope of write endpoints called with `api_type=json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonEnvelope {
    #[serde(default)]
    pub json: Option<JsonBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonBody {
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
}

impl JsonEnvelope {
    /// Flatten `[["CODE", "message", "field"], ...]` into `"CODE: message; ..."`.
    pub fn error_message(&self) -> Option<String> {
        let errors = &self.json.as_ref()?.errors;
        if errors.is_empty() {
            return None;
        }

        let parts: Vec<String> = errors
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .take(2)
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect();
        Some(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_listing() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_abc",
                "children": [
                    {"kind": "t3", "data": {
                        "id": "123", "name": "t3_123", "title": "Add me",
                        "selftext": "please", "author": "alice",
                        "link_flair_text": "Request", "subreddit": "hub",
                        "created_utc": 1700000000.0
                    }},
                    {"kind": "t3", "data": {
                        "id": "124", "name": "t3_124", "author": "[deleted]",
                        "link_flair_text": null, "subreddit": "hub"
                    }}
                ]
            }
        }"#;

        let listing: Listing<Submission> = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.data.children.len(), 2);

        let first = &listing.data.children[0].data;
        assert_eq!(first.link_flair_text.as_deref(), Some("Request"));
        assert_eq!(first.author_name(), Some("alice"));

        let second = &listing.data.children[1].data;
        assert_eq!(second.author_name(), None);
        assert!(second.title.is_empty());
    }

    #[test]
    fn parses_mixed_inbox() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    {"kind": "t4", "data": {
                        "id": "m1", "name": "t4_m1",
                        "subject": "invitation to moderate /r/foo",
                        "body": "gadzooks!", "author": null, "subreddit": "foo",
                        "was_comment": false
                    }},
                    {"kind": "t1", "data": {
                        "id": "c1", "name": "t1_c1", "subject": "comment reply",
                        "body": "thanks", "author": "bob", "subreddit": "hub",
                        "was_comment": true
                    }}
                ]
            }
        }"#;

        let listing: Listing<InboxItemData> = serde_json::from_str(raw).unwrap();
        let kinds: Vec<_> = listing.data.children.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["t4", "t1"]);
        assert!(listing.data.children[1].data.was_comment);
    }

    #[test]
    fn flattens_json_errors() {
        let raw = r#"{"json": {"errors": [["NO_INVITE_FOUND", "no invite found", null]]}}"#;
        let envelope: JsonEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(
            envelope.error_message().as_deref(),
            Some("NO_INVITE_FOUND: no invite found")
        );

        let ok: JsonEnvelope = serde_json::from_str(r#"{"json": {"errors": []}}"#).unwrap();
        assert!(ok.error_message().is_none());

        let empty: JsonEnvelope = serde_json::from_str("{}").unwrap();
        assert!(empty.error_message().is_none());
    }
}
