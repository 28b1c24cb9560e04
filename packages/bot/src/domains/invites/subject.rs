use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Substring match, so "re: invitation to moderate /r/foo" still counts
    static ref INVITE_SUBJECT: Regex =
        Regex::new(r"invitation to moderate /r/([^/\s]+)").unwrap();
}

/// Subreddit named by a moderation-invite subject line, if it is one.
pub fn invited_subreddit(subject: &str) -> Option<String> {
    INVITE_SUBJECT
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_invite() {
        assert_eq!(
            invited_subreddit("invitation to moderate /r/foo"),
            Some("foo".to_string())
        );
    }

    #[test]
    fn test_reply_prefix_still_matches() {
        assert_eq!(
            invited_subreddit("re: invitation to moderate /r/foo"),
            Some("foo".to_string())
        );
    }

    #[test]
    fn test_unrelated_subject() {
        assert_eq!(invited_subreddit("hello"), None);
        assert_eq!(invited_subreddit("invitation to moderate /r/"), None);
    }

    #[test]
    fn test_name_stops_at_slash_or_space() {
        assert_eq!(
            invited_subreddit("invitation to moderate /r/foo_bar/"),
            Some("foo_bar".to_string())
        );
        assert_eq!(
            invited_subreddit("invitation to moderate /r/foo (reminder)"),
            Some("foo".to_string())
        );
    }
}
