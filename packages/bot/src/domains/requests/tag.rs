/// Link flair values that drive the request workflow.
///
/// Flair text is normalized once here (trimmed, lowercased); the watchers match
/// on the variant rather than comparing strings.
///
/// ```text
/// (none) ──"request"──► tracked ──"approved" | "complete"──► resolved
///                          └── anything else: stays tracked
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowTag {
    Untagged,
    Request,
    Approved,
    Complete,
    Other(String),
}

impl WorkflowTag {
    pub fn parse(raw: Option<&str>) -> Self {
        let normalized = match raw {
            Some(text) => text.trim().to_lowercase(),
            None => return WorkflowTag::Untagged,
        };

        match normalized.as_str() {
            "" => WorkflowTag::Untagged,
            "request" => WorkflowTag::Request,
            "approved" => WorkflowTag::Approved,
            "complete" => WorkflowTag::Complete,
            _ => WorkflowTag::Other(normalized),
        }
    }

    /// The post is an access request the bot should track.
    pub fn is_request(&self) -> bool {
        matches!(self, WorkflowTag::Request)
    }

    /// A moderator has signed off on the request.
    pub fn grants_access(&self) -> bool {
        matches!(self, WorkflowTag::Approved | WorkflowTag::Complete)
    }
}
