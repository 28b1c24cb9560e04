//! Approvals: moderator sign-off turned into network-wide access.

pub mod models;
pub mod processor;

pub use models::ApprovedUser;
pub use processor::{ApprovalCycle, ApprovalProcessor, Resolution, APPROVAL_REPLY};
