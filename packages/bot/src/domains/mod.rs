pub mod approvals;
pub mod invites;
pub mod requests;
