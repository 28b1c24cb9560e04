pub mod approved_user;

pub use approved_user::ApprovedUser;
