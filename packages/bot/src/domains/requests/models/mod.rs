pub mod request_post;

pub use request_post::RequestPost;
