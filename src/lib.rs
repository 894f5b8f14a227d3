pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod notify;
pub mod post;
pub mod utils;

pub use auth::context::AuthContext;
pub use notify::{Notice, NoticeKind, Notifier};
pub use post::list_controller::PostListController;
pub use post::post_gateway::PostGateway;
pub use post::post_model::{ListQuery, PAGE_SIZE, Post, PostForm, PostPage};
pub use utils::error::CustomError;
