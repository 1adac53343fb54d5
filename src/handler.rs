pub mod auth;
pub mod category;
pub mod comment;
pub mod post;
pub mod search;
pub mod settings;
pub mod tag;
pub mod users;
