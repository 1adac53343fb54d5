pub mod password;
pub mod slug;
pub mod text;
pub mod token;
