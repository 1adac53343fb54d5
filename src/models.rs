use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role stored as the PostgreSQL ENUM "user_role".
///
/// Admins own the editorial surface: posts, taxonomy, settings and the
/// comment moderation queue. Everyone else is a plain authenticated reader.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Node of the category forest.
///
/// `slug` is unique across the whole table, not per level. `parent_id` is
/// None for roots; the tree depth is otherwise unbounded. Sibling ordering
/// in rendered navigation follows `sort_order`, then name.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Publication state stored as the PostgreSQL ENUM "post_status".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

/// Blog post row.
///
/// `content` holds sanitized HTML for rendering; `raw_text` is the plain
/// text derived from it at write time and is what search matches against.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Post {
    pub id: i64,
    pub user_id: Uuid,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub raw_text: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub reading_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment row, one level of threading.
///
/// `author_name` and `author_email` are always populated. For authenticated
/// submissions they are copied from the account at write time and `is_guest`
/// is false; the snapshot does not change if the account is later renamed or
/// deleted (`user_id` then goes null, the display fields stay). `approved`
/// is the only moderation flag: false means pending, whether the comment is
/// new or was sent back by a moderator.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub approved: bool,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the flat site-settings store.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Setting {
    pub name: String,
    pub value: String,
}
