use crate::models::{Category, Comment, PostStatus, Tag, User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use validator::Validate;

// DTOs define the structure of data exchanged with clients.
// They are separate from database models to control exactly what is exposed.

/// Deserializer for patch fields where null and absent mean different things.
///
/// Wrapped in `#[serde(default, deserialize_with = "double_option")]`:
/// - field absent        -> None            (leave the value alone)
/// - field present, null -> Some(None)      (clear the value)
/// - field present, set  -> Some(Some(v))
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "confirmPassword")]
    pub password_confirm: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

// ============================================================================
// Pagination & Query DTOs
// ============================================================================

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: i32,
    pub limit: i32,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PaginationDto {
    pub fn new(page: i32, limit: i32, total: i64) -> Self {
        let total_pages = (total + limit as i64 - 1) / limit as i64;
        PaginationDto {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

// ============================================================================
// User DTOs
// ============================================================================

/// User data sent to clients, password hash stripped.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

/// Profile payload with authoring statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeData {
    pub user: FilterUserDto,
    pub post_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeResponseDto {
    pub status: String,
    pub data: UserMeData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub name: String,
}

/// Generic success response
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdateDto {
    pub role: UserRole,
}

#[derive(Debug, Validate, Default, Clone, Serialize, Deserialize)]
pub struct UserPasswordUpdateDto {
    #[validate(length(min = 6, message = "new password must be at least 6 characters"))]
    pub new_password: String,

    #[validate(
        length(
            min = 6,
            message = "new password confirm must be at least 6 characters"
        ),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,

    #[validate(length(min = 6, message = "Old password must be at least 6 characters"))]
    pub old_password: String,
}

// ============================================================================
// Category DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCategoryDto {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    /// Optional explicit slug; derived from the name when absent.
    #[validate(length(min = 1, message = "Slug cannot be empty"))]
    pub slug: Option<String>,

    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,

    #[serde(rename = "sortOrder")]
    pub sort_order: Option<i32>,

    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
}

/// Patch body for category updates.
///
/// Scalar fields use plain Option: absent means keep. The nullable columns
/// and the parent use the double Option so clients can send an explicit
/// null, which for `parent_id` means "move to root".
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Slug cannot be empty"))]
    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,

    #[serde(rename = "sortOrder")]
    pub sort_order: Option<i32>,

    #[serde(rename = "parentId", default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: i32,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl CategoryDto {
    pub fn from_model(category: &Category) -> Self {
        CategoryDto {
            id: category.id,
            name: category.name.to_owned(),
            slug: category.slug.to_owned(),
            description: category.description.to_owned(),
            image: category.image.to_owned(),
            color: category.color.to_owned(),
            sort_order: category.sort_order,
            parent_id: category.parent_id,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// Node of the nested navigation tree.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryTreeDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: i32,
    pub children: Vec<CategoryTreeDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponseDto {
    pub status: String,
    pub data: CategoryDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponseDto {
    pub status: String,
    pub data: Vec<CategoryDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryTreeResponseDto {
    pub status: String,
    pub data: Vec<CategoryTreeDto>,
}

// ============================================================================
// Tag DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTagDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Slug cannot be empty"))]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl TagDto {
    pub fn from_model(tag: &Tag) -> Self {
        TagDto {
            id: tag.id,
            name: tag.name.to_owned(),
            slug: tag.slug.to_owned(),
        }
    }

    pub fn from_models(tags: &[Tag]) -> Vec<TagDto> {
        tags.iter().map(TagDto::from_model).collect()
    }
}

/// Tag with usage count for the admin listing.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagWithCountDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "postCount")]
    pub post_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponseDto {
    pub status: String,
    pub data: TagDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagListResponseDto {
    pub status: String,
    pub data: Vec<TagWithCountDto>,
    pub results: i64,
}

// ============================================================================
// Post DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePostDto {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required."))]
    pub content: String,

    #[validate(length(min = 1, message = "Slug cannot be empty"))]
    pub slug: Option<String>,

    #[validate(length(max = 500, message = "Excerpt must be at most 500 characters"))]
    pub excerpt: Option<String>,

    pub status: Option<PostStatus>,

    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,

    #[serde(rename = "tagIds")]
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePostDto {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content is required."))]
    pub content: Option<String>,

    #[validate(length(min = 1, message = "Slug cannot be empty"))]
    pub slug: Option<String>,

    #[validate(length(max = 500, message = "Excerpt must be at most 500 characters"))]
    pub excerpt: Option<String>,

    pub status: Option<PostStatus>,

    #[serde(rename = "categoryId", default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,

    #[serde(rename = "tagIds")]
    pub tag_ids: Option<Vec<i64>>,
}

/// List row for post indexes, full content omitted.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostItemDto {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub status: PostStatus,
    #[serde(rename = "authorName")]
    pub author_name: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(rename = "categoryName")]
    pub category_name: Option<String>,
    #[serde(rename = "categorySlug")]
    pub category_slug: Option<String>,
    #[serde(rename = "readingMinutes")]
    pub reading_minutes: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Detail row, same joins as the list plus the rendered content.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostDetailDto {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub status: PostStatus,
    #[serde(rename = "authorName")]
    pub author_name: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(rename = "categoryName")]
    pub category_name: Option<String>,
    #[serde(rename = "categorySlug")]
    pub category_slug: Option<String>,
    #[serde(rename = "readingMinutes")]
    pub reading_minutes: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailData {
    pub post: PostDetailDto,
    pub tags: Vec<TagDto>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponseDto {
    pub status: String,
    pub data: PostDetailData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponseDto {
    pub status: String,
    pub data: Vec<PostItemDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostsQueryParams {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 25))]
    pub limit: Option<i32>,

    /// Filter by category slug.
    #[validate(length(min = 1))]
    pub category: Option<String>,

    /// Filter by tag slug.
    #[validate(length(min = 1))]
    pub tag: Option<String>,

    /// Filter by author name.
    #[validate(length(min = 1))]
    pub author: Option<String>,

    /// Admin listing only; the public route always serves published posts.
    pub status: Option<PostStatus>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GenerateDraftDto {
    #[validate(length(min = 1, message = "Prompt is required."))]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftDto {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftResponseDto {
    pub status: String,
    pub data: DraftDto,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Content must be between 1 and 1000 characters"
    ))]
    pub content: String,

    /// Required for guests, ignored for authenticated submitters.
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,

    #[serde(rename = "authorEmail")]
    pub author_email: Option<String>,

    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
}

/// Public comment shape. Author emails never leave the server here.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i64,
    #[serde(rename = "postId")]
    pub post_id: i64,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "authorName")]
    pub author_name: String,
    pub content: String,
    #[serde(rename = "isGuest")]
    pub is_guest: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl CommentDto {
    pub fn from_model(comment: &Comment) -> Self {
        CommentDto {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_name: comment.author_name.to_owned(),
            content: comment.content.to_owned(),
            is_guest: comment.is_guest,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentThreadDto {
    pub comment: CommentDto,
    pub replies: Vec<CommentDto>,
}

#[derive(Debug, Serialize)]
pub struct CommentThreadResponseDto {
    pub status: String,
    pub data: Vec<CommentThreadDto>,
    pub results: i64,
}

/// Moderation-queue row, joined with the post title.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminCommentDto {
    pub id: i64,
    #[serde(rename = "postId")]
    pub post_id: i64,
    #[serde(rename = "postTitle")]
    pub post_title: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "authorName")]
    pub author_name: String,
    #[serde(rename = "authorEmail")]
    pub author_email: String,
    pub content: String,
    pub approved: bool,
    #[serde(rename = "isGuest")]
    pub is_guest: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminCommentListResponseDto {
    pub status: String,
    pub data: Vec<AdminCommentDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct SingleCommentResponseDto {
    pub status: String,
    pub data: CommentDto,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminCommentsQuery {
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i32>,

    /// true restricts the listing to the pending queue.
    pub pending: Option<bool>,

    #[serde(rename = "postId")]
    pub post_id: Option<i64>,
}

// ============================================================================
// Settings DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsDto {
    #[validate(length(min = 1, message = "At least one setting is required"))]
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponseDto {
    pub status: String,
    pub data: HashMap<String, String>,
}

// ============================================================================
// Search & Misc DTOs
// ============================================================================

#[derive(Debug, Validate, Deserialize)]
pub struct GetSearchQuery {
    #[validate(length(min = 1))]
    pub q: String,

    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 25))]
    pub limit: Option<i32>,
}

/// Body of the LLM responses call.
#[derive(Debug, Serialize)]
pub struct LlmRequestInput {
    pub model: String,
    pub input: String,
}
