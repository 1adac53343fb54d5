use super::DBClient;
use crate::dtos::{PostDetailDto, PostItemDto};
use crate::models::{Post, PostStatus};
use uuid::Uuid;

/// Insert payload. Derived columns (`raw_text`, `excerpt`,
/// `reading_minutes`) are computed by the caller before the row is written.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub raw_text: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub reading_minutes: i32,
}

/// Full merged state for an update; the handler resolves patch semantics
/// before calling the store.
#[derive(Debug, Clone)]
pub struct PostPatch {
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub raw_text: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub reading_minutes: i32,
}

/// Optional listing filters, combined with AND.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilters<'a> {
    pub status: Option<PostStatus>,
    pub category_slug: Option<&'a str>,
    pub tag_slug: Option<&'a str>,
    pub author: Option<&'a str>,
    pub search: Option<&'a str>,
}

pub trait PostExt {
    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, sqlx::Error>;

    /// Detail row joined with author and category, for rendering.
    async fn get_post_detail_by_slug(
        &self,
        slug: &str,
        only_published: bool,
    ) -> Result<Option<PostDetailDto>, sqlx::Error>;

    async fn get_posts(
        &self,
        page: i32,
        limit: i32,
        filters: PostFilters<'_>,
    ) -> Result<Vec<PostItemDto>, sqlx::Error>;

    async fn count_posts(&self, filters: PostFilters<'_>) -> Result<i64, sqlx::Error>;

    async fn save_post(&self, new_post: NewPost) -> Result<Post, sqlx::Error>;

    async fn update_post(&self, post_id: i64, patch: PostPatch) -> Result<Post, sqlx::Error>;

    /// Comments and tag assignments go with the post via their foreign keys.
    async fn delete_post(&self, post_id: i64) -> Result<(), sqlx::Error>;

    /// Replace the post's tag set. Ids that match no tag are skipped.
    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<(), sqlx::Error>;

    async fn get_user_post_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error>;
}

const POST_COLUMNS: &str = "id, user_id, category_id, title, slug, content, raw_text, excerpt, \
                            status, reading_minutes, created_at, updated_at";

// Shared by the listing and count queries; binds $1..$5 in
// status/category/author/tag/search order.
const POST_FILTER_CLAUSE: &str = r#"
      ($1::post_status IS NULL OR p.status = $1)
      AND ($2::text IS NULL OR c.slug = $2)
      AND ($3::text IS NULL OR u.name = $3)
      AND ($4::text IS NULL OR EXISTS (
          SELECT 1 FROM post_tags pt
          INNER JOIN tags t ON pt.tag_id = t.id
          WHERE pt.post_id = p.id AND t.slug = $4))
      AND ($5::text IS NULL OR p.title ILIKE '%' || $5 || '%' OR p.raw_text ILIKE '%' || $5 || '%')"#;

impl PostExt for DBClient {
    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {} FROM posts WHERE slug = $1", POST_COLUMNS);

        sqlx::query_as::<_, Post>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_post_detail_by_slug(
        &self,
        slug: &str,
        only_published: bool,
    ) -> Result<Option<PostDetailDto>, sqlx::Error> {
        sqlx::query_as::<_, PostDetailDto>(
            r#"
            SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.status,
                   u.name AS author_name, p.category_id, c.name AS category_name,
                   c.slug AS category_slug, p.reading_minutes, p.created_at, p.updated_at
            FROM posts p
            INNER JOIN users u ON p.user_id = u.id
            LEFT JOIN categories c ON p.category_id = c.id
            WHERE p.slug = $1 AND (NOT $2::boolean OR p.status = 'published')
            "#,
        )
        .bind(slug)
        .bind(only_published)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_posts(
        &self,
        page: i32,
        limit: i32,
        filters: PostFilters<'_>,
    ) -> Result<Vec<PostItemDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let query = format!(
            r#"
            SELECT p.id, p.title, p.slug, p.excerpt, p.status,
                   u.name AS author_name, p.category_id, c.name AS category_name,
                   c.slug AS category_slug, p.reading_minutes, p.created_at, p.updated_at
            FROM posts p
            INNER JOIN users u ON p.user_id = u.id
            LEFT JOIN categories c ON p.category_id = c.id
            WHERE {}
            ORDER BY p.created_at DESC
            LIMIT $6 OFFSET $7
            "#,
            POST_FILTER_CLAUSE
        );

        sqlx::query_as::<_, PostItemDto>(&query)
            .bind(filters.status)
            .bind(filters.category_slug)
            .bind(filters.author)
            .bind(filters.tag_slug)
            .bind(filters.search)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
    }

    async fn count_posts(&self, filters: PostFilters<'_>) -> Result<i64, sqlx::Error> {
        let query = format!(
            r#"
            SELECT COUNT(*)
            FROM posts p
            INNER JOIN users u ON p.user_id = u.id
            LEFT JOIN categories c ON p.category_id = c.id
            WHERE {}
            "#,
            POST_FILTER_CLAUSE
        );

        sqlx::query_scalar::<_, i64>(&query)
            .bind(filters.status)
            .bind(filters.category_slug)
            .bind(filters.author)
            .bind(filters.tag_slug)
            .bind(filters.search)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_post(&self, new_post: NewPost) -> Result<Post, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO posts
                (user_id, category_id, title, slug, content, raw_text, excerpt, status, reading_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(new_post.user_id)
            .bind(new_post.category_id)
            .bind(&new_post.title)
            .bind(&new_post.slug)
            .bind(&new_post.content)
            .bind(&new_post.raw_text)
            .bind(&new_post.excerpt)
            .bind(new_post.status)
            .bind(new_post.reading_minutes)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_post(&self, post_id: i64, patch: PostPatch) -> Result<Post, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE posts
            SET category_id = $2, title = $3, slug = $4, content = $5, raw_text = $6,
                excerpt = $7, status = $8, reading_minutes = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(post_id)
            .bind(patch.category_id)
            .bind(&patch.title)
            .bind(&patch.slug)
            .bind(&patch.content)
            .bind(&patch.raw_text)
            .bind(&patch.excerpt)
            .bind(patch.status)
            .bind(patch.reading_minutes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO post_tags (post_id, tag_id)
                SELECT $1, t.id FROM tags t WHERE t.id = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(post_id)
            .bind(tag_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn get_user_post_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}
