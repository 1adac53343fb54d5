use super::DBClient;
use crate::dtos::AdminCommentDto;
use crate::models::Comment;
use uuid::Uuid;

/// Insert payload for a comment. The moderation state machine fills in
/// `approved` and `is_guest` before this reaches the store; the store never
/// decides moderation outcomes.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub approved: bool,
    pub is_guest: bool,
}

/// Narrow store surface consumed by the moderation state machine.
///
/// `get_comments_for_post` returns every comment regardless of approval;
/// visibility filtering is the state machine's job.
pub trait CommentExt {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error>;

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error>;

    async fn save_comment(&self, new_comment: NewComment) -> Result<Comment, sqlx::Error>;

    async fn set_comment_approved(
        &self,
        comment_id: i64,
        approved: bool,
    ) -> Result<Comment, sqlx::Error>;

    /// Delete the comment and its direct replies in one transaction,
    /// returning how many rows went away.
    async fn delete_comment_thread(&self, comment_id: i64) -> Result<u64, sqlx::Error>;
}

/// Moderation-queue listing and per-user stats. Kept apart from
/// [`CommentExt`] so the state machine's store stays small.
pub trait CommentAdminExt {
    async fn get_admin_comments(
        &self,
        page: i32,
        limit: i32,
        approved: Option<bool>,
        post_id: Option<i64>,
    ) -> Result<Vec<AdminCommentDto>, sqlx::Error>;

    async fn count_admin_comments(
        &self,
        approved: Option<bool>,
        post_id: Option<i64>,
    ) -> Result<i64, sqlx::Error>;

    async fn get_user_comment_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error>;
}

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, user_id, author_name, author_email, \
                               content, approved, is_guest, created_at, updated_at";

impl CommentExt for DBClient {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);

        sqlx::query_as::<_, Comment>(&query)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at, id",
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn save_comment(&self, new_comment: NewComment) -> Result<Comment, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO comments
                (post_id, parent_id, user_id, author_name, author_email, content, approved, is_guest)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(new_comment.post_id)
            .bind(new_comment.parent_id)
            .bind(new_comment.user_id)
            .bind(&new_comment.author_name)
            .bind(&new_comment.author_email)
            .bind(&new_comment.content)
            .bind(new_comment.approved)
            .bind(new_comment.is_guest)
            .fetch_one(&self.pool)
            .await
    }

    async fn set_comment_approved(
        &self,
        comment_id: i64,
        approved: bool,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE comments
            SET approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(comment_id)
            .bind(approved)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn delete_comment_thread(&self, comment_id: i64) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let replies = sqlx::query("DELETE FROM comments WHERE parent_id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        let target = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        if target.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(replies.rows_affected() + target.rows_affected())
    }
}

impl CommentAdminExt for DBClient {
    async fn get_admin_comments(
        &self,
        page: i32,
        limit: i32,
        approved: Option<bool>,
        post_id: Option<i64>,
    ) -> Result<Vec<AdminCommentDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        sqlx::query_as::<_, AdminCommentDto>(
            r#"
            SELECT c.id, c.post_id, p.title AS post_title, c.parent_id, c.author_name,
                   c.author_email, c.content, c.approved, c.is_guest, c.created_at
            FROM comments c
            INNER JOIN posts p ON c.post_id = p.id
            WHERE ($1::boolean IS NULL OR c.approved = $1)
              AND ($2::bigint IS NULL OR c.post_id = $2)
            ORDER BY c.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(approved)
        .bind(post_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_admin_comments(
        &self,
        approved: Option<bool>,
        post_id: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM comments c
            WHERE ($1::boolean IS NULL OR c.approved = $1)
              AND ($2::bigint IS NULL OR c.post_id = $2)
            "#,
        )
        .bind(approved)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_comment_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}
