use super::DBClient;
use crate::dtos::TagWithCountDto;
use crate::models::Tag;

pub trait TagExt {
    async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, sqlx::Error>;

    /// Every tag with its number of tagged posts.
    async fn get_tags_with_counts(&self) -> Result<Vec<TagWithCountDto>, sqlx::Error>;

    async fn get_tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, sqlx::Error>;

    async fn save_tag(&self, name: &str, slug: &str) -> Result<Tag, sqlx::Error>;

    /// Remove the tag and its join rows as one transaction so no orphaned
    /// assignments survive.
    async fn delete_tag_clearing_posts(&self, tag_id: i64) -> Result<(), sqlx::Error>;
}

impl TagExt for DBClient {
    async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug, created_at FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_tags_with_counts(&self) -> Result<Vec<TagWithCountDto>, sqlx::Error> {
        sqlx::query_as::<_, TagWithCountDto>(
            r#"
            SELECT t.id, t.name, t.slug, COUNT(pt.post_id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id, t.name, t.slug
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM tags t
            INNER JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn save_tag(&self, name: &str, slug: &str) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, created_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_tag_clearing_posts(&self, tag_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE tag_id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}
