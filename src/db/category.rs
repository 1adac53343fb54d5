use super::DBClient;
use crate::models::Category;

/// Store surface consumed by the category tree manager.
///
/// The tree walk in the core only ever asks for direct children, so the
/// store never needs a recursive query.
pub trait CategoryExt {
    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, sqlx::Error>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error>;

    /// Flat list of every category, sibling-ordered.
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    /// Direct children only.
    async fn get_child_categories(&self, parent_id: i64) -> Result<Vec<Category>, sqlx::Error>;

    async fn has_child_categories(&self, category_id: i64) -> Result<bool, sqlx::Error>;

    async fn save_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
        image: Option<&str>,
        color: Option<&str>,
        sort_order: i32,
        parent_id: Option<i64>,
    ) -> Result<Category, sqlx::Error>;

    /// Full-row update; the caller passes the merged values.
    async fn update_category(
        &self,
        category_id: i64,
        name: &str,
        slug: &str,
        description: Option<&str>,
        image: Option<&str>,
        color: Option<&str>,
        sort_order: i32,
        parent_id: Option<i64>,
    ) -> Result<Category, sqlx::Error>;

    /// Remove the row and null out every post reference to it, as one
    /// transaction. Rolls back untouched when the row is already gone.
    async fn delete_category_clearing_posts(&self, category_id: i64) -> Result<(), sqlx::Error>;
}

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, image, color, sort_order, parent_id, created_at, updated_at";

impl CategoryExt for DBClient {
    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);

        sqlx::query_as::<_, Category>(&query)
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {} FROM categories WHERE slug = $1", CATEGORY_COLUMNS);

        sqlx::query_as::<_, Category>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM categories ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_child_categories(&self, parent_id: i64) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM categories WHERE parent_id = $1 ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn has_child_categories(&self, category_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE parent_id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn save_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
        image: Option<&str>,
        color: Option<&str>,
        sort_order: i32,
        parent_id: Option<i64>,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO categories (name, slug, description, image, color, sort_order, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(name)
            .bind(slug)
            .bind(description)
            .bind(image)
            .bind(color)
            .bind(sort_order)
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_category(
        &self,
        category_id: i64,
        name: &str,
        slug: &str,
        description: Option<&str>,
        image: Option<&str>,
        color: Option<&str>,
        sort_order: i32,
        parent_id: Option<i64>,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, image = $5, color = $6,
                sort_order = $7, parent_id = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(category_id)
            .bind(name)
            .bind(slug)
            .bind(description)
            .bind(image)
            .bind(color)
            .bind(sort_order)
            .bind(parent_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn delete_category_clearing_posts(&self, category_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE posts SET category_id = NULL WHERE category_id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        // Dropping the transaction without commit rolls the post update back.
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}
