use std::collections::{HashMap, HashSet, VecDeque};

use crate::db::CategoryExt;
use crate::dtos::CategoryTreeDto;
use crate::error::DomainError;
use crate::models::Category;
use crate::utils::slug::derive_slug;

/// Validated input for a new category.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub parent_id: Option<i64>,
}

/// Partial update. Plain Option fields mean "absent = keep"; the doubled
/// Options additionally allow an explicit null, which for `parent_id` moves
/// the category to the root level.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub parent_id: Option<Option<i64>>,
}

const MIN_NAME_CHARS: usize = 2;

fn checked_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(DomainError::Validation(format!(
            "Name must be at least {} characters",
            MIN_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

/// Create a category. The slug is derived from the name unless one was
/// supplied; either way it must not collide with any existing category.
/// A supplied parent must already exist.
pub async fn create<S: CategoryExt>(
    store: &S,
    input: CategoryInput,
) -> Result<Category, DomainError> {
    let name = checked_name(&input.name)?;
    let slug = derive_slug(input.slug.as_deref(), &name)?;

    if store.get_category_by_slug(&slug).await?.is_some() {
        return Err(DomainError::DuplicateSlug(slug));
    }

    if let Some(parent_id) = input.parent_id {
        if store.get_category(parent_id).await?.is_none() {
            return Err(DomainError::NotFound("Parent category"));
        }
    }

    match store
        .save_category(
            &name,
            &slug,
            input.description.as_deref(),
            input.image.as_deref(),
            input.color.as_deref(),
            input.sort_order,
            input.parent_id,
        )
        .await
    {
        Ok(category) => Ok(category),
        // Backstop for a concurrent insert of the same slug.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(DomainError::DuplicateSlug(slug))
        }
        Err(e) => Err(DomainError::Database(e)),
    }
}

/// Apply a partial update.
///
/// Checks run in a fixed order: existence, then slug uniqueness, then the
/// parent rules (self-parent, parent existence, cycle). A rejected update
/// leaves the category exactly as it was. Renaming without an explicit slug
/// re-derives the slug from the new name.
pub async fn update<S: CategoryExt>(
    store: &S,
    category_id: i64,
    patch: CategoryPatch,
) -> Result<Category, DomainError> {
    let existing = store
        .get_category(category_id)
        .await?
        .ok_or(DomainError::NotFound("Category"))?;

    let name = match &patch.name {
        Some(name) => checked_name(name)?,
        None => existing.name.clone(),
    };

    let slug = if let Some(explicit) = patch.slug.as_deref() {
        derive_slug(Some(explicit), &name)?
    } else if name != existing.name {
        derive_slug(None, &name)?
    } else {
        existing.slug.clone()
    };

    if slug != existing.slug && store.get_category_by_slug(&slug).await?.is_some() {
        return Err(DomainError::DuplicateSlug(slug));
    }

    let parent_id = match patch.parent_id {
        None => existing.parent_id,
        Some(None) => None,
        Some(Some(parent_id)) => {
            if parent_id == category_id {
                return Err(DomainError::SelfParent);
            }
            if store.get_category(parent_id).await?.is_none() {
                return Err(DomainError::NotFound("Parent category"));
            }
            if is_descendant(store, category_id, parent_id).await? {
                return Err(DomainError::CyclicParent);
            }
            Some(parent_id)
        }
    };

    let description = patch.description.unwrap_or(existing.description);
    let image = patch.image.unwrap_or(existing.image);
    let color = patch.color.unwrap_or(existing.color);
    let sort_order = patch.sort_order.unwrap_or(existing.sort_order);

    match store
        .update_category(
            category_id,
            &name,
            &slug,
            description.as_deref(),
            image.as_deref(),
            color.as_deref(),
            sort_order,
            parent_id,
        )
        .await
    {
        Ok(category) => Ok(category),
        Err(sqlx::Error::RowNotFound) => Err(DomainError::NotFound("Category")),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(DomainError::DuplicateSlug(slug))
        }
        Err(e) => Err(DomainError::Database(e)),
    }
}

/// Delete a category. Refused while direct children exist; otherwise posts
/// pointing at it are detached and the row removed in one transaction.
pub async fn delete<S: CategoryExt>(store: &S, category_id: i64) -> Result<(), DomainError> {
    if store.get_category(category_id).await?.is_none() {
        return Err(DomainError::NotFound("Category"));
    }

    if store.has_child_categories(category_id).await? {
        return Err(DomainError::HasChildren);
    }

    match store.delete_category_clearing_posts(category_id).await {
        Ok(()) => Ok(()),
        Err(sqlx::Error::RowNotFound) => Err(DomainError::NotFound("Category")),
        Err(e) => Err(DomainError::Database(e)),
    }
}

/// Whether `needle` sits anywhere inside `root_id`'s subtree, however deep.
///
/// Iterative breadth-first walk over direct children. The visited set is a
/// guard against already-corrupt data; a well-formed forest never revisits
/// a node.
async fn is_descendant<S: CategoryExt>(
    store: &S,
    root_id: i64,
    needle: i64,
) -> Result<bool, DomainError> {
    let mut queue = VecDeque::from([root_id]);
    let mut visited = HashSet::from([root_id]);

    while let Some(current) = queue.pop_front() {
        for child in store.get_child_categories(current).await? {
            if child.id == needle {
                return Ok(true);
            }
            if visited.insert(child.id) {
                queue.push_back(child.id);
            }
        }
    }

    Ok(false)
}

/// Assemble the navigation forest from the flat, sibling-ordered list.
pub fn build_tree(categories: &[Category]) -> Vec<CategoryTreeDto> {
    let mut children_of: HashMap<Option<i64>, Vec<&Category>> = HashMap::new();
    for category in categories {
        children_of.entry(category.parent_id).or_default().push(category);
    }

    fn nodes_under(
        children_of: &HashMap<Option<i64>, Vec<&Category>>,
        parent: Option<i64>,
    ) -> Vec<CategoryTreeDto> {
        children_of
            .get(&parent)
            .map(|children| {
                children
                    .iter()
                    .map(|category| CategoryTreeDto {
                        id: category.id,
                        name: category.name.clone(),
                        slug: category.slug.clone(),
                        color: category.color.clone(),
                        sort_order: category.sort_order,
                        children: nodes_under(children_of, Some(category.id)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    nodes_under(&children_of, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        categories: Mutex<Vec<Category>>,
        // post id -> category reference, to observe detaching on delete
        post_categories: Mutex<HashMap<i64, Option<i64>>>,
        next_id: Mutex<i64>,
    }

    impl MemStore {
        fn with_post(&self, post_id: i64, category_id: Option<i64>) {
            self.post_categories
                .lock()
                .unwrap()
                .insert(post_id, category_id);
        }

        fn category(&self, category_id: i64) -> Category {
            self.categories
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == category_id)
                .cloned()
                .unwrap()
        }

        fn category_count(&self) -> usize {
            self.categories.lock().unwrap().len()
        }

        fn post_category(&self, post_id: i64) -> Option<i64> {
            self.post_categories.lock().unwrap()[&post_id]
        }
    }

    impl CategoryExt for MemStore {
        async fn get_category(&self, category_id: i64) -> Result<Option<Category>, sqlx::Error> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == category_id)
                .cloned())
        }

        async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.slug == slug)
                .cloned())
        }

        async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
            Ok(self.categories.lock().unwrap().clone())
        }

        async fn get_child_categories(
            &self,
            parent_id: i64,
        ) -> Result<Vec<Category>, sqlx::Error> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.parent_id == Some(parent_id))
                .cloned()
                .collect())
        }

        async fn has_child_categories(&self, category_id: i64) -> Result<bool, sqlx::Error> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.parent_id == Some(category_id)))
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
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;

            let category = Category {
                id: *next_id,
                name: name.to_string(),
                slug: slug.to_string(),
                description: description.map(str::to_string),
                image: image.map(str::to_string),
                color: color.map(str::to_string),
                sort_order,
                parent_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.categories.lock().unwrap().push(category.clone());
            Ok(category)
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
            let mut categories = self.categories.lock().unwrap();
            let category = categories
                .iter_mut()
                .find(|c| c.id == category_id)
                .ok_or(sqlx::Error::RowNotFound)?;

            category.name = name.to_string();
            category.slug = slug.to_string();
            category.description = description.map(str::to_string);
            category.image = image.map(str::to_string);
            category.color = color.map(str::to_string);
            category.sort_order = sort_order;
            category.parent_id = parent_id;
            category.updated_at = Utc::now();
            Ok(category.clone())
        }

        async fn delete_category_clearing_posts(
            &self,
            category_id: i64,
        ) -> Result<(), sqlx::Error> {
            let mut categories = self.categories.lock().unwrap();
            let before = categories.len();
            categories.retain(|c| c.id != category_id);
            if categories.len() == before {
                return Err(sqlx::Error::RowNotFound);
            }

            for reference in self.post_categories.lock().unwrap().values_mut() {
                if *reference == Some(category_id) {
                    *reference = None;
                }
            }
            Ok(())
        }
    }

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            slug: None,
            description: None,
            image: None,
            color: None,
            sort_order: 0,
            parent_id: None,
        }
    }

    fn child_input(name: &str, parent_id: i64) -> CategoryInput {
        CategoryInput {
            parent_id: Some(parent_id),
            ..input(name)
        }
    }

    #[tokio::test]
    async fn create_derives_slug_from_name() {
        let store = MemStore::default();

        let category = create(&store, input("Teknoloji Haberleri")).await.unwrap();

        assert_eq!(category.slug, "teknoloji-haberleri");
        assert_eq!(category.parent_id, None);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_slug_without_suffixing() {
        let store = MemStore::default();
        create(&store, input("Teknoloji")).await.unwrap();

        let err = create(&store, input("Teknoloji")).await.unwrap_err();

        assert!(matches!(err, DomainError::DuplicateSlug(slug) if slug == "teknoloji"));
        assert_eq!(store.category_count(), 1);
    }

    #[tokio::test]
    async fn create_rejects_explicit_slug_collision() {
        let store = MemStore::default();
        create(&store, input("Teknoloji")).await.unwrap();

        let mut second = input("Something Else");
        second.slug = Some("Teknoloji".to_string());
        let err = create(&store, second).await.unwrap_err();

        assert!(matches!(err, DomainError::DuplicateSlug(_)));
    }

    #[tokio::test]
    async fn create_requires_existing_parent() {
        let store = MemStore::default();

        let err = create(&store, child_input("Orphan", 999)).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(store.category_count(), 0);
    }

    #[tokio::test]
    async fn create_rejects_one_character_name() {
        let store = MemStore::default();

        let err = create(&store, input("A")).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn update_keeps_unpatched_fields() {
        let store = MemStore::default();
        let mut seeded = input("Teknoloji");
        seeded.description = Some("tech news".to_string());
        let category = create(&store, seeded).await.unwrap();

        let updated = update(
            &store,
            category.id,
            CategoryPatch {
                sort_order: Some(5),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Teknoloji");
        assert_eq!(updated.slug, "teknoloji");
        assert_eq!(updated.description.as_deref(), Some("tech news"));
        assert_eq!(updated.sort_order, 5);
    }

    #[tokio::test]
    async fn update_rename_rederives_slug() {
        let store = MemStore::default();
        let category = create(&store, input("Teknoloji")).await.unwrap();

        let updated = update(
            &store,
            category.id,
            CategoryPatch {
                name: Some("Bilim Dünyası".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.slug, "bilim-dunyasi");
    }

    #[tokio::test]
    async fn update_explicit_slug_wins_over_rederivation() {
        let store = MemStore::default();
        let category = create(&store, input("Teknoloji")).await.unwrap();

        let updated = update(
            &store,
            category.id,
            CategoryPatch {
                name: Some("Bilim".to_string()),
                slug: Some("Custom Slug".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.slug, "custom-slug");
    }

    #[tokio::test]
    async fn update_rejects_slug_collision_and_changes_nothing() {
        let store = MemStore::default();
        create(&store, input("Teknoloji")).await.unwrap();
        let other = create(&store, input("Bilim")).await.unwrap();

        let err = update(
            &store,
            other.id,
            CategoryPatch {
                slug: Some("teknoloji".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::DuplicateSlug(_)));
        assert_eq!(store.category(other.id).slug, "bilim");
    }

    #[tokio::test]
    async fn update_rejects_self_parent() {
        let store = MemStore::default();
        let category = create(&store, input("Teknoloji")).await.unwrap();

        let err = update(
            &store,
            category.id,
            CategoryPatch {
                parent_id: Some(Some(category.id)),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::SelfParent));
    }

    #[tokio::test]
    async fn update_rejects_reparenting_under_own_descendant() {
        let store = MemStore::default();
        let a = create(&store, input("A Level")).await.unwrap();
        let b = create(&store, child_input("B Level", a.id)).await.unwrap();
        let c = create(&store, child_input("C Level", b.id)).await.unwrap();

        // direct child and grandchild both count
        for target in [b.id, c.id] {
            let err = update(
                &store,
                a.id,
                CategoryPatch {
                    parent_id: Some(Some(target)),
                    ..CategoryPatch::default()
                },
            )
            .await
            .unwrap_err();

            assert!(matches!(err, DomainError::CyclicParent));
        }
        assert_eq!(store.category(a.id).parent_id, None);
    }

    #[tokio::test]
    async fn update_allows_valid_reparent_and_explicit_root() {
        let store = MemStore::default();
        let a = create(&store, input("A Level")).await.unwrap();
        let b = create(&store, input("B Level")).await.unwrap();

        let moved = update(
            &store,
            b.id,
            CategoryPatch {
                parent_id: Some(Some(a.id)),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.parent_id, Some(a.id));

        let rooted = update(
            &store,
            b.id,
            CategoryPatch {
                parent_id: Some(None),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(rooted.parent_id, None);
    }

    #[tokio::test]
    async fn update_missing_category_is_not_found() {
        let store = MemStore::default();

        let err = update(&store, 42, CategoryPatch::default()).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_refuses_while_children_exist() {
        let store = MemStore::default();
        let parent = create(&store, input("Parent Node")).await.unwrap();
        create(&store, child_input("Child Node", parent.id))
            .await
            .unwrap();

        let err = delete(&store, parent.id).await.unwrap_err();

        assert!(matches!(err, DomainError::HasChildren));
        assert_eq!(store.category_count(), 2);
    }

    #[tokio::test]
    async fn delete_detaches_posts_then_removes_row() {
        let store = MemStore::default();
        let doomed = create(&store, input("Doomed")).await.unwrap();
        let kept = create(&store, input("Kept")).await.unwrap();
        store.with_post(1, Some(doomed.id));
        store.with_post(2, Some(kept.id));
        store.with_post(3, None);

        delete(&store, doomed.id).await.unwrap();

        assert_eq!(store.category_count(), 1);
        assert_eq!(store.post_category(1), None);
        assert_eq!(store.post_category(2), Some(kept.id));
        assert_eq!(store.post_category(3), None);
    }

    #[tokio::test]
    async fn delete_missing_category_is_not_found() {
        let store = MemStore::default();

        let err = delete(&store, 7).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let now = Utc::now();
        let make = |id: i64, name: &str, parent_id: Option<i64>, sort_order: i32| Category {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            image: None,
            color: None,
            sort_order,
            parent_id,
            created_at: now,
            updated_at: now,
        };

        // input arrives sibling-ordered, as the store returns it
        let flat = vec![
            make(1, "First", None, 0),
            make(3, "Second", None, 1),
            make(2, "Nested", Some(1), 0),
            make(4, "Deep", Some(2), 0),
        ];

        let tree = build_tree(&flat);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[1].id, 3);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, 2);
        assert_eq!(tree[0].children[0].children[0].id, 4);
        assert!(tree[1].children.is_empty());
    }
}
