use std::collections::HashMap;

use validator::ValidateEmail;

use crate::db::{CommentExt, NewComment};
use crate::error::DomainError;
use crate::models::{Comment, Post, PostStatus, User};
use crate::utils::text::sanitize_html;

/// Submission payload after HTTP-level validation.
#[derive(Debug, Clone, Default)]
pub struct CommentInput {
    pub content: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub parent_id: Option<i64>,
}

/// One visible top-level comment with its approved replies.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Submit a comment against `post`.
///
/// The caller resolves the post row; passing None reports it missing, and
/// drafts are refused. An authenticated session is auto-approved with the
/// author snapshot copied from the account; a guest lands in the pending
/// queue with validated name and email. Replies must target an existing
/// top-level comment of the same post, so threads never nest deeper than
/// one level.
pub async fn submit<S: CommentExt>(
    store: &S,
    post: Option<&Post>,
    input: CommentInput,
    session: Option<&User>,
) -> Result<Comment, DomainError> {
    let post = post.ok_or(DomainError::PostNotFound)?;
    if post.status != PostStatus::Published {
        return Err(DomainError::PostNotPublished);
    }

    let content = sanitize_html(input.content.trim());
    if content.trim().is_empty() {
        return Err(DomainError::Validation("Content is required".to_string()));
    }

    if let Some(parent_id) = input.parent_id {
        let parent = store
            .get_comment(parent_id)
            .await?
            .ok_or(DomainError::ParentNotFound)?;
        if parent.post_id != post.id {
            return Err(DomainError::ParentNotFound);
        }
        if parent.parent_id.is_some() {
            return Err(DomainError::Validation(
                "Replies cannot be nested further".to_string(),
            ));
        }
    }

    let (author_name, author_email, user_id, approved, is_guest) = match session {
        Some(user) => (user.name.clone(), user.email.clone(), Some(user.id), true, false),
        None => {
            let name = input
                .author_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    DomainError::Validation("Name is required for guest comments".to_string())
                })?;
            let email = input
                .author_email
                .as_deref()
                .map(str::trim)
                .filter(|email| email.validate_email())
                .ok_or_else(|| {
                    DomainError::Validation(
                        "A valid email is required for guest comments".to_string(),
                    )
                })?;
            (name.to_string(), email.to_string(), None, false, true)
        }
    };

    let comment = store
        .save_comment(NewComment {
            post_id: post.id,
            parent_id: input.parent_id,
            user_id,
            author_name,
            author_email,
            content,
            approved,
            is_guest,
        })
        .await?;

    Ok(comment)
}

/// Mark a comment approved. Safe to repeat.
pub async fn approve<S: CommentExt>(store: &S, comment_id: i64) -> Result<Comment, DomainError> {
    set_approved(store, comment_id, true).await
}

/// Send a comment back to the pending queue. There is no terminal rejected
/// state; a rejected comment can be approved later.
pub async fn reject<S: CommentExt>(store: &S, comment_id: i64) -> Result<Comment, DomainError> {
    set_approved(store, comment_id, false).await
}

async fn set_approved<S: CommentExt>(
    store: &S,
    comment_id: i64,
    approved: bool,
) -> Result<Comment, DomainError> {
    match store.set_comment_approved(comment_id, approved).await {
        Ok(comment) => Ok(comment),
        Err(sqlx::Error::RowNotFound) => Err(DomainError::NotFound("Comment")),
        Err(e) => Err(DomainError::Database(e)),
    }
}

/// Delete a comment and its replies, returning how many rows were removed.
pub async fn delete<S: CommentExt>(store: &S, comment_id: i64) -> Result<u64, DomainError> {
    if store.get_comment(comment_id).await?.is_none() {
        return Err(DomainError::NotFound("Comment"));
    }

    match store.delete_comment_thread(comment_id).await {
        Ok(removed) => Ok(removed),
        Err(sqlx::Error::RowNotFound) => Err(DomainError::NotFound("Comment")),
        Err(e) => Err(DomainError::Database(e)),
    }
}

/// The public comment thread for a post.
///
/// Filtering happens here, not in the store: only approved top-level
/// comments appear, each carrying only its approved replies. A reply whose
/// parent is still pending stays hidden no matter its own state.
pub async fn visible_thread<S: CommentExt>(
    store: &S,
    post_id: i64,
) -> Result<Vec<CommentThread>, DomainError> {
    let comments = store.get_comments_for_post(post_id).await?;

    let mut threads: Vec<CommentThread> = Vec::new();
    let mut thread_index: HashMap<i64, usize> = HashMap::new();

    // Parents are always created before their replies, so one ordered pass
    // is enough.
    for comment in comments {
        if !comment.approved {
            continue;
        }
        match comment.parent_id {
            None => {
                thread_index.insert(comment.id, threads.len());
                threads.push(CommentThread {
                    comment,
                    replies: Vec::new(),
                });
            }
            Some(parent_id) => {
                if let Some(&index) = thread_index.get(&parent_id) {
                    threads[index].replies.push(comment);
                }
            }
        }
    }

    Ok(threads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemStore {
        comments: Mutex<Vec<Comment>>,
        next_id: Mutex<i64>,
    }

    impl MemStore {
        fn comment(&self, comment_id: i64) -> Option<Comment> {
            self.comments
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == comment_id)
                .cloned()
        }

        fn count(&self) -> usize {
            self.comments.lock().unwrap().len()
        }
    }

    impl CommentExt for MemStore {
        async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
            Ok(self.comment(comment_id))
        }

        async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
            Ok(self
                .comments
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.post_id == post_id)
                .cloned()
                .collect())
        }

        async fn save_comment(&self, new_comment: NewComment) -> Result<Comment, sqlx::Error> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;

            let comment = Comment {
                id: *next_id,
                post_id: new_comment.post_id,
                parent_id: new_comment.parent_id,
                user_id: new_comment.user_id,
                author_name: new_comment.author_name,
                author_email: new_comment.author_email,
                content: new_comment.content,
                approved: new_comment.approved,
                is_guest: new_comment.is_guest,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.comments.lock().unwrap().push(comment.clone());
            Ok(comment)
        }

        async fn set_comment_approved(
            &self,
            comment_id: i64,
            approved: bool,
        ) -> Result<Comment, sqlx::Error> {
            let mut comments = self.comments.lock().unwrap();
            let comment = comments
                .iter_mut()
                .find(|c| c.id == comment_id)
                .ok_or(sqlx::Error::RowNotFound)?;
            comment.approved = approved;
            comment.updated_at = Utc::now();
            Ok(comment.clone())
        }

        async fn delete_comment_thread(&self, comment_id: i64) -> Result<u64, sqlx::Error> {
            let mut comments = self.comments.lock().unwrap();
            let before = comments.len();
            comments.retain(|c| c.parent_id != Some(comment_id));
            let reply_count = (before - comments.len()) as u64;

            let before = comments.len();
            comments.retain(|c| c.id != comment_id);
            if comments.len() == before {
                return Err(sqlx::Error::RowNotFound);
            }

            Ok(reply_count + 1)
        }
    }

    fn post(id: i64, status: PostStatus) -> Post {
        Post {
            id,
            user_id: Uuid::new_v4(),
            category_id: None,
            title: "Post".to_string(),
            slug: format!("post-{}", id),
            content: "<p>body</p>".to_string(),
            raw_text: "body".to_string(),
            excerpt: "body".to_string(),
            status,
            reading_minutes: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reader() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: String::new(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn guest_input(content: &str) -> CommentInput {
        CommentInput {
            content: content.to_string(),
            author_name: Some("Guest".to_string()),
            author_email: Some("guest@example.com".to_string()),
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn guest_submission_lands_pending_with_snapshot() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);

        let comment = submit(&store, Some(&post), guest_input("hello there"), None)
            .await
            .unwrap();

        assert!(!comment.approved);
        assert!(comment.is_guest);
        assert_eq!(comment.user_id, None);
        assert_eq!(comment.author_name, "Guest");
        assert_eq!(comment.author_email, "guest@example.com");
    }

    #[tokio::test]
    async fn authenticated_submission_is_auto_approved() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);
        let user = reader();

        let input = CommentInput {
            content: "hello".to_string(),
            // supplied guest fields are ignored for a session
            author_name: Some("Mallory".to_string()),
            author_email: Some("mallory@example.com".to_string()),
            parent_id: None,
        };
        let comment = submit(&store, Some(&post), input, Some(&user)).await.unwrap();

        assert!(comment.approved);
        assert!(!comment.is_guest);
        assert_eq!(comment.user_id, Some(user.id));
        assert_eq!(comment.author_name, "Ada");
        assert_eq!(comment.author_email, "ada@example.com");
    }

    #[tokio::test]
    async fn submit_requires_known_published_post() {
        let store = MemStore::default();

        let err = submit(&store, None, guest_input("hi"), None).await.unwrap_err();
        assert!(matches!(err, DomainError::PostNotFound));

        let draft = post(1, PostStatus::Draft);
        let err = submit(&store, Some(&draft), guest_input("hi"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PostNotPublished));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn guest_needs_name_and_valid_email() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);

        let mut missing_name = guest_input("hi");
        missing_name.author_name = None;
        let err = submit(&store, Some(&post), missing_name, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut bad_email = guest_input("hi");
        bad_email.author_email = Some("not-an-email".to_string());
        let err = submit(&store, Some(&post), bad_email, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_sanitizes_markup() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);

        let comment = submit(
            &store,
            Some(&post),
            guest_input("nice <script>alert(1)</script>post"),
            None,
        )
        .await
        .unwrap();

        assert!(!comment.content.contains("script"));
        assert!(comment.content.contains("nice"));
    }

    #[tokio::test]
    async fn reply_parent_must_exist_on_same_post() {
        let store = MemStore::default();
        let first = post(1, PostStatus::Published);
        let second = post(2, PostStatus::Published);
        let user = reader();

        let parent = submit(&store, Some(&first), guest_input("parent"), Some(&user))
            .await
            .unwrap();

        let mut dangling = guest_input("reply");
        dangling.parent_id = Some(999);
        let err = submit(&store, Some(&first), dangling, None).await.unwrap_err();
        assert!(matches!(err, DomainError::ParentNotFound));

        let mut cross_post = guest_input("reply");
        cross_post.parent_id = Some(parent.id);
        let err = submit(&store, Some(&second), cross_post, None).await.unwrap_err();
        assert!(matches!(err, DomainError::ParentNotFound));
    }

    #[tokio::test]
    async fn replies_cannot_nest_beyond_one_level() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);
        let user = reader();

        let top = submit(&store, Some(&post), guest_input("top"), Some(&user))
            .await
            .unwrap();

        let mut reply = guest_input("reply");
        reply.parent_id = Some(top.id);
        let reply = submit(&store, Some(&post), reply, Some(&user)).await.unwrap();

        let mut nested = guest_input("deeper");
        nested.parent_id = Some(reply.id);
        let err = submit(&store, Some(&post), nested, Some(&user)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn approval_flow_controls_visibility() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);

        let comment = submit(&store, Some(&post), guest_input("pending"), None)
            .await
            .unwrap();
        assert!(visible_thread(&store, post.id).await.unwrap().is_empty());

        approve(&store, comment.id).await.unwrap();
        // repeat approval is a no-op, not an error
        approve(&store, comment.id).await.unwrap();
        let threads = visible_thread(&store, post.id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, comment.id);

        reject(&store, comment.id).await.unwrap();
        assert!(!store.comment(comment.id).unwrap().approved);
        assert!(visible_thread(&store, post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn moderating_missing_comment_is_not_found() {
        let store = MemStore::default();

        assert!(matches!(
            approve(&store, 404).await.unwrap_err(),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            delete(&store, 404).await.unwrap_err(),
            DomainError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_replies_with_target() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);
        let user = reader();

        let top = submit(&store, Some(&post), guest_input("top"), Some(&user))
            .await
            .unwrap();
        for text in ["first reply", "second reply"] {
            let mut reply = guest_input(text);
            reply.parent_id = Some(top.id);
            submit(&store, Some(&post), reply, Some(&user)).await.unwrap();
        }
        let other = submit(&store, Some(&post), guest_input("unrelated"), Some(&user))
            .await
            .unwrap();

        let removed = delete(&store, top.id).await.unwrap();

        assert_eq!(removed, 3);
        assert_eq!(store.count(), 1);
        assert!(store.comment(other.id).is_some());
        let orphans = store
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.parent_id == Some(top.id))
            .count();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn pending_reply_under_approved_parent_stays_hidden() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);
        let user = reader();

        let top = submit(&store, Some(&post), guest_input("top"), Some(&user))
            .await
            .unwrap();
        let mut reply = guest_input("guest reply");
        reply.parent_id = Some(top.id);
        submit(&store, Some(&post), reply, None).await.unwrap();

        let threads = visible_thread(&store, post.id).await.unwrap();

        assert_eq!(threads.len(), 1);
        assert!(threads[0].replies.is_empty());
    }

    #[tokio::test]
    async fn approved_reply_under_pending_parent_stays_hidden() {
        let store = MemStore::default();
        let post = post(1, PostStatus::Published);
        let user = reader();

        let pending_top = submit(&store, Some(&post), guest_input("pending top"), None)
            .await
            .unwrap();
        let mut reply = guest_input("reply");
        reply.parent_id = Some(pending_top.id);
        let reply = submit(&store, Some(&post), reply, Some(&user)).await.unwrap();
        assert!(reply.approved);

        assert!(visible_thread(&store, post.id).await.unwrap().is_empty());
    }
}
