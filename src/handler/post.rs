use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::{CategoryExt, NewPost, PostExt, PostFilters, PostPatch, TagExt};
use crate::dtos::{
    CreatePostDto, DraftResponseDto, GenerateDraftDto, PaginationDto, PostDetailData,
    PostDetailResponseDto, PostListResponseDto, PostsQueryParams, TagDto, UpdatePostDto,
};
use crate::error::{DomainError, ErrorMessage, HttpError};
use crate::handler::comment::post_comments_handler;
use crate::middleware::{JWTAuthMiddleware, OptionalAuthUser, auth, role_check, soft_auth};
use crate::models::{PostStatus, UserRole};
use crate::utils::slug::derive_slug;
use crate::utils::text::{excerpt_of, plain_text, reading_minutes};

const EXCERPT_MAX_CHARS: usize = 300;

/// Posts are addressed by slug throughout, so the public site and the admin
/// UI hit the same routes.
pub fn post_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_posts).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                soft_auth,
            )),
        )
        .route(
            "/",
            post(create_post)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/generate",
            post(generate_draft)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{slug}",
            get(get_post_detail).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                soft_auth,
            )),
        )
        .route(
            "/{slug}",
            put(edit_post)
                .delete(delete_post)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/{slug}/comments", post_comments_handler(app_state))
}

fn is_admin(session: &OptionalAuthUser) -> bool {
    session
        .0
        .as_ref()
        .is_some_and(|user| user.role == UserRole::Admin)
}

/// Paginated post listing with optional category, tag and author filters.
///
/// Anonymous readers only ever see published posts. An authenticated admin
/// may pass `status` to inspect drafts through the same route.
pub async fn get_posts(
    Query(params): Query<PostsQueryParams>,
    State(app_state): State<AppState>,
    Extension(session): Extension<OptionalAuthUser>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_posts input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let status = if is_admin(&session) {
        params.status
    } else {
        Some(PostStatus::Published)
    };

    let filters = PostFilters {
        status,
        category_slug: params.category.as_deref(),
        tag_slug: params.tag.as_deref(),
        author: params.author.as_deref(),
        search: None,
    };

    let posts = app_state
        .db_client
        .get_posts(page, limit, filters)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting posts: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.count_posts(filters).await.map_err(|e| {
        tracing::error!("DB error, counting posts: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = Json(PostListResponseDto {
        status: "success".to_string(),
        data: posts,
        pagination: PaginationDto::new(page, limit, total),
    });

    Ok(response)
}

/// Single post with its tags. Drafts are only served to admins; everyone
/// else gets a plain 404 so unpublished slugs stay undiscoverable.
pub async fn get_post_detail(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(session): Extension<OptionalAuthUser>,
) -> Result<impl IntoResponse, HttpError> {
    let only_published = !is_admin(&session);

    let post = app_state
        .db_client
        .get_post_detail_by_slug(&slug, only_published)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post detail: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Post not found".to_string()))?;

    let tags = app_state
        .db_client
        .get_tags_for_post(post.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(PostDetailResponseDto {
        status: "success".to_string(),
        data: PostDetailData {
            post,
            tags: TagDto::from_models(&tags),
        },
    });

    Ok(response)
}

pub async fn create_post(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreatePostDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_post input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let slug = derive_slug(body.slug.as_deref(), &body.title)?;

    let existing = app_state
        .db_client
        .get_post_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking post slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if existing.is_some() {
        return Err(DomainError::DuplicateSlug(slug).into());
    }

    if let Some(category_id) = body.category_id {
        ensure_category_exists(&app_state, category_id).await?;
    }

    let raw_text = plain_text(&body.content)
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let excerpt = match body.excerpt {
        Some(excerpt) if !excerpt.trim().is_empty() => excerpt,
        _ => excerpt_of(&raw_text, EXCERPT_MAX_CHARS),
    };

    let new_post = NewPost {
        user_id: jwt.user.id,
        category_id: body.category_id,
        title: body.title,
        slug,
        reading_minutes: reading_minutes(&raw_text),
        content: body.content,
        raw_text,
        excerpt,
        status: body.status.unwrap_or(PostStatus::Draft),
    };

    let result = match app_state.db_client.save_post(new_post).await {
        Ok(post) => post,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(HttpError::unique_constraint_violation(
                "A post with this slug already exists".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("DB error, saving post: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    if let Some(tag_ids) = body.tag_ids {
        app_state
            .db_client
            .set_post_tags(result.id, &tag_ids)
            .await
            .map_err(|e| {
                tracing::error!("DB error, setting post tags: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
    }

    let response = post_detail_response(&app_state, &result.slug).await?;
    Ok((StatusCode::CREATED, response))
}

/// Patch a post. The slug never moves on a title change; only an explicit
/// slug in the body replaces it, so published links keep working.
pub async fn edit_post(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdatePostDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid edit_post input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_post_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Post not found".to_string()))?;

    let title = body.title.unwrap_or_else(|| existing.title.clone());

    let new_slug = match body.slug {
        Some(explicit) => derive_slug(Some(&explicit), &title)?,
        None => existing.slug.clone(),
    };
    if new_slug != existing.slug {
        let taken = app_state
            .db_client
            .get_post_by_slug(&new_slug)
            .await
            .map_err(|e| {
                tracing::error!("DB error, checking post slug: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
        if taken.is_some() {
            return Err(DomainError::DuplicateSlug(new_slug).into());
        }
    }

    let category_id = match body.category_id {
        None => existing.category_id,
        Some(None) => None,
        Some(Some(category_id)) => {
            ensure_category_exists(&app_state, category_id).await?;
            Some(category_id)
        }
    };

    let content_changed = body.content.is_some();
    let content = body.content.unwrap_or_else(|| existing.content.clone());
    let raw_text = plain_text(&content)
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    // An explicit excerpt always wins; otherwise it tracks content changes.
    let excerpt = match body.excerpt {
        Some(excerpt) if !excerpt.trim().is_empty() => excerpt,
        _ if content_changed => excerpt_of(&raw_text, EXCERPT_MAX_CHARS),
        _ => existing.excerpt.clone(),
    };

    let patch = PostPatch {
        category_id,
        title,
        slug: new_slug,
        reading_minutes: reading_minutes(&raw_text),
        content,
        raw_text,
        excerpt,
        status: body.status.unwrap_or(existing.status),
    };

    let result = match app_state.db_client.update_post(existing.id, patch).await {
        Ok(post) => post,
        Err(sqlx::Error::RowNotFound) => {
            return Err(HttpError::not_found("Post not found".to_string()));
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(HttpError::unique_constraint_violation(
                "A post with this slug already exists".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("DB error, updating post: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    if let Some(tag_ids) = body.tag_ids {
        app_state
            .db_client
            .set_post_tags(result.id, &tag_ids)
            .await
            .map_err(|e| {
                tracing::error!("DB error, setting post tags: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
    }

    post_detail_response(&app_state, &result.slug).await
}

pub async fn delete_post(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let post = app_state
        .db_client
        .get_post_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Post not found".to_string()))?;

    app_state
        .db_client
        .delete_post(post.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting post: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Ask the LLM service for a titled draft the editor can start from.
pub async fn generate_draft(
    State(app_state): State<AppState>,
    Json(body): Json<GenerateDraftDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid generate_draft input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let draft = app_state
        .llm_client
        .generate_draft(
            &app_state.env.llm_url,
            &app_state.env.model_name,
            &body.prompt,
        )
        .await?;

    let response = Json(DraftResponseDto {
        status: "success".to_string(),
        data: draft,
    });

    Ok(response)
}

async fn ensure_category_exists(
    app_state: &AppState,
    category_id: i64,
) -> Result<(), HttpError> {
    let category = app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if category.is_none() {
        return Err(HttpError::unprocessable_entity(
            "Category does not exist".to_string(),
        ));
    }

    Ok(())
}

/// Admin mutations answer with the same joined shape the public detail
/// route serves.
async fn post_detail_response(
    app_state: &AppState,
    slug: &str,
) -> Result<Json<PostDetailResponseDto>, HttpError> {
    let post = app_state
        .db_client
        .get_post_detail_by_slug(slug, false)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post detail: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    let tags = app_state
        .db_client
        .get_tags_for_post(post.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(PostDetailResponseDto {
        status: "success".to_string(),
        data: PostDetailData {
            post,
            tags: TagDto::from_models(&tags),
        },
    }))
}
