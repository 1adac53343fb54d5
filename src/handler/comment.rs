use crate::AppState;
use crate::db::{CommentAdminExt, PostExt, SettingsExt};
use crate::dtos::{
    AdminCommentListResponseDto, AdminCommentsQuery, CommentDto, CommentThreadDto,
    CommentThreadResponseDto, PaginationDto, Response, SingleCommentResponseDto, SubmitCommentDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{OptionalAuthUser, soft_auth};
use crate::moderation::{self, CommentInput};
use crate::models::PostStatus;
use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, put};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

/// Public comment routes, nested under /posts/{slug}/comments.
pub fn post_comments_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        // GET / - approved thread for the post (public)
        .route("/", get(get_post_comments))
        // POST / - submit a comment; a session upgrades the submission
        .route(
            "/",
            axum::routing::post(submit_comment)
                .route_layer(middleware::from_fn_with_state(app_state, soft_auth)),
        )
}

/// Admin moderation routes under /comments. Auth and the admin role are
/// applied where this router is nested.
pub fn comment_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_admin_comments))
        .route("/{comment_id}/approve", put(approve_comment))
        .route("/{comment_id}/reject", put(reject_comment))
        .route("/{comment_id}", delete(delete_comment))
}

/// Approved comment thread for a published post.
///
/// The moderation rules decide what is visible; this handler only maps the
/// result into the public shape, which never includes author emails.
#[instrument(skip(app_state))]
pub async fn get_post_comments(
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
        .filter(|post| post.status == PostStatus::Published)
        .ok_or_else(|| HttpError::not_found("Post not found".to_string()))?;

    let threads = moderation::visible_thread(&app_state.db_client, post.id).await?;

    let results = threads
        .iter()
        .map(|thread| 1 + thread.replies.len() as i64)
        .sum();
    let data = threads
        .iter()
        .map(|thread| CommentThreadDto {
            comment: CommentDto::from_model(&thread.comment),
            replies: thread.replies.iter().map(CommentDto::from_model).collect(),
        })
        .collect();

    let response = CommentThreadResponseDto {
        status: "success".to_string(),
        data,
        results,
    };
    tracing::info!("get_post_comments successful");
    Ok(Json(response))
}

/// Submit a comment on a post.
///
/// Guests need a name and email and land in the pending queue; logged-in
/// readers are approved on the spot. Refused outright while the
/// `comments_enabled` setting is off.
#[instrument(skip(app_state, session, body))]
pub async fn submit_comment(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Extension(session): Extension<OptionalAuthUser>,
    Json(body): Json<SubmitCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid submit_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let comments_enabled = app_state
        .db_client
        .get_setting("comments_enabled")
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comments_enabled setting: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .map(|setting| setting.value == "true")
        .unwrap_or(true);
    if !comments_enabled {
        tracing::error!("Comment submitted while commenting is disabled");
        return Err(HttpError::new(
            "Comments are disabled".to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    let post = app_state
        .db_client
        .get_post_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting post: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let input = CommentInput {
        content: body.content,
        author_name: body.author_name,
        author_email: body.author_email,
        parent_id: body.parent_id,
    };

    let comment = moderation::submit(
        &app_state.db_client,
        post.as_ref(),
        input,
        session.0.as_ref(),
    )
    .await?;

    let response = SingleCommentResponseDto {
        status: "success".to_string(),
        data: CommentDto::from_model(&comment),
    };
    tracing::info!(comment_id = comment.id, approved = comment.approved, "submit_comment successful");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Moderation queue. `pending=true` narrows to unapproved comments; a post
/// id narrows to one post.
#[instrument(skip(app_state))]
pub async fn get_admin_comments(
    Query(params): Query<AdminCommentsQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_admin_comments input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);
    let approved = match params.pending {
        Some(true) => Some(false),
        _ => None,
    };

    let comments = app_state
        .db_client
        .get_admin_comments(page, limit, approved, params.post_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting admin comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .count_admin_comments(approved, params.post_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting admin comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = AdminCommentListResponseDto {
        status: "success".to_string(),
        data: comments,
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_admin_comments successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn approve_comment(
    Path(comment_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let comment = moderation::approve(&app_state.db_client, comment_id).await?;

    let response = SingleCommentResponseDto {
        status: "success".to_string(),
        data: CommentDto::from_model(&comment),
    };
    tracing::info!("approve_comment successful");
    Ok(Json(response))
}

/// Send a comment back to pending. Not a terminal state, so a slip of the
/// mouse is recoverable.
#[instrument(skip(app_state))]
pub async fn reject_comment(
    Path(comment_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let comment = moderation::reject(&app_state.db_client, comment_id).await?;

    let response = SingleCommentResponseDto {
        status: "success".to_string(),
        data: CommentDto::from_model(&comment),
    };
    tracing::info!("reject_comment successful");
    Ok(Json(response))
}

/// Delete a comment and its replies, reporting how many rows went away.
#[instrument(skip(app_state))]
pub async fn delete_comment(
    Path(comment_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let removed = moderation::delete(&app_state.db_client, comment_id).await?;

    let response = Response {
        status: "success",
        message: format!("Deleted {} comment(s)", removed),
    };
    tracing::info!(removed, "delete_comment successful");
    Ok(Json(response))
}
