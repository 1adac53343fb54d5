use crate::AppState;
use crate::db::TagExt;
use crate::dtos::{CreateTagDto, TagDto, TagListResponseDto, TagResponseDto};
use crate::error::{DomainError, ErrorMessage, HttpError};
use crate::middleware::{auth, role_check};
use crate::models::UserRole;
use crate::utils::slug::derive_slug;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

pub fn tag_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_tags))
        .route(
            "/",
            post(create_tag)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{tag_id}",
            delete(delete_tag)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Every tag with its usage count.
#[instrument(skip(app_state))]
pub async fn get_tags(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let tags = app_state
        .db_client
        .get_tags_with_counts()
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = TagListResponseDto {
        status: "success".to_string(),
        results: tags.len() as i64,
        data: tags,
    };
    tracing::info!("get_tags successful");
    Ok(Json(response))
}

/// Create a tag. The slug comes from the name unless one is given, and
/// collisions are refused rather than suffixed.
#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_tag(
    State(app_state): State<AppState>,
    Json(body): Json<CreateTagDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_tag input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let slug = derive_slug(body.slug.as_deref(), &body.name)?;

    let existing = app_state
        .db_client
        .get_tag_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking tag slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if existing.is_some() {
        return Err(DomainError::DuplicateSlug(slug).into());
    }

    let tag = match app_state.db_client.save_tag(&body.name, &slug).await {
        Ok(tag) => tag,
        // Concurrent create with the same slug loses the race to the
        // unique index.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(DomainError::DuplicateSlug(slug).into());
        }
        Err(e) => {
            tracing::error!("DB error, saving tag: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    let response = TagResponseDto {
        status: "success".to_string(),
        data: TagDto::from_model(&tag),
    };
    tracing::info!(tag_id = tag.id, "create_tag successful");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Delete a tag along with its post assignments.
#[instrument(skip(app_state))]
pub async fn delete_tag(
    Path(tag_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_tag_clearing_posts(tag_id)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("Tag not found for deletion");
                HttpError::not_found("Tag not found".to_string())
            } else {
                tracing::error!("DB error, deleting tag: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!("delete_tag successful");
    Ok(StatusCode::NO_CONTENT)
}
