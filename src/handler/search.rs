use crate::AppState;
use crate::db::{PostExt, PostFilters};
use crate::dtos::{GetSearchQuery, PaginationDto, PostListResponseDto};
use crate::error::{ErrorMessage, HttpError};
use crate::models::PostStatus;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tracing::instrument;
use validator::Validate;

pub fn search_handler() -> Router<AppState> {
    Router::new().route("/", get(get_search))
}

/// Case-insensitive substring search over titles and body text. Only
/// published posts are searchable.
#[instrument(skip(app_state))]
pub async fn get_search(
    Query(params): Query<GetSearchQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_search input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let filters = PostFilters {
        status: Some(PostStatus::Published),
        search: Some(&params.q),
        ..Default::default()
    };

    let posts = app_state
        .db_client
        .get_posts(page, limit, filters)
        .await
        .map_err(|e| {
            tracing::error!("DB error, searching posts: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.count_posts(filters).await.map_err(|e| {
        tracing::error!("DB error, counting search results: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = Json(PostListResponseDto {
        status: "success".to_string(),
        data: posts,
        pagination: PaginationDto::new(page, limit, total),
    });
    tracing::info!("get_search successful");
    Ok(response)
}
