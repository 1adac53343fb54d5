use crate::db::CategoryExt;
use crate::dtos::{
    CategoryDto, CategoryListResponseDto, CategoryResponseDto, CategoryTreeResponseDto,
    CreateCategoryDto, UpdateCategoryDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{auth, role_check};
use crate::models::UserRole;
use crate::taxonomy::{self, CategoryInput, CategoryPatch};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

/// Router for category endpoints. Reads are public; mutations go through
/// the tree rules and are admin only.
pub fn category_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_categories))
        .route("/tree", get(get_category_tree))
        .route("/slug/{slug}", get(get_category_by_slug))
        .route("/{category_id}", get(get_category))
        .route(
            "/",
            post(create_category)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{category_id}",
            put(update_category)
                .delete(delete_category)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Flat, sibling-ordered category listing.
#[instrument(skip(app_state))]
pub async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.db_client.get_categories().await.map_err(|e| {
        tracing::error!("DB error, getting categories: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let data: Vec<CategoryDto> = categories.iter().map(CategoryDto::from_model).collect();

    let response = CategoryListResponseDto {
        status: "success".to_string(),
        results: data.len() as i64,
        data,
    };
    tracing::info!("get_categories successful");
    Ok(Json(response))
}

/// Nested navigation tree, children ordered like the flat listing.
#[instrument(skip(app_state))]
pub async fn get_category_tree(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.db_client.get_categories().await.map_err(|e| {
        tracing::error!("DB error, getting categories: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = CategoryTreeResponseDto {
        status: "success".to_string(),
        data: taxonomy::build_tree(&categories),
    };
    tracing::info!("get_category_tree successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_category(
    Path(category_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let category = app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Category not found".to_string()))?;

    let response = CategoryResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_model(&category),
    };
    Ok(Json(response))
}

/// Slug lookup used by the server-rendered category pages.
#[instrument(skip(app_state))]
pub async fn get_category_by_slug(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let category = app_state
        .db_client
        .get_category_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category by slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Category not found".to_string()))?;

    let response = CategoryResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_model(&category),
    };
    Ok(Json(response))
}

/// Create a category. Slug derivation, duplicate refusal and parent checks
/// all happen in the tree rules.
#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(body): Json<CreateCategoryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let input = CategoryInput {
        name: body.name,
        slug: body.slug,
        description: body.description,
        image: body.image,
        color: body.color,
        sort_order: body.sort_order.unwrap_or(0),
        parent_id: body.parent_id,
    };

    let category = taxonomy::create(&app_state.db_client, input).await?;

    let response = CategoryResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_model(&category),
    };
    tracing::info!(category_id = category.id, "create_category successful");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Patch a category. Omitted fields stay put; an explicit null parent moves
/// the category to the root.
#[instrument(skip(app_state, body))]
pub async fn update_category(
    Path(category_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateCategoryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let patch = CategoryPatch {
        name: body.name,
        slug: body.slug,
        description: body.description,
        image: body.image,
        color: body.color,
        sort_order: body.sort_order,
        parent_id: body.parent_id,
    };

    let category = taxonomy::update(&app_state.db_client, category_id, patch).await?;

    let response = CategoryResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_model(&category),
    };
    tracing::info!("update_category successful");
    Ok(Json(response))
}

/// Delete a category. Refused while children exist; posts filed under it
/// are detached in the same transaction as the delete.
#[instrument(skip(app_state))]
pub async fn delete_category(
    Path(category_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    taxonomy::delete(&app_state.db_client, category_id).await?;

    tracing::info!("delete_category successful");
    Ok(StatusCode::NO_CONTENT)
}
