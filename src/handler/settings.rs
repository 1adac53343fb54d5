use crate::AppState;
use crate::db::SettingsExt;
use crate::dtos::{SettingsResponseDto, UpdateSettingsDto};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{auth, role_check};
use crate::models::UserRole;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, put};
use axum::{Router, middleware};
use std::collections::HashMap;
use tracing::instrument;
use validator::Validate;

pub fn settings_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings))
        .route(
            "/",
            put(update_settings)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Site settings as a flat name/value map. Public, so the rendered pages
/// can read the site title and the commenting switch directly.
#[instrument(skip(app_state))]
pub async fn get_settings(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state.db_client.get_settings().await.map_err(|e| {
        tracing::error!("DB error, getting settings: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let data: HashMap<String, String> = settings
        .into_iter()
        .map(|setting| (setting.name, setting.value))
        .collect();

    let response = SettingsResponseDto {
        status: "success".to_string(),
        data,
    };
    tracing::info!("get_settings successful");
    Ok(Json(response))
}

/// Write one or more settings atomically and answer with the fresh map.
#[instrument(skip(app_state, body))]
pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(body): Json<UpdateSettingsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_settings input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .upsert_settings(&body.settings)
        .await
        .map_err(|e| {
            tracing::error!("DB error, upserting settings: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let settings = app_state.db_client.get_settings().await.map_err(|e| {
        tracing::error!("DB error, getting settings: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let data: HashMap<String, String> = settings
        .into_iter()
        .map(|setting| (setting.name, setting.value))
        .collect();

    let response = SettingsResponseDto {
        status: "success".to_string(),
        data,
    };
    tracing::info!("update_settings successful");
    Ok(Json(response))
}
