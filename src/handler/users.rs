use crate::db::CommentAdminExt;
use crate::{
    AppState,
    db::PostExt,
    db::UserExt,
    dtos::{
        FilterUserDto, RequestQueryDto, Response, RoleUpdateDto, UserData, UserListResponseDto,
        UserMeData, UserMeResponseDto, UserPasswordUpdateDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
    utils::password,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for account management. The auth middleware is applied where this
/// router is nested; roles are narrowed per route.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        // GET /me - Current user's profile with statistics
        .route(
            "/me",
            get(get_me).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin, UserRole::User])
            })),
        )
        // PUT /password - Change own password (requires old password)
        .route("/password", put(update_user_password))
        // GET / - List all users (admin only)
        .route(
            "/",
            get(get_users).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        // PUT /{user_id}/role - Change a user's role (admin only)
        .route(
            "/{user_id}/role",
            put(update_user_role).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        // DELETE /{user_id} - Remove an account (admin only)
        .route(
            "/{user_id}",
            delete(delete_user).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
}

/// Current user's profile with post and comment counts.
#[instrument(skip(user, app_state), fields(email = %user.user.email))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filtered_user = FilterUserDto::filter_user(&user.user);

    let post_count = app_state
        .db_client
        .get_user_post_count(&user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user post count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let comment_count = app_state
        .db_client
        .get_user_comment_count(&user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user comment count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response_data = UserMeResponseDto {
        status: "success".to_string(),
        data: UserMeData {
            user: filtered_user,
            post_count,
            comment_count,
        },
    };
    tracing::info!("get_me successful");
    Ok(Json(response_data))
}

/// Paginated user listing (admin only).
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    };
    tracing::info!("get_users successful");
    Ok(Json(response))
}

/// Change another user's role (admin only). Admins cannot demote
/// themselves, so the site always keeps at least one admin.
#[instrument(skip(app_state, jwt, body), fields(admin = %jwt.user.email))]
pub async fn update_user_role(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user_role input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    if jwt.user.id == user_id && body.role != UserRole::Admin {
        tracing::error!("Admin attempted to demote own account");
        return Err(HttpError::bad_request(
            "You cannot change your own role".to_string(),
        ));
    }

    let result = app_state
        .db_client
        .update_user_role(user_id, body.role)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("User not found for role update");
                HttpError::not_found("User not found".to_string())
            } else {
                tracing::error!("DB error, updating user role: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let filtered_user = FilterUserDto::filter_user(&result);

    let response = UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: filtered_user,
        },
    };
    tracing::info!("update_user_role successful");
    Ok(Json(response))
}

/// Change own password. The old password is verified first.
#[instrument(skip(app_state, user, body), fields(email = %user.user.email))]
pub async fn update_user_password(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UserPasswordUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = &user.user;

    let result = app_state
        .db_client
        .get_user_by_id(user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user = result.ok_or_else(|| {
        tracing::error!("User not found");
        HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())
    })?;

    let password_match = password::compare(&body.old_password, &user.password).map_err(|e| {
        tracing::error!("Password comparison error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if !password_match {
        tracing::error!("Old password is incorrect");
        return Err(HttpError::bad_request(
            "Old password is incorrect".to_string(),
        ));
    }

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    app_state
        .db_client
        .update_user_password(user.id, hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Response {
        message: "Password updated Successfully".to_string(),
        status: "success",
    };
    tracing::info!("update_user_password successful");
    Ok(Json(response))
}

/// Delete an account (admin only). Posts and comments written by the
/// account follow their foreign keys: posts go away, comments keep their
/// author snapshot.
#[instrument(skip(app_state, jwt), fields(admin = %jwt.user.email))]
pub async fn delete_user(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if jwt.user.id == user_id {
        tracing::error!("Admin attempted to delete own account");
        return Err(HttpError::bad_request(
            "You cannot delete your own account".to_string(),
        ));
    }

    app_state
        .db_client
        .delete_user(user_id)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("User not found for deletion");
                HttpError::not_found("User not found".to_string())
            } else {
                tracing::error!("DB error, deleting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!("delete_user successful");
    Ok(StatusCode::NO_CONTENT)
}
