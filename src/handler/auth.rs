use crate::{
    AppState,
    db::UserExt,
    dtos::{LoginUserDto, RegisterUserDto, Response, UserLoginResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
    models::UserRole,
    utils::{password, token},
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints
pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route(
            "/logout",
            post(logout).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Register a reader account. New accounts always get the user role; the
/// single admin is seeded at startup.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.name, &body.email, &hash_password, UserRole::User)
        .await;

    match result {
        Ok(_user) => {
            tracing::info!(email = %body.email, "Register Successful");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message: "Registration successful! You can now log in.".to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) => {
            if db_err.is_unique_violation() {
                tracing::error!("DB error, saving user, unique_violation: {}", db_err);
                Err(HttpError::unique_constraint_violation(
                    "An account with this email already exists".to_string(),
                ))
            } else {
                tracing::error!("DB error, saving user: {}", db_err);
                Err(HttpError::server_error(
                    ErrorMessage::ServerError.to_string(),
                ))
            }
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Login with email and password. Sets the access token cookie and returns
/// it in the body for header-based clients.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user_by_email(&body.email)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // One message for both failure modes, so logins cannot probe for
    // registered addresses.
    let user = result.ok_or_else(|| {
        tracing::error!("User not found");
        HttpError::unauthorized("Email or password is wrong".to_string())
    })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized("Email or password is wrong".to_string())
    })?;

    if !password_matched {
        tracing::error!("password mismatch");
        return Err(HttpError::unauthorized(
            "Email or password is wrong".to_string(),
        ));
    }

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .max_age(time::Duration::seconds(app_state.env.jwt_maxage))
        .http_only(true)
        .secure(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );

    let json_response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token,
        name: user.name,
    });

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!(email = %body.email, "Login Successful");
    Ok(response)
}

/// Logout by expiring the access token cookie.
#[instrument(skip(user), fields(email = %user.user.email))]
pub async fn logout(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let access_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );

    let json_response = Json(Response {
        status: "success",
        message: "Logout successful".to_string(),
    });

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("logout successful");
    Ok(response)
}
