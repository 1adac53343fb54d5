use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON error envelope sent to clients.
///
/// ```json
/// {
///   "status": "fail",
///   "message": "Category not found"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Fixed message catalog for auth and password failures.
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,

    InvalidToken,
    TokenNotProvided,
    UserNotAuthenticated,

    PermissionDenied,

    UserNoLongerExist,

    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidToken => "Token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::UserNotAuthenticated => {
                "Authentication required. Please log in.".to_string()
            }
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
        };
        write!(f, "{}", message)
    }
}

/// Typed failures produced by the taxonomy and moderation cores.
///
/// Every rule violation maps to exactly one variant so callers can match on
/// the kind instead of parsing message strings. `Database` wraps unexpected
/// store failures and is the only variant that reaches clients as a 500.
#[derive(Debug)]
pub enum DomainError {
    /// Addressed row does not exist. Carries the resource kind for the message.
    NotFound(&'static str),
    /// Another row already owns this slug.
    DuplicateSlug(String),
    /// Category parented to itself.
    SelfParent,
    /// Proposed parent lies inside the category's own subtree.
    CyclicParent,
    /// Category still has direct children and cannot be deleted.
    HasChildren,
    /// Comment target post does not exist.
    PostNotFound,
    /// Comment target post exists but is not published.
    PostNotPublished,
    /// Reply parent missing, or attached to a different post.
    ParentNotFound,
    /// Field-level input rejection.
    Validation(String),
    Database(sqlx::Error),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound(kind) => write!(f, "{} not found", kind),
            DomainError::DuplicateSlug(slug) => {
                write!(f, "Slug '{}' is already in use", slug)
            }
            DomainError::SelfParent => write!(f, "A category cannot be its own parent"),
            DomainError::CyclicParent => {
                write!(f, "Cannot move a category under one of its own descendants")
            }
            DomainError::HasChildren => {
                write!(f, "Category has child categories and cannot be deleted")
            }
            DomainError::PostNotFound => write!(f, "Post not found"),
            DomainError::PostNotPublished => {
                write!(f, "Comments are only accepted on published posts")
            }
            DomainError::ParentNotFound => {
                write!(f, "Parent comment not found on this post")
            }
            DomainError::Validation(msg) => write!(f, "{}", msg),
            DomainError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        DomainError::Database(e)
    }
}

/// HTTP error carried through handlers and converted by axum on the way out.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
        }
    }

    /// 500 Internal Server Error
    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// 409 Conflict
    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::CONFLICT,
        }
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    /// 422 Unprocessable Entity
    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message.clone(),
        });

        (self.status, json_response).into_response()
    }
}

/// Status mapping for the domain taxonomy.
///
/// `PostNotPublished` deliberately answers 404 with the not-found message so
/// the public API does not reveal that a draft exists at that id.
impl From<DomainError> for HttpError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(_) | DomainError::PostNotFound | DomainError::ParentNotFound => {
                HttpError::not_found(e.to_string())
            }
            DomainError::PostNotPublished => HttpError::not_found("Post not found"),
            DomainError::DuplicateSlug(_) | DomainError::HasChildren => {
                HttpError::unique_constraint_violation(e.to_string())
            }
            DomainError::SelfParent | DomainError::CyclicParent => {
                HttpError::unprocessable_entity(e.to_string())
            }
            DomainError::Validation(_) => HttpError::bad_request(e.to_string()),
            DomainError::Database(_) => {
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}
