use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler, category::category_handler, comment::comment_handler,
        post::post_handler, search::search_handler, settings::settings_handler, tag::tag_handler,
        users::users_handler,
    },
    middleware::{auth, role_check},
    models::UserRole,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/search", search_handler())
        .nest("/auth", auth_handler(app_state.clone()))
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/categories", category_handler(app_state.clone()))
        .nest("/tags", tag_handler(app_state.clone()))
        .nest("/posts", post_handler(app_state.clone()))
        // the whole moderation surface is admin only
        .nest(
            "/comments",
            comment_handler()
                .layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/settings", settings_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
