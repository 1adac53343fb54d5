mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod http;
mod middleware;
mod models;
mod moderation;
mod routes;
mod taxonomy;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::{DBClient, UserExt};
use dotenv::dotenv;
use http::LlmClient;
use models::UserRole;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
    pub llm_client: LlmClient,
}

#[tokio::main]
async fn main() {
    let _guard = tracing_config::init_tracing();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().unwrap())
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    if let Err(err) = seed_admin(&db_client, &config).await {
        tracing::error!("Failed to seed the admin account: {}", err);
        std::process::exit(1);
    }

    let llm_client = LlmClient::new(reqwest::Client::new());

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        llm_client,
    };

    let app = routes::create_router(app_state).layer(cors);

    println!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}

/// First boot creates the admin account from the environment. Later boots
/// leave existing accounts alone.
async fn seed_admin(db_client: &DBClient, config: &Config) -> Result<(), String> {
    let admin_exists = db_client.admin_exists().await.map_err(|e| e.to_string())?;
    if admin_exists {
        return Ok(());
    }

    let hash_password = utils::password::hash(&config.admin_password).map_err(|e| e.to_string())?;

    db_client
        .save_user("Admin", &config.admin_email, &hash_password, UserRole::Admin)
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(email = %config.admin_email, "Admin account created");
    Ok(())
}
