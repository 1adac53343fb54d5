#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub llm_url: String,
    pub model_name: String,
    pub frontend_url: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {

    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let llm_url = std::env::var("LLM_URL").expect("LLM_URL must be set");
        let model_name = std::env::var("MODEL_NAME").expect("MODEL_NAME must be set");
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");
        let admin_email = std::env::var("ADMIN_EMAIL").expect("ADMIN_EMAIL must be set");
        let admin_password = std::env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set");
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().expect("JWT_MAXAGE must be an integer"),
            port,
            llm_url,
            model_name,
            frontend_url,
            admin_email,
            admin_password,
        }
    }

}
