use anyhow::Context;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Runtime settings, loaded once at startup from the environment (`.env` is
/// honored via dotenvy). See `.env.example` for the full list.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Origin allowed by CORS, e.g. the React dev server.
    pub frontend_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ai_model: String,
    /// Sent to OpenRouter as the referring site.
    pub site_url: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().context("PORT is not a valid port number")?,
            Err(_) => DEFAULT_PORT,
        };
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                tracing::warn!("JWT_SECRET is not set, using an insecure default");
                "your-secret-key-change-in-production".into()
            }
        };
        let jwt_expiry_days = match std::env::var("JWT_EXPIRY_DAYS") {
            Ok(days) => days.parse().context("JWT_EXPIRY_DAYS is not a number")?,
            Err(_) => 7,
        };
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let openai_base_url = std::env::var("OPENAI_BASE_URL").ok();
        let ai_model = std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let site_url =
            std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let production = std::env::var("LUNO_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        Ok(Self {
            database_url,
            port,
            frontend_url,
            jwt_secret,
            jwt_expiry_days,
            openai_api_key,
            openai_base_url,
            ai_model,
            site_url,
            production,
        })
    }

    /// OpenRouter keys are spotted by their `sk-or-` prefix.
    pub fn uses_openrouter(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .is_some_and(|key| key.starts_with("sk-or-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "mysql://root@localhost/luno".into(),
            port: DEFAULT_PORT,
            frontend_url: "http://localhost:5173".into(),
            jwt_secret: "secret".into(),
            jwt_expiry_days: 7,
            openai_api_key: None,
            openai_base_url: None,
            ai_model: DEFAULT_MODEL.into(),
            site_url: "http://localhost:5173".into(),
            production: false,
        }
    }

    #[test]
    fn openrouter_detection_depends_on_key_prefix() {
        let mut config = base_config();
        assert!(!config.uses_openrouter());
        config.openai_api_key = Some("sk-proj-abc123".into());
        assert!(!config.uses_openrouter());
        config.openai_api_key = Some("sk-or-v1-abc123".into());
        assert!(config.uses_openrouter());
    }
}
