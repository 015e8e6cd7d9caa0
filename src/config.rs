use serde::{Deserialize, Serialize};

/// Username used for the upstream account when no API key is configured.
pub const FALLBACK_USERNAME: &str = "ayushi";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub twitter_clone: TwitterCloneConfig,
    pub generator: GeneratorConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterCloneConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Overrides the username derived from the API key
    pub username: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    Simulated,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub mode: GeneratorMode,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub max_tokens: u32,
    pub default_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Take the client address from `X-Forwarded-For` (deployments behind a proxy)
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: 10,
        }
    }
}

impl Default for TwitterCloneConfig {
    fn default() -> Self {
        Self {
            base_url: "https://twitterclone-server-2xz2.onrender.com".to_string(),
            api_key: None,
            username: None,
            timeout_secs: 15,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Simulated,
            min_delay_ms: 800,
            max_delay_ms: 2500,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            llm_timeout_secs: 30,
            max_tokens: 120,
            default_topic: "a general tweet idea".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            trust_forwarded_for: true,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string(),
                "https://ai-twitter-bot.pages.dev".to_string(),
                "https://ai-twitter-bot-ayu.onrender.com".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // TWEETPROXY__SERVER__PORT=8000 style overrides
        config = config.add_source(
            config::Environment::with_prefix("TWEETPROXY")
                .separator("__")
                .prefix_separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        let config = config.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;
        app_config.apply_env_fallbacks();

        Ok(app_config)
    }

    /// Fill secrets from the conventional unprefixed variables
    fn apply_env_fallbacks(&mut self) {
        if self.twitter_clone.api_key.is_none() {
            self.twitter_clone.api_key = non_empty_env("TWITTER_CLONE_API_KEY");
        }
        if self.database.connection_string.is_none() {
            self.database.connection_string = non_empty_env("DATABASE_URL");
        }
        if self.generator.llm_api_key.is_none() {
            self.generator.llm_api_key =
                non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("OPENAI_API_KEY"));
        }
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl TwitterCloneConfig {
    /// The configured API key, treating an empty string as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Account whose tweets are posted and listed upstream.
    ///
    /// Keys look like `<username>_<secret>`, so the username is everything
    /// before the first underscore.
    pub fn external_username(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return username.to_string();
        }
        match self.api_key() {
            Some(key) => key.split('_').next().unwrap_or(key).to_string(),
            None => FALLBACK_USERNAME.to_string(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
