use std::env;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub notifications: NotificationConfig,
    pub scheduler: SchedulerConfig,
    pub nutrition: NutritionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin and base for links sent to users (password reset).
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// bcrypt work factor used when hashing new passwords.
    pub bcrypt_cost: u32,
    /// Lifetime of a password reset token.
    pub password_reset_ttl_minutes: i64,
    /// Return the reset token and link in the API response (development only).
    pub expose_reset_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for auth endpoints (e.g. /api/auth/login)
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Window during which an alert with the same key is suppressed.
    pub cooldown_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Master switch for all background reminder jobs.
    pub enabled: bool,
    /// Offset of the users' wall clock from UTC. Workout dates and start
    /// times are interpreted in this offset.
    pub utc_offset_minutes: i32,
    /// Wall-clock time of the daily "workout tomorrow" scan.
    pub workout_reminder_hour: u32,
    pub workout_reminder_minute: u32,
    /// Period of the same-day "starts soon" scan.
    pub same_day_interval_minutes: u64,
    /// How far ahead the same-day scan looks.
    pub same_day_lookahead_hours: i64,
    /// Daily scan for goals nobody touched in a while.
    pub overdue_goals_enabled: bool,
    pub overdue_goals_hour: u32,
    pub overdue_goals_minute: u32,
    pub overdue_goal_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutritionProvider {
    Mock,
    OpenAi,
}

impl FromStr for NutritionProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(NutritionProvider::Mock),
            "openai" => Ok(NutritionProvider::OpenAi),
            _ => Err(ConfigError::InvalidValue("NUTRITION_PROVIDER".to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NutritionConfig {
    pub provider: NutritionProvider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Timeout for a single upstream request.
    pub timeout_seconds: u64,
    /// Total attempts (first try included) on rate-limit-class errors.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubled for every further attempt.
    pub initial_backoff_ms: u64,
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_hour(key: &str, default: u32) -> Result<u32, ConfigError> {
    let v = env_or(key, default);
    if v > 23 {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(v)
}

fn env_minute(key: &str, default: u32) -> Result<u32, ConfigError> {
    let v = env_or(key, default);
    if v > 59 {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(v)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let provider = match env::var("NUTRITION_PROVIDER") {
            Ok(v) => v.parse()?,
            Err(_) => NutritionProvider::Mock,
        };
        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if provider == NutritionProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingEnv("OPENAI_API_KEY".to_string()));
        }

        let same_day_interval_minutes = env_or(
            "SAME_DAY_REMINDER_INTERVAL_MINUTES",
            defaults.scheduler.same_day_interval_minutes,
        );
        if same_day_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "SAME_DAY_REMINDER_INTERVAL_MINUTES".to_string(),
            ));
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| defaults.server.host.clone()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| defaults.server.frontend_url.clone()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| defaults.database.url.clone()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env_or("JWT_EXPIRATION_HOURS", 72),
            },
            auth: AuthConfig {
                bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
                password_reset_ttl_minutes: env_or("PASSWORD_RESET_TTL_MINUTES", 60),
                expose_reset_token: env_bool("PASSWORD_RESET_EXPOSE_TOKEN", false),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", 3),
                auth_burst: env_or("RATE_LIMIT_AUTH_BURST", 10),
            },
            notifications: NotificationConfig {
                cooldown_hours: env_or("NOTIFICATION_COOLDOWN_HOURS", 24),
            },
            scheduler: SchedulerConfig {
                enabled: env_bool("SCHEDULER_ENABLED", true),
                utc_offset_minutes: env_or("SCHEDULER_UTC_OFFSET_MINUTES", 0),
                workout_reminder_hour: env_hour("WORKOUT_REMINDER_HOUR", 8)?,
                workout_reminder_minute: env_minute("WORKOUT_REMINDER_MINUTE", 0)?,
                same_day_interval_minutes,
                same_day_lookahead_hours: env_or("SAME_DAY_LOOKAHEAD_HOURS", 3),
                overdue_goals_enabled: env_bool("OVERDUE_GOALS_ENABLED", false),
                overdue_goals_hour: env_hour("OVERDUE_GOALS_HOUR", 9)?,
                overdue_goals_minute: env_minute("OVERDUE_GOALS_MINUTE", 0)?,
                overdue_goal_days: env_or("OVERDUE_GOAL_DAYS", 3),
            },
            nutrition: NutritionConfig {
                provider,
                openai_api_key,
                openai_model: env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| defaults.nutrition.openai_model.clone()),
                openai_base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| defaults.nutrition.openai_base_url.clone()),
                timeout_seconds: env_or("NUTRITION_TIMEOUT_SECONDS", 30),
                max_attempts: env_or("NUTRITION_MAX_ATTEMPTS", 3u32).max(1),
                initial_backoff_ms: env_or("NUTRITION_INITIAL_BACKOFF_MS", 500),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/health.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 72,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
                password_reset_ttl_minutes: 60,
                expose_reset_token: false,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
            },
            notifications: NotificationConfig { cooldown_hours: 24 },
            scheduler: SchedulerConfig {
                enabled: true,
                utc_offset_minutes: 0,
                workout_reminder_hour: 8,
                workout_reminder_minute: 0,
                same_day_interval_minutes: 30,
                same_day_lookahead_hours: 3,
                overdue_goals_enabled: false,
                overdue_goals_hour: 9,
                overdue_goals_minute: 0,
                overdue_goal_days: 3,
            },
            nutrition: NutritionConfig {
                provider: NutritionProvider::Mock,
                openai_api_key: None,
                openai_model: "gpt-3.5-turbo".to_string(),
                openai_base_url: "https://api.openai.com/v1".to_string(),
                timeout_seconds: 30,
                max_attempts: 3,
                initial_backoff_ms: 500,
            },
        }
    }
}
