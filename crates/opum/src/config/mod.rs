use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub upload: UploadConfig,
    pub directory: DirectoryConfig,
    pub reset: ResetConfig,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let date_format =
            env::var("UPLOAD_DATE_FORMAT").unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string());
        let notification_policy = match env::var("UPLOAD_NOTIFICATION_POLICY") {
            Ok(value) => NotificationPolicy::parse(&value)
                .ok_or(ConfigError::InvalidNotificationPolicy { value })?,
            Err(_) => NotificationPolicy::BestEffort,
        };

        let roster_path = env::var("DIRECTORY_ROSTER").ok().map(PathBuf::from);

        let server_url =
            env::var("RESET_SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let token_ttl_hours = env::var("RESET_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| DEFAULT_TOKEN_TTL_HOURS.to_string())
            .parse::<i64>()
            .ok()
            .filter(|hours| (1..=MAX_TOKEN_TTL_HOURS).contains(hours))
            .ok_or(ConfigError::InvalidTokenTtl)?;
        let sender =
            env::var("RESET_SENDER").unwrap_or_else(|_| "noreply@opum.local".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            upload: UploadConfig {
                date_format,
                notification_policy,
            },
            directory: DirectoryConfig { roster_path },
            reset: ResetConfig {
                server_url,
                token_ttl_hours,
                sender,
            },
            smtp: SmtpConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Longest accepted reset link lifetime, one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_SMTP_PORT: u16 = 587;

/// What an upload does when the reset emails cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPolicy {
    /// Log the failure and still report the upload as successful.
    #[default]
    BestEffort,
    /// Report the upload as failed even though the batch was saved.
    Strict,
}

impl NotificationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "fire-and-forget" => Some(Self::BestEffort),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Roster upload behavior.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub date_format: String,
    pub notification_policy: NotificationPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            notification_policy: NotificationPolicy::default(),
        }
    }
}

/// Source of the employee directory used for existence checks.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    pub roster_path: Option<PathBuf>,
}

/// Password reset link settings.
#[derive(Debug, Clone)]
pub struct ResetConfig {
    pub server_url: String,
    pub token_ttl_hours: i64,
    pub sender: String,
}

/// SMTP relay used for outbound mail. Absent when `SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(host) = env::var("SMTP_HOST") else {
            return Ok(None);
        };

        let port = match env::var("SMTP_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidSmtpPort)?,
            Err(_) => DEFAULT_SMTP_PORT,
        };

        Ok(Some(Self {
            host,
            port,
            user: env::var("SMTP_USER").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
        }))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNotificationPolicy { value: String },
    InvalidTokenTtl,
    InvalidSmtpPort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNotificationPolicy { value } => write!(
                f,
                "UPLOAD_NOTIFICATION_POLICY must be 'best-effort' or 'strict', got '{}'",
                value
            ),
            ConfigError::InvalidTokenTtl => {
                write!(
                    f,
                    "RESET_TOKEN_TTL_HOURS must be between 1 and {} hours",
                    MAX_TOKEN_TTL_HOURS
                )
            }
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNotificationPolicy { .. }
            | ConfigError::InvalidTokenTtl
            | ConfigError::InvalidSmtpPort => None,
        }
    }
}
