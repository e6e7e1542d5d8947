use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub reporting: ReportingConfig,
    pub notifications: NotificationConfig,
    pub twilio: Option<TwilioConfig>,
    pub email: Option<EmailConfig>,
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

        let timezone_name =
            env::var("REPORT_TIMEZONE").unwrap_or_else(|_| "America/New_York".to_string());
        let timezone = timezone_name
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        let revenue_per_kw = parse_var("REVENUE_PER_KW", 1500.0_f64)?;
        if !revenue_per_kw.is_finite() || revenue_per_kw < 0.0 {
            return Err(ConfigError::InvalidNumber {
                name: "REVENUE_PER_KW",
                value: revenue_per_kw.to_string(),
            });
        }

        let reporting = ReportingConfig {
            timezone,
            revenue_per_kw,
            appointments_csv: optional_var("APPOINTMENTS_CSV").map(PathBuf::from),
            contacts_csv: optional_var("CONTACTS_CSV").map(PathBuf::from),
            management_key: optional_var("MANAGEMENT_KEY"),
            token_secret: optional_var("REPORT_TOKEN_SECRET"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cache_ttl: Duration::from_secs(parse_var("REPORT_CACHE_TTL_SECS", 3600_u64)?),
        };

        let notifications = NotificationConfig {
            dry_run: parse_bool_var("SMS_DRY_RUN", environment != AppEnvironment::Production)?,
            delay: Duration::from_millis(parse_var("SMS_DELAY_MS", 1000_u64)?),
            management: parse_pairs("MANAGEMENT_PHONES")?
                .into_iter()
                .map(|(role, phone)| ManagementRecipient { role, phone })
                .collect(),
            internal_reps: parse_pairs("INTERNAL_REPS")?
                .into_iter()
                .map(|(route_keyword, phone)| RouteRepresentative {
                    route_keyword: route_keyword.to_lowercase(),
                    phone,
                })
                .collect(),
        };

        let twilio = match (
            optional_var("TWILIO_ACCOUNT_SID"),
            optional_var("TWILIO_AUTH_TOKEN"),
            optional_var("TWILIO_FROM_PHONE"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_phone)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_phone,
                messaging_service_sid: optional_var("TWILIO_MESSAGING_SID"),
            }),
            _ => None,
        };

        let email = match (optional_var("SENDGRID_API_KEY"), optional_var("FROM_EMAIL")) {
            (Some(api_key), Some(from_email)) => Some(EmailConfig {
                api_key,
                from_email,
                from_name: optional_var("FROM_NAME")
                    .unwrap_or_else(|| "Partner Reports".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            reporting,
            notifications,
            twilio,
            email,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Calendar, revenue estimate, and report-serving settings.
#[derive(Clone)]
pub struct ReportingConfig {
    pub timezone: Tz,
    pub revenue_per_kw: f64,
    pub appointments_csv: Option<PathBuf>,
    pub contacts_csv: Option<PathBuf>,
    pub management_key: Option<String>,
    pub token_secret: Option<String>,
    pub public_base_url: String,
    pub cache_ttl: Duration,
}

impl fmt::Debug for ReportingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingConfig")
            .field("timezone", &self.timezone)
            .field("revenue_per_kw", &self.revenue_per_kw)
            .field("appointments_csv", &self.appointments_csv)
            .field("contacts_csv", &self.contacts_csv)
            .field("management_key", &self.management_key.as_ref().map(|_| "<redacted>"))
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .field("public_base_url", &self.public_base_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementRecipient {
    pub role: String,
    pub phone: String,
}

/// Internal rep notified about partners whose route mentions `route_keyword`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRepresentative {
    pub route_keyword: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub dry_run: bool,
    pub delay: Duration,
    pub management: Vec<ManagementRecipient>,
    pub internal_reps: Vec<RouteRepresentative>,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub messaging_service_sid: Option<String>,
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_phone", &self.from_phone)
            .field("messaging_service_sid", &self.messaging_service_sid)
            .finish()
    }
}

/// SendGrid credentials and sender identity for partner report emails.
#[derive(Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_key", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn parse_bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value }),
        },
        None => Ok(default),
    }
}

/// Parses `label=value,label=value` lists.
fn parse_pairs(name: &'static str) -> Result<Vec<(String, String)>, ConfigError> {
    let Some(raw) = optional_var(name) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((label, value)) if !label.trim().is_empty() && !value.trim().is_empty() => {
                Ok((label.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidPair {
                name,
                entry: entry.to_string(),
            }),
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimezone(String),
    InvalidNumber { name: &'static str, value: String },
    InvalidFlag { name: &'static str, value: String },
    InvalidPair { name: &'static str, entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimezone(value) => {
                write!(f, "REPORT_TIMEZONE '{value}' is not an IANA timezone name")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative number, got '{value}'")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
            ConfigError::InvalidPair { name, entry } => {
                write!(f, "{name} entries must look like label=phone, got '{entry}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 21] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "REPORT_TIMEZONE",
        "REVENUE_PER_KW",
        "APPOINTMENTS_CSV",
        "CONTACTS_CSV",
        "MANAGEMENT_KEY",
        "REPORT_TOKEN_SECRET",
        "PUBLIC_BASE_URL",
        "REPORT_CACHE_TTL_SECS",
        "SMS_DRY_RUN",
        "SMS_DELAY_MS",
        "MANAGEMENT_PHONES",
        "INTERNAL_REPS",
        "TWILIO_ACCOUNT_SID",
        "TWILIO_AUTH_TOKEN",
        "SENDGRID_API_KEY",
        "FROM_EMAIL",
        "FROM_NAME",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in VARS {
            env::remove_var(var);
        }
        env::remove_var("TWILIO_FROM_PHONE");
        env::remove_var("TWILIO_MESSAGING_SID");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.reporting.timezone, chrono_tz::America::New_York);
        assert_eq!(config.reporting.revenue_per_kw, 1500.0);
        assert!(config.notifications.dry_run);
        assert_eq!(config.notifications.delay, Duration::from_millis(1000));
        assert!(config.notifications.management.is_empty());
        assert!(config.twilio.is_none());
        assert!(config.email.is_none());
    }

    #[test]
    fn email_needs_key_and_sender() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SENDGRID_API_KEY", "SG.key");
        assert!(AppConfig::load().expect("config loads").email.is_none());

        env::set_var("FROM_EMAIL", "reports@example.com");
        let email = AppConfig::load()
            .expect("config loads")
            .email
            .expect("email configured");
        assert_eq!(email.from_email, "reports@example.com");
        assert_eq!(email.from_name, "Partner Reports");
        assert!(!format!("{email:?}").contains("SG.key"));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn parses_recipient_lists_and_production_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("MANAGEMENT_PHONES", "ops=+19725550100, sales = 4355550101");
        env::set_var("INTERNAL_REPS", "Robert=+19725550102");
        let config = AppConfig::load().expect("config loads");

        assert!(!config.notifications.dry_run);
        assert_eq!(config.notifications.management.len(), 2);
        assert_eq!(config.notifications.management[1].role, "sales");
        assert_eq!(config.notifications.management[1].phone, "4355550101");
        assert_eq!(config.notifications.internal_reps[0].route_keyword, "robert");
        reset_env();
    }

    #[test]
    fn rejects_unknown_timezone_and_bad_pairs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REPORT_TIMEZONE", "Mars/Olympus");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimezone(_))
        ));

        reset_env();
        env::set_var("MANAGEMENT_PHONES", "ops");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPair { .. })
        ));
        reset_env();
    }
}
