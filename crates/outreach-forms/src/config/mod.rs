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

/// Top-level configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub sheets: SheetsConfig,
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
        let log_format = match non_empty_var("APP_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            None if environment == AppEnvironment::Production => LogFormat::Json,
            None => LogFormat::Compact,
        };

        let sheets = SheetsConfig::from_env(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            sheets,
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
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Which spreadsheet backend receives appended rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Google,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "sheets" | "google-sheets" => Some(Self::Google),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Service-account credentials used to reach Google Sheets.
#[derive(Clone)]
pub enum SheetsCredentials {
    /// Client email and PEM private key supplied directly through the environment.
    Inline {
        client_email: String,
        private_key: String,
    },
    /// Path to a downloaded service-account JSON key.
    KeyFile(PathBuf),
}

impl fmt::Debug for SheetsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsCredentials::Inline { client_email, .. } => f
                .debug_struct("Inline")
                .field("client_email", client_email)
                .field("private_key", &"<redacted>")
                .finish(),
            SheetsCredentials::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

/// Spreadsheet store settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub backend: StoreBackend,
    pub spreadsheet_id: Option<String>,
    pub credentials: Option<SheetsCredentials>,
    pub initialize_on_startup: bool,
}

impl SheetsConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let spreadsheet_id = non_empty_var("GOOGLE_SHEETS_SPREADSHEET_ID");

        let backend = match non_empty_var("STORE_BACKEND") {
            Some(raw) => StoreBackend::parse(&raw).ok_or(ConfigError::InvalidStoreBackend(raw))?,
            None if spreadsheet_id.is_some() => StoreBackend::Google,
            None => StoreBackend::Memory,
        };

        let credentials = match non_empty_var("GOOGLE_SHEETS_CREDENTIALS_FILE") {
            Some(path) => Some(SheetsCredentials::KeyFile(PathBuf::from(path))),
            None => match (
                non_empty_var("GOOGLE_SHEETS_CLIENT_EMAIL"),
                non_empty_var("GOOGLE_SHEETS_PRIVATE_KEY"),
            ) {
                (Some(client_email), Some(private_key)) => Some(SheetsCredentials::Inline {
                    client_email,
                    private_key: private_key.replace("\\n", "\n"),
                }),
                _ => None,
            },
        };

        let initialize_on_startup = match non_empty_var("SHEETS_INIT_ON_STARTUP") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "SHEETS_INIT_ON_STARTUP",
                value: raw,
            })?,
            None => true,
        };

        match backend {
            StoreBackend::Google => {
                if spreadsheet_id.is_none() {
                    return Err(ConfigError::MissingSheetsSetting(
                        "GOOGLE_SHEETS_SPREADSHEET_ID",
                    ));
                }
                if credentials.is_none() {
                    return Err(ConfigError::MissingSheetsSetting(
                        "GOOGLE_SHEETS_CLIENT_EMAIL/GOOGLE_SHEETS_PRIVATE_KEY or GOOGLE_SHEETS_CREDENTIALS_FILE",
                    ));
                }
            }
            StoreBackend::Memory if environment == AppEnvironment::Production => {
                return Err(ConfigError::MemoryStoreInProduction);
            }
            StoreBackend::Memory => {}
        }

        Ok(Self {
            backend,
            spreadsheet_id,
            credentials,
            initialize_on_startup,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidStoreBackend(String),
    InvalidFlag { name: &'static str, value: String },
    MissingSheetsSetting(&'static str),
    MemoryStoreInProduction,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (found '{value}')")
            }
            ConfigError::InvalidStoreBackend(value) => {
                write!(f, "STORE_BACKEND must be 'google' or 'memory' (found '{value}')")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (found '{value}')")
            }
            ConfigError::MissingSheetsSetting(name) => {
                write!(f, "google sheets backend selected but {name} is not set")
            }
            ConfigError::MemoryStoreInProduction => write!(
                f,
                "STORE_BACKEND=memory is not allowed in production; configure Google Sheets"
            ),
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
