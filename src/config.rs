/// Configuration management for the LoopRewards wallet service
use crate::error::{WalletError, WalletResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub signup: SignupConfig,
    pub rewards: RewardsConfig,
    pub name_resolution: NameResolutionConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public base URL used for referral links
    pub public_url: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub wallet_db: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("./data"),
            wallet_db: PathBuf::from("./data/wallet.sqlite"),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of an issued session token, in seconds
    pub session_ttl_secs: i64,
    /// Emails that receive the administrative role when they verify
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-only-secret-change-me-now!".to_string(),
            session_ttl_secs: 60 * 60 * 24,
            admin_emails: vec![],
        }
    }
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Signup flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupConfig {
    /// How long a pending one-time code stays valid, in seconds
    pub code_ttl_secs: i64,
    /// Return the one-time code in the signup response
    pub expose_code: bool,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 15 * 60,
            expose_code: true,
        }
    }
}

/// Balances and grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    pub starting_balance: i64,
    pub starting_points: i64,
    pub referral_bonus: i64,
    /// Reserve balance before the first disbursement is recorded
    pub initial_reserve: i64,
    /// Number of transactions shown on the dashboard
    pub dashboard_transactions: i64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1250,
            starting_points: 1000,
            referral_bonus: 500,
            initial_reserve: 1_500_000,
            dashboard_transactions: 10,
        }
    }
}

/// Account-name resolution collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameResolutionConfig {
    /// Base URL of the generative language API
    pub endpoint: String,
    /// API key; resolution falls back to local names when absent
    pub api_key: Option<String>,
    pub model: String,
    /// Artificial handshake delay, in milliseconds
    pub delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for NameResolutionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            delay_ms: 0,
            timeout_secs: 10,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub unauthenticated_rps: u32,
    pub authenticated_rps: u32,
    pub admin_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unauthenticated_rps: 10,
            authenticated_rps: 100,
            admin_rps: 1000,
            burst_size: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_list(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WalletResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("WALLET_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("WALLET_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| WalletError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("WALLET_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env::var("WALLET_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("WALLET_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let wallet_db = env::var("WALLET_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("wallet.sqlite"));

        let jwt_secret = env::var("WALLET_JWT_SECRET")
            .map_err(|_| WalletError::Validation("JWT secret required".to_string()))?;
        let session_ttl_secs = parse_env("WALLET_SESSION_TTL_SECS", 60 * 60 * 24);
        let admin_emails = split_list(env::var("WALLET_ADMIN_EMAILS").unwrap_or_default());

        let email = if let Ok(smtp_url) = env::var("WALLET_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("WALLET_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let signup_defaults = SignupConfig::default();
        let signup = SignupConfig {
            code_ttl_secs: parse_env("WALLET_SIGNUP_CODE_TTL_SECS", signup_defaults.code_ttl_secs),
            expose_code: parse_env("WALLET_SIGNUP_EXPOSE_CODE", signup_defaults.expose_code),
        };

        let reward_defaults = RewardsConfig::default();
        let rewards = RewardsConfig {
            starting_balance: parse_env("WALLET_STARTING_BALANCE", reward_defaults.starting_balance),
            starting_points: parse_env("WALLET_STARTING_POINTS", reward_defaults.starting_points),
            referral_bonus: parse_env("WALLET_REFERRAL_BONUS", reward_defaults.referral_bonus),
            initial_reserve: parse_env("WALLET_INITIAL_RESERVE", reward_defaults.initial_reserve),
            dashboard_transactions: parse_env(
                "WALLET_DASHBOARD_TRANSACTIONS",
                reward_defaults.dashboard_transactions,
            ),
        };

        let naming_defaults = NameResolutionConfig::default();
        let name_resolution = NameResolutionConfig {
            endpoint: env::var("WALLET_NAME_RESOLUTION_ENDPOINT").unwrap_or(naming_defaults.endpoint),
            api_key: env::var("WALLET_NAME_RESOLUTION_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            model: env::var("WALLET_NAME_RESOLUTION_MODEL").unwrap_or(naming_defaults.model),
            delay_ms: parse_env("WALLET_NAME_RESOLUTION_DELAY_MS", 1200),
            timeout_secs: parse_env(
                "WALLET_NAME_RESOLUTION_TIMEOUT_SECS",
                naming_defaults.timeout_secs,
            ),
        };

        let limit_defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: parse_env("WALLET_RATE_LIMITS_ENABLED", limit_defaults.enabled),
            unauthenticated_rps: parse_env(
                "WALLET_RATE_LIMIT_UNAUTHENTICATED_RPS",
                limit_defaults.unauthenticated_rps,
            ),
            authenticated_rps: parse_env(
                "WALLET_RATE_LIMIT_AUTHENTICATED_RPS",
                limit_defaults.authenticated_rps,
            ),
            admin_rps: parse_env("WALLET_RATE_LIMIT_ADMIN_RPS", limit_defaults.admin_rps),
            burst_size: parse_env("WALLET_RATE_LIMIT_BURST", limit_defaults.burst_size),
        };

        let level = env::var("WALLET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json = env::var("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                wallet_db,
            },
            authentication: AuthConfig {
                jwt_secret,
                session_ttl_secs,
                admin_emails,
            },
            email,
            signup,
            rewards,
            name_resolution,
            rate_limit,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> WalletResult<()> {
        if self.service.hostname.is_empty() {
            return Err(WalletError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(WalletError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_ttl_secs <= 0 || self.signup.code_ttl_secs <= 0 {
            return Err(WalletError::Validation("TTL values must be positive".to_string()));
        }

        if !self.signup.expose_code && self.email.is_none() {
            return Err(WalletError::Validation(
                "Signup codes must be either exposed or mailed; configure SMTP or enable expose_code"
                    .to_string(),
            ));
        }

        if self.rewards.starting_balance < 0 || self.rewards.initial_reserve < 0 {
            return Err(WalletError::Validation(
                "Starting balance and reserve cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether an email is configured to receive the administrative role
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.authentication.admin_emails.iter().any(|e| *e == email)
    }
}
