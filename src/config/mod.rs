//! Configuration for the inactivity report.
//!
//! The report is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. Deployments that predate
//! the config file can instead supply everything through environment
//! variables (optionally from a `.env` file), see [`AppConfig::from_env`].
//!
//! # Example
//!
//! ```toml
//! [tableau]
//! host = "tableau.example.com"
//! api_version = "3.19"
//! token_name = "reporting"
//! token_secret = "${TABLEAU_TOKEN_SECRET}"
//!
//! [report]
//! inactivity_days = 90
//!
//! [database]
//! type = "postgres"
//! host = "db.example.com"
//! user = "reporting"
//! password = "${DB_PASSWORD}"
//! name = "analytics"
//! schema = "tableau"
//! ```

mod database;
mod observability;
mod report;
mod tableau;

use std::{path::Path, sync::LazyLock};

pub use database::*;
pub use observability::*;
pub use report::*;
use serde::Deserialize;
pub use tableau::*;

/// Root configuration.
///
/// `tableau` and `database` are required; everything else has defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Tableau Server connection and personal access token.
    pub tableau: TableauConfig,

    /// Inactivity threshold and summary output.
    #[serde(default)]
    pub report: ReportConfig,

    /// Database that receives the report.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Interval used by `watch` mode.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Detect backends missing from this build before typed deserialization,
        // which would otherwise fail with an "unknown variant" error
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from environment variables, loading `.env` first if present.
    ///
    /// Recognized variables: `SERVER_NAME`, `VERSION`, `PERSONAL_ACCESS_TOKEN_NAME`,
    /// `PERSONAL_ACCESS_TOKEN_SECRET`, `DB_HOST`, `DB_USER`, `DB_PASS`, `DB_NAME` and
    /// `DB_SCHEMA` (all required), plus the optional `SERVER_SCHEME`, `DB_PORT` and
    /// `INACTIVITY_DAYS`. The database is MySQL, see `database_from_env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::Validation(format!(
                "Failed to load .env file: {e}"
            )));
        }
        Self::from_process_env()
    }

    /// Build configuration from the current process environment only.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        let tableau = TableauConfig {
            host: require_env("SERVER_NAME")?,
            scheme: optional_env("SERVER_SCHEME").unwrap_or_else(tableau::default_scheme),
            api_version: require_env("VERSION")?,
            token_name: require_env("PERSONAL_ACCESS_TOKEN_NAME")?,
            token_secret: require_env("PERSONAL_ACCESS_TOKEN_SECRET")?,
            timeout_secs: tableau::default_timeout_secs(),
            accept_invalid_certs: false,
        };

        let mut report = ReportConfig::default();
        if let Some(days) = optional_env("INACTIVITY_DAYS") {
            report.inactivity_days = parse_env("INACTIVITY_DAYS", &days)?;
        }

        let config = AppConfig {
            tableau,
            report,
            database: database_from_env()?,
            observability: ObservabilityConfig::default(),
            schedule: ScheduleConfig::default(),
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.tableau.validate()?;
        self.report.validate()?;
        self.schedule.validate()?;
        self.database.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Missing required configuration value: {0}")]
    Missing(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    optional_env(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Validation(format!("{name}: {e}")))
}

/// Legacy deployments write to MySQL. `DB_SCHEMA` names the database, since a
/// MySQL schema and database are the same thing. `DB_NAME` is still required
/// but not used for the connection.
#[cfg(feature = "database-mysql")]
fn database_from_env() -> Result<DatabaseConfig, ConfigError> {
    let host = require_env("DB_HOST")?;
    let user = require_env("DB_USER")?;
    let password = require_env("DB_PASS")?;
    require_env("DB_NAME")?;
    let schema = require_env("DB_SCHEMA")?;
    let port = match optional_env("DB_PORT") {
        Some(port) => parse_env("DB_PORT", &port)?,
        None => database::default_mysql_port(),
    };

    Ok(DatabaseConfig::Mysql(MysqlConfig {
        url: None,
        host: Some(host),
        port,
        user: Some(user),
        password: Some(password),
        name: Some(schema),
        connect_timeout_secs: database::default_connect_timeout(),
        run_migrations: false,
    }))
}

#[cfg(not(feature = "database-mysql"))]
fn database_from_env() -> Result<DatabaseConfig, ConfigError> {
    Err(ConfigError::Validation(
        "Environment-only configuration targets MySQL, which requires the \
         'database-mysql' feature. Use a config file instead."
            .into(),
    ))
}

/// Check for feature-gated configuration values before typed deserialization.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let Some(type_val) = raw
        .get("database")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
    else {
        return Ok(());
    };

    let missing_feature: Option<&str> = match type_val {
        #[cfg(not(feature = "database-sqlite"))]
        "sqlite" => Some("database-sqlite"),
        #[cfg(not(feature = "database-postgres"))]
        "postgres" => Some("database-postgres"),
        #[cfg(not(feature = "database-mysql"))]
        "mysql" => Some("database-mysql"),
        _ => None,
    };

    match missing_feature {
        Some(feature) => Err(ConfigError::Validation(format!(
            "database type '{type_val}' requires the '{feature}' feature, \
             which is not compiled into this build.\n\
             Rebuild with: cargo build --features {feature}"
        ))),
        None => Ok(()),
    }
}

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Variables inside a comment are left alone
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
