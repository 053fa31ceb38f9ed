//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, PacklineConfig};
use super::secret::secret_string;
use crate::domain::errors::PacklineError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PacklineConfig
/// 4. Applies environment variable overrides (PACKLINE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the file cannot be read or parsed, a referenced
/// environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use packline::config::loader::load_config;
///
/// let config = load_config("packline.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PacklineConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PacklineError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PacklineError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<PacklineConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PacklineConfig = toml::from_str(&contents)
        .map_err(|e| PacklineError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PacklineError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched. All missing variables are reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PacklineError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed_line = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PacklineError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using PACKLINE_* prefix
///
/// Environment variables follow the pattern: PACKLINE_<SECTION>_<KEY>
/// For example: PACKLINE_AUTOSAVE_DEBOUNCE_MS, PACKLINE_POSTGRESQL_CONNECTION_STRING
fn apply_env_overrides(config: &mut PacklineConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PACKLINE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("PACKLINE_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    if let Ok(val) = std::env::var("PACKLINE_DATABASE_TARGET") {
        config.database_target = match val.to_ascii_lowercase().as_str() {
            "postgresql" => DatabaseTarget::PostgreSQL,
            "memory" => DatabaseTarget::Memory,
            other => {
                return Err(PacklineError::Configuration(format!(
                    "Invalid PACKLINE_DATABASE_TARGET '{other}'. Must be one of: postgresql, memory"
                )))
            }
        };
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("PACKLINE_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("PACKLINE_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
        if let Ok(val) = std::env::var("PACKLINE_POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
    }

    // Auto-save overrides
    if let Ok(val) = std::env::var("PACKLINE_AUTOSAVE_DEBOUNCE_MS") {
        if let Ok(ms) = val.parse() {
            config.autosave.debounce_ms = ms;
        }
    }
    if let Ok(val) = std::env::var("PACKLINE_AUTOSAVE_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.autosave.max_retries = retries;
        }
    }

    // Reconcile overrides
    if let Ok(val) = std::env::var("PACKLINE_RECONCILE_MAX_ATTEMPTS") {
        if let Ok(attempts) = val.parse() {
            config.reconcile.max_attempts = attempts;
        }
    }

    // Session overrides
    if let Ok(val) = std::env::var("PACKLINE_SESSION_DEFAULT_DATE") {
        let date = val.parse().map_err(|e| {
            PacklineError::Configuration(format!("Invalid PACKLINE_SESSION_DEFAULT_DATE '{val}': {e}"))
        })?;
        config.session.default_date = Some(date);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PACKLINE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("PACKLINE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
