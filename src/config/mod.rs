//! Configuration management for Packline.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Packline uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PACKLINE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run mode
//! - [`PostgreSQLConfig`] - Ledger database connection
//! - [`AutoSaveConfig`] - Debounce window, status display times, upsert retries
//! - [`ReconcileConfig`] - Optimistic-lock retry policy
//! - [`SessionConfig`] - Session-wide default date
//! - [`LoggingConfig`] - File logging
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${PACKLINE_PG_URL}"
//!
//! [autosave]
//! debounce_ms = 500
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use packline::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("packline.toml")?;
//! println!("Debounce: {} ms", config.autosave.debounce_ms);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, AutoSaveConfig, DatabaseTarget, Environment, LoggingConfig,
    PacklineConfig, PostgreSQLConfig, ReconcileConfig, SessionConfig,
};
pub use secret::{redact_url_credentials, secret_string, SecretString, SecretValue};
