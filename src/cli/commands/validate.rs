//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Packline configuration file.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Environment: {:?}", config.environment);
        println!("  Dry Run: {}", config.application.dry_run);

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    println!("  Ledger: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        crate::config::redact_url_credentials(
                            secrecy::ExposeSecret::expose_secret(&pg_config.connection_string)
                                .as_ref()
                        )
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                    println!("  SSL Mode: {}", pg_config.ssl_mode);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Ledger: in-memory (not persisted)");
            }
        }

        println!("  Auto-Save Debounce: {} ms", config.autosave.debounce_ms);
        println!(
            "  Auto-Save Retries: {} {:?}",
            config.autosave.max_retries, config.autosave.retry_backoff_ms
        );
        println!(
            "  Reconcile Attempts: {}",
            config.reconcile.max_attempts
        );
        if let Some(date) = config.session.default_date {
            println!("  Default Date: {date}");
        }
        println!();
        Ok(EXIT_OK)
    }
}
