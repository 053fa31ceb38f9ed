//! CLI command implementations
//!
//! Exit codes: 0 success, 1 partial sync failure, 2 configuration error,
//! 3 constraint violation, 4 connection error, 5 fatal error, 130 interrupted.

pub mod delete;
pub mod init;
pub mod reconcile;
pub mod status;
pub mod sync;
pub mod validate;

use crate::adapters::ledger::{create_dry_run_ledgers, create_ledgers, Ledgers};
use crate::config::{load_config, PacklineConfig};
use crate::domain::{PacklineError, ProjectId};

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_PARTIAL: i32 = 1;
pub(crate) const EXIT_CONFIG: i32 = 2;
pub(crate) const EXIT_CONSTRAINT: i32 = 3;
pub(crate) const EXIT_CONNECTION: i32 = 4;
pub(crate) const EXIT_FATAL: i32 = 5;
pub(crate) const EXIT_INTERRUPTED: i32 = 130;

/// Exit code for an error that ends a command
pub(crate) fn exit_code_for(error: &PacklineError) -> i32 {
    match error {
        PacklineError::Configuration(_) => EXIT_CONFIG,
        PacklineError::ConstraintViolation(_) => EXIT_CONSTRAINT,
        PacklineError::Connection(_) | PacklineError::Transport(_) => EXIT_CONNECTION,
        _ => EXIT_FATAL,
    }
}

/// Load and validate the configuration, printing the failure
pub(crate) fn load_or_report(config_path: &str) -> Result<PacklineConfig, i32> {
    load_config(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        EXIT_CONFIG
    })
}

/// Open the configured ledgers, or an in-memory copy in dry-run mode
pub(crate) async fn open_ledgers(
    config: &PacklineConfig,
    projects: &[ProjectId],
) -> Result<Ledgers, i32> {
    let ledgers = if config.application.dry_run {
        create_dry_run_ledgers(config, projects).await
    } else {
        create_ledgers(config).await
    };

    let ledgers = ledgers.map_err(|e| {
        println!("❌ Failed to connect to the ledger");
        println!("   Error: {e}");
        match e {
            PacklineError::Configuration(_) => EXIT_CONFIG,
            _ => EXIT_CONNECTION,
        }
    })?;

    if let Err(e) = ledgers.packing.test_connection().await {
        println!("❌ Ledger connection test failed");
        println!("   Error: {e}");
        return Err(EXIT_CONNECTION);
    }

    Ok(ledgers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConstraintViolation;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&PacklineError::Configuration("x".into())),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code_for(&PacklineError::ConstraintViolation(ConstraintViolation::new(
                550, 500
            ))),
            EXIT_CONSTRAINT
        );
        assert_eq!(
            exit_code_for(&PacklineError::Transport("timeout".into())),
            EXIT_CONNECTION
        );
        assert_eq!(
            exit_code_for(&PacklineError::NotFound("P-1".into())),
            EXIT_FATAL
        );
    }

    #[tokio::test]
    async fn test_open_memory_ledgers() {
        let config = crate::config::parse_config("database_target = \"memory\"").unwrap();
        assert!(open_ledgers(&config, &[]).await.is_ok());
    }
}
