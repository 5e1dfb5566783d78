//! Failures raised by finmetrics itself.
//!
//! Callers work with `anyhow::Result` and attach context; these variants
//! mark which collaborator failed so tests and the CLI can tell them apart.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinmetricsError {
    /// hledger could not be run or exited unsuccessfully
    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// Market data provider failures
    #[error("pricing error: {0}")]
    Pricing(String),

    /// The metrics store was unreachable or rejected a request
    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_ledger_error_message() {
        let err = FinmetricsError::Ledger("hledger exited with status 1".to_string());
        assert_eq!(err.to_string(), "ledger error: hledger exited with status 1");
    }

    #[test]
    fn test_context_keeps_variant_reachable() {
        let result: anyhow::Result<()> = Err(FinmetricsError::Parse("bad amount".to_string()).into());
        let err = result.context("failed to read register").unwrap_err();

        assert_eq!(err.to_string(), "failed to read register");
        assert!(matches!(
            err.downcast_ref::<FinmetricsError>(),
            Some(FinmetricsError::Parse(_))
        ));
    }
}
