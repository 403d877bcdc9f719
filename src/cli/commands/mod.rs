//! CLI command implementations
//!
//! Every command returns its process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success, including batches with skipped units |
//! | 2 | Configuration or input validation error |
//! | 3 | Units failed and `--strict` was given |
//! | 4 | Store connection failure |
//! | 5 | Session write or other fatal error |

pub mod cleanup;
pub mod history;
pub mod ingest;
pub mod init;
pub mod migrate;
pub mod status;
pub mod validate;

use crate::domain::{ErrorKind, LedgerError};

/// Exit code for an error that ends a command
pub fn exit_code_for(error: &LedgerError) -> i32 {
    match error.kind() {
        ErrorKind::Configuration | ErrorKind::Validation | ErrorKind::Serialization => 2,
        ErrorKind::Connection => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LedgerError::Configuration("x".into()), 2; "configuration")]
    #[test_case(LedgerError::Validation("x".into()), 2; "validation")]
    #[test_case(LedgerError::Serialization("x".into()), 2; "malformed batch")]
    #[test_case(LedgerError::Connection("x".into()), 4; "connection")]
    #[test_case(LedgerError::SessionWrite("x".into()), 5; "session write")]
    #[test_case(LedgerError::Database("x".into()), 5; "database")]
    fn test_exit_code_for(error: LedgerError, expected: i32) {
        assert_eq!(exit_code_for(&error), expected);
    }
}
