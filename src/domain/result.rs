//! Result type alias for PharmaLedger

use super::errors::LedgerError;

/// Result type alias for PharmaLedger operations
///
/// # Examples
///
/// ```
/// use pharmaledger::domain::result::Result;
/// use pharmaledger::domain::errors::LedgerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(LedgerError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
