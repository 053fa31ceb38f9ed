//! Result type alias for Packline
//!
//! This module provides a convenient Result type alias that uses PacklineError
//! as the error type.

use super::errors::PacklineError;

/// Result type alias for Packline operations
///
/// # Examples
///
/// ```
/// use packline::domain::result::Result;
/// use packline::domain::errors::PacklineError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PacklineError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PacklineError>;
