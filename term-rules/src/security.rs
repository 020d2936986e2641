//! Escaping and validation of values embedded in rule queries.
//!
//! Rules build their violation queries as SQL text. Anything that originates from
//! the caller (column names, string literals, regex patterns) passes through
//! [`SqlSecurity`] before it is spliced into a statement.

use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest identifier accepted in a rule query.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Longest regex pattern accepted by the pattern rules.
const MAX_PATTERN_LENGTH: usize = 1000;

/// SQL identifier and literal escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Quotes a column identifier for use in a rule query.
    ///
    /// Column names are taken verbatim: they may contain spaces, dashes or
    /// upper-case letters, and embedded double quotes are doubled. Empty names,
    /// names containing NUL bytes and names longer than 128 bytes are rejected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use term_rules::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("A").unwrap(), "\"A\"");
    /// assert_eq!(SqlSecurity::quote_identifier("first name").unwrap(), "\"first name\"");
    /// assert_eq!(SqlSecurity::quote_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::quote_identifier("").is_err());
    /// ```
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        if identifier.is_empty() {
            return Err(TermError::SecurityError(
                "SQL identifier cannot be empty".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(TermError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates the name a dataset is registered under.
    ///
    /// Table names are stricter than column names: they must be lower-case
    /// `snake_case` so that registration and querying resolve to the same table.
    pub fn validate_table_name(name: &str) -> Result<()> {
        static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-z_][a-z0-9_]*$").expect("Hard-coded regex pattern should be valid")
        });

        if name.len() > MAX_IDENTIFIER_LENGTH || !TABLE_NAME.is_match(name) {
            return Err(TermError::SecurityError(format!(
                "Invalid table name '{name}'. Table names must be lower-case and contain only letters, numbers and underscores"
            )));
        }
        Ok(())
    }

    /// Renders a string as a single-quoted SQL literal.
    pub fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Validates a regex pattern and returns it escaped for a SQL string literal.
    ///
    /// The pattern must compile with the `regex` crate, which is the engine
    /// DataFusion uses for the `~` operator.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(TermError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(TermError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        Regex::new(pattern)
            .map_err(|e| TermError::Configuration(format!("Invalid regex pattern: {e}")))?;

        Ok(pattern.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqlSecurity::quote_identifier("customer_id").unwrap(), "\"customer_id\"");
        assert_eq!(SqlSecurity::quote_identifier("A").unwrap(), "\"A\"");
        assert_eq!(
            SqlSecurity::quote_identifier("id\"; DROP TABLE users--").unwrap(),
            "\"id\"\"; DROP TABLE users--\""
        );
    }

    #[test]
    fn test_quote_identifier_rejects_invalid() {
        assert!(SqlSecurity::quote_identifier("").is_err());
        assert!(SqlSecurity::quote_identifier("a\0b").is_err());
        assert!(SqlSecurity::quote_identifier(&"very_long_name_".repeat(100)).is_err());
    }

    #[test]
    fn test_table_name() {
        assert!(SqlSecurity::validate_table_name("data").is_ok());
        assert!(SqlSecurity::validate_table_name("orders_2024").is_ok());
        assert!(SqlSecurity::validate_table_name("Orders").is_err());
        assert!(SqlSecurity::validate_table_name("orders; drop").is_err());
        assert!(SqlSecurity::validate_table_name("").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(SqlSecurity::quote_literal("Berlin"), "'Berlin'");
        assert_eq!(SqlSecurity::quote_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_regex_pattern_validation() {
        assert!(SqlSecurity::validate_regex_pattern(r"^[A-Z]{2}-\d{4}$").is_ok());
        assert!(SqlSecurity::validate_regex_pattern(r"^[^@]+@example\.org$").is_ok());

        let invalid = SqlSecurity::validate_regex_pattern(r"[unclosed");
        assert!(matches!(invalid, Err(TermError::Configuration(_))));

        assert!(SqlSecurity::validate_regex_pattern(&"a".repeat(2000)).is_err());

        let result = SqlSecurity::validate_regex_pattern("o'brien|o'neil").unwrap();
        assert_eq!(result, "o''brien|o''neil");
    }
}
