//! Input validation for table operations.
//!
//! Screens identifiers and filter values before anything is handed to the
//! data API. Identifier checks are strict allow-lists; value checks look
//! for statement-splicing patterns that have no business in an equality
//! filter.

use crate::backend::Record;
use crate::error::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Maximum length for a single string filter value.
pub const MAX_FILTER_VALUE_LEN: usize = 1000;

/// Identifier format shared by table and column names.
static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Invalid regex: identifier pattern")
});

/// Prefixes reserved for system tables.
const SYSTEM_PREFIXES: &[&str] = &["pg_", "supabase_"];

/// Schema names that must never be addressed as tables.
const SYSTEM_NAMES: &[&str] = &[
    "information_schema",
    "auth",
    "storage",
    "realtime",
    "extensions",
    "vault",
];

/// Suspicious patterns that might indicate an injection attempt.
/// All patterns are compile-time constants, so expect() is safe here.
static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i);\s*drop\s+").expect("Invalid regex: DROP pattern"),
        Regex::new(r"(?i);\s*delete\s+").expect("Invalid regex: DELETE pattern"),
        Regex::new(r"(?i);\s*update\s+").expect("Invalid regex: UPDATE pattern"),
        Regex::new(r"(?i);\s*insert\s+").expect("Invalid regex: INSERT pattern"),
        Regex::new(r"--").expect("Invalid regex: line comment pattern"),
        Regex::new(r"/\*.*\*/").expect("Invalid regex: block comment pattern"),
        Regex::new(r"(?i)\bor\b.*\b1\s*=\s*1\b").expect("Invalid regex: tautology pattern"),
        Regex::new(r"(?i)\bunion\b.*\bselect\b").expect("Invalid regex: UNION SELECT pattern"),
        Regex::new(r"(?i)\bexec\b").expect("Invalid regex: EXEC pattern"),
        Regex::new(r"(?i)\bsp_\w+").expect("Invalid regex: stored procedure pattern"),
        Regex::new(r"(?i)\bxp_\w+").expect("Invalid regex: extended procedure pattern"),
    ]
});

/// Validate a table name for format compliance and system-table access.
pub fn validate_table_name(table_name: &str) -> ValidationResult<()> {
    let table_name = table_name.trim();
    if table_name.is_empty() {
        return Err(ValidationError::EmptyTableName);
    }

    if !IDENTIFIER_REGEX.is_match(table_name) {
        return Err(ValidationError::InvalidTableName(table_name.to_string()));
    }

    let lower = table_name.to_lowercase();
    for prefix in SYSTEM_PREFIXES {
        if lower.starts_with(prefix) {
            warn!("Rejected system table access: {}", table_name);
            return Err(ValidationError::SystemTable(table_name.to_string()));
        }
    }
    for name in SYSTEM_NAMES {
        if lower == *name {
            warn!("Rejected system schema access: {}", table_name);
            return Err(ValidationError::SystemTable(table_name.to_string()));
        }
    }

    Ok(())
}

/// Validate a set of column filters or record values.
///
/// Column keys must be plain identifiers; string values are screened
/// against the suspicious-pattern list and the length cap.
pub fn validate_columns(columns: &Record) -> ValidationResult<()> {
    for (key, value) in columns {
        if !IDENTIFIER_REGEX.is_match(key) {
            return Err(ValidationError::InvalidColumnName(key.to_string()));
        }

        if let Value::String(text) = value {
            for pattern in SUSPICIOUS_PATTERNS.iter() {
                if pattern.is_match(text) {
                    warn!("Suspicious filter value for column: {}", key);
                    return Err(ValidationError::SuspiciousValue(key.to_string()));
                }
            }

            if text.len() > MAX_FILTER_VALUE_LEN {
                return Err(ValidationError::ValueTooLong {
                    column: key.to_string(),
                    max: MAX_FILTER_VALUE_LEN,
                    actual: text.len(),
                });
            }
        }
    }

    Ok(())
}
