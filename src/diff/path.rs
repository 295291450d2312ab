//! Field path hygiene for logging and storage

use crate::error::FieldPathError;

/// Longest field path accepted for storage
pub const FIELD_PATH_LIMIT: usize = 500;

/// Strip line breaks and tabs, and cap the length with a `...` marker
pub fn sanitize_field_path(field_path: &str) -> String {
    let sanitized: String = field_path
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .collect();

    if sanitized.len() <= FIELD_PATH_LIMIT {
        return sanitized;
    }

    let mut end = FIELD_PATH_LIMIT;
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sanitized[..end])
}

/// Check that a field path is non-empty, within the length limit and free
/// of control characters
pub fn validate_field_path(field_path: &str) -> Result<(), FieldPathError> {
    if field_path.is_empty() {
        return Err(FieldPathError::Empty);
    }

    if field_path.len() > FIELD_PATH_LIMIT {
        return Err(FieldPathError::TooLong {
            length: field_path.len(),
            max: FIELD_PATH_LIMIT,
        });
    }

    if let Some(c) = field_path.chars().find(|c| c.is_control()) {
        return Err(FieldPathError::InvalidCharacter(c));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_control_whitespace() {
        assert_eq!(sanitize_field_path("os.\nversion\t\r"), "os.version");
        assert_eq!(sanitize_field_path("facts.modules[0]"), "facts.modules[0]");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(600);
        let sanitized = sanitize_field_path(&long);
        assert_eq!(sanitized.len(), FIELD_PATH_LIMIT + 3);
        assert!(sanitized.ends_with("..."));

        // never splits a multi-byte character
        let wide = "é".repeat(400);
        assert!(sanitize_field_path(&wide).ends_with("..."));
    }

    #[test]
    fn test_validate() {
        assert!(validate_field_path("os.version").is_ok());
        assert!(matches!(validate_field_path(""), Err(FieldPathError::Empty)));
        assert!(matches!(
            validate_field_path(&"x".repeat(501)),
            Err(FieldPathError::TooLong { length: 501, .. })
        ));
        assert!(matches!(
            validate_field_path("a\0b"),
            Err(FieldPathError::InvalidCharacter('\0'))
        ));
        assert!(validate_field_path("a\tb").is_err());
    }
}
