//! Input size limits for resource protection

/// Maximum length of a query text (1MB)
pub const MAX_QUERY_LEN: usize = 1024 * 1024;

/// Maximum records loaded for a single entity type (1M)
pub const MAX_RECORDS_PER_ENTITY: usize = 1_000_000;

/// Maximum length for entity, relation and key field names (128 chars)
pub const MAX_NAME_LEN: usize = 128;

/// Maximum nesting of objects and arrays in a query text (64)
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum depth of nested resolve blocks, counting the root entity (24)
pub const MAX_QUERY_DEPTH: usize = 24;

/// Limit violation
#[derive(Debug, Clone, PartialEq)]
pub enum LimitError {
    QueryTooLong { len: usize, max: usize },
    TooManyRecords { entity: String, count: usize, max: usize },
    NameTooLong { len: usize, max: usize },
    QueryTooDeep { depth: usize, max: usize },
}

impl std::fmt::Display for LimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryTooLong { len, max } => {
                write!(f, "Query text too long: {} bytes (max {})", len, max)
            }
            Self::TooManyRecords { entity, count, max } => {
                write!(f, "Too many records for {}: {} (max {})", entity, count, max)
            }
            Self::NameTooLong { len, max } => {
                write!(f, "Name too long: {} chars (max {})", len, max)
            }
            Self::QueryTooDeep { depth, max } => {
                write!(f, "Query nested too deeply: {} levels (max {})", depth, max)
            }
        }
    }
}

impl std::error::Error for LimitError {}

/// Validate query text length
pub fn validate_query_len(text: &str) -> Result<(), LimitError> {
    if text.len() > MAX_QUERY_LEN {
        return Err(LimitError::QueryTooLong {
            len: text.len(),
            max: MAX_QUERY_LEN,
        });
    }
    Ok(())
}

/// Validate dataset size for one entity type
pub fn validate_record_count(entity: &str, count: usize) -> Result<(), LimitError> {
    if count > MAX_RECORDS_PER_ENTITY {
        return Err(LimitError::TooManyRecords {
            entity: entity.to_string(),
            count,
            max: MAX_RECORDS_PER_ENTITY,
        });
    }
    Ok(())
}

/// Validate a schema name (entity, relation field or key field)
pub fn validate_name(name: &str) -> Result<(), LimitError> {
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(LimitError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Validate the depth of a query entity below the root
pub fn validate_query_depth(depth: usize) -> Result<(), LimitError> {
    if depth > MAX_QUERY_DEPTH {
        return Err(LimitError::QueryTooDeep {
            depth,
            max: MAX_QUERY_DEPTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query_len() {
        assert!(validate_query_len("{ get: {} }").is_ok());
        assert!(validate_query_len(&"x".repeat(MAX_QUERY_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("homeworld").is_ok());
        assert!(validate_name(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_query_depth() {
        assert!(validate_query_depth(1).is_ok());
        assert!(validate_query_depth(MAX_QUERY_DEPTH).is_ok());
        assert_eq!(
            validate_query_depth(MAX_QUERY_DEPTH + 1),
            Err(LimitError::QueryTooDeep {
                depth: MAX_QUERY_DEPTH + 1,
                max: MAX_QUERY_DEPTH
            })
        );
    }
}
