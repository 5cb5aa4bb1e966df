//! Core error types for KEYSTONE.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Invalid encoding
    #[error("Invalid encoding: {message}")]
    InvalidEncoding {
        /// Decoder message
        message: String,
    },

    /// Invalid resource identifier
    #[error("Invalid ID: {reason}")]
    InvalidId {
        /// Why the identifier was rejected
        reason: String,
    },

    /// Resource kind not in the catalog
    #[error("Unknown resource kind: {kind}")]
    UnknownKind {
        /// Kind as written in the declaration
        kind: String,
    },

    /// Text that should be a reference expression but is not one
    #[error("Malformed reference `{expr}`: {reason}")]
    MalformedReference {
        /// Offending expression
        expr: String,
        /// Why it does not parse
        reason: String,
    },

    /// Parse error in a declaration
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidEncoding {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownKind {
            kind: "aws_vpc".to_string(),
        };
        assert_eq!(format!("{}", err), "Unknown resource kind: aws_vpc");

        let err = CoreError::ParseError {
            line: 7,
            message: "expected `=`".to_string(),
        };
        assert_eq!(format!("{}", err), "Parse error at line 7: expected `=`");
    }

    #[test]
    fn test_malformed_reference_error() {
        let err = CoreError::MalformedReference {
            expr: "role".to_string(),
            reason: "missing resource name".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("`role`"));
        assert!(s.contains("missing resource name"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::InvalidEncoding { .. }));
    }
}
