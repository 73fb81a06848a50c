//! Error types shared by the store crates.

/// Errors raised by store operations.
///
/// Absence of a value is never an error; reads return `None` instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A subscription pattern is not a valid regular expression.
    #[error("invalid subscription pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The store was called while it is already exclusively borrowed, i.e.
    /// from inside an observer during dispatch.
    #[error("re-entrant {operation} while the store is busy")]
    Reentrant { operation: &'static str },

    /// Converting a Value into a Rust type failed.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Converting a Rust type into a Value failed.
    #[error("encode error: {message}")]
    Encode { message: String },
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn invalid_pattern_display_and_source() {
        let source = regex::Regex::new("a/(b").unwrap_err();
        let e = Error::InvalidPattern {
            pattern: "a/(b".to_string(),
            source,
        };
        let display = format!("{}", e);
        assert!(display.contains("invalid subscription pattern"));
        assert!(display.contains("a/(b"));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn reentrant_display() {
        let e = Error::Reentrant {
            operation: "commit",
        };
        assert_eq!(format!("{}", e), "re-entrant commit while the store is busy");
        assert!(StdError::source(&e).is_none());
    }

    #[test]
    fn codec_display() {
        assert!(format!("{}", Error::decode("bad")).contains("decode error: bad"));
        assert!(format!("{}", Error::encode("worse")).contains("encode error: worse"));
    }
}
