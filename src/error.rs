//! Error taxonomy for the engine: construction-time errors (malformed
//! matcher/handler definitions) and stream-time errors (malformed JSON,
//! truncated input, handler failures).

use thiserror::Error;

/// The single error type returned by every fallible entry point.
#[derive(Error, Debug)]
pub enum StreamsonError {
    /// The input bytes are not valid JSON at the given offset.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: u64, message: String },

    /// The input ended mid-value; more bytes were expected but
    /// `terminate()` was called (or the stream closed) before they
    /// arrived.
    #[error("truncated input: {message}")]
    Truncated { message: String },

    /// A matcher definition string (CLI `-m`/`-h` argument or
    /// [`crate::matcher::Matcher::parse_simple`]/`parse_depth` input)
    /// could not be parsed.
    #[error("invalid matcher definition {definition:?}: {message}")]
    MatcherParse { definition: String, message: String },

    /// A handler was constructed with invalid options, or bound to a
    /// strategy that does not accept it (spec.md §6's per-strategy
    /// allow-list).
    #[error("invalid handler configuration for {handler}: {message}")]
    HandlerConfig { handler: String, message: String },

    /// A handler's `on_start`/`on_feed`/`on_end` callback failed while
    /// processing a live element.
    #[error("handler {handler} failed at {path}: {message}")]
    HandlerRuntime {
        handler: String,
        path: String,
        message: String,
    },

    /// A regex pattern given to [`crate::matcher::Matcher::Regex`] or the
    /// Regex handler failed to compile.
    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Wraps an I/O failure from a writer-based or file-based handler.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StreamsonError>;

impl StreamsonError {
    pub fn syntax(offset: u64, message: impl Into<String>) -> Self {
        StreamsonError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn truncated(message: impl Into<String>) -> Self {
        StreamsonError::Truncated {
            message: message.into(),
        }
    }

    pub fn matcher_parse(definition: impl Into<String>, message: impl Into<String>) -> Self {
        StreamsonError::MatcherParse {
            definition: definition.into(),
            message: message.into(),
        }
    }

    pub fn handler_config(handler: impl Into<String>, message: impl Into<String>) -> Self {
        StreamsonError::HandlerConfig {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn handler_runtime(
        handler: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StreamsonError::HandlerRuntime {
            handler: handler.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_display() {
        let e = StreamsonError::syntax(12, "unexpected character");
        assert_eq!(
            e.to_string(),
            "syntax error at byte 12: unexpected character"
        );
    }

    #[test]
    fn matcher_parse_display() {
        let e = StreamsonError::matcher_parse("[a", "unbalanced bracket");
        assert!(e.to_string().contains("[a"));
    }
}
