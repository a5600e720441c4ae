use thiserror::Error;

use crate::source::SourcePosition;

/// All errors that can occur while parsing an Oribe template
#[derive(Error, Debug)]
pub enum OribeError {
    /// Tokenization failure: unmatched delimiter, invalid escape, unclosed
    /// comment or block.
    #[error("Lexer error at {position}: {message}")]
    Lexer {
        message: String,
        position: SourcePosition,
    },

    /// A model-building rule violation: header ordering, break/continue out
    /// of scope, illegal with-else, bare content inside a switch.
    #[error("Parse error at {position}: {message}")]
    Structural {
        message: String,
        position: SourcePosition,
    },

    /// Malformed sub-expression text: an argument list, for-statement or
    /// with-statement header that fails its mini-parse.
    #[error("Invalid token at {position}: {message}")]
    Token {
        message: String,
        position: SourcePosition,
    },

    /// Any of the above, stamped with the template path by the parse entry.
    #[error("{path}: {source}")]
    Template {
        path: String,
        #[source]
        source: Box<OribeError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OribeError {
    /// Wrap this error with the path of the template being parsed.
    /// Already-wrapped and IO errors are left as they are.
    pub fn with_template(self, path: &str) -> Self {
        match self {
            OribeError::Template { .. } | OribeError::Io(_) => self,
            other => OribeError::Template {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The template coordinates this error points at, if it carries any.
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            OribeError::Lexer { position, .. }
            | OribeError::Structural { position, .. }
            | OribeError::Token { position, .. } => Some(*position),
            OribeError::Template { source, .. } => source.position(),
            OribeError::Io(_) => None,
        }
    }
}

/// Result type alias for Oribe operations
pub type Result<T> = std::result::Result<T, OribeError>;
