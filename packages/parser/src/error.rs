use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset the error points at
    pub fn pos(&self) -> usize {
        match self {
            Self::UnexpectedToken { pos, .. } | Self::UnexpectedEof { pos } | Self::LexerError { pos } => *pos,
        }
    }
}

/// Violation of the node-type registry's content or attribute rules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Node type '{0}' is not registered")]
    UnknownType(String),

    #[error("'{node}' cannot contain '{child}'")]
    InvalidChild { node: String, child: String },

    #[error("'{0}' requires at least one child")]
    EmptyContent(String),

    #[error("'{0}' cannot have children")]
    LeafWithContent(String),

    #[error("Attribute '{attr}' of '{node}' is invalid: {reason}")]
    InvalidAttr {
        node: String,
        attr: String,
        reason: String,
    },

    #[error("Attribute '{attr}' is not declared for '{node}'")]
    UnknownAttr { node: String, attr: String },

    #[error("Text run is empty or carries marks where none are allowed in '{0}'")]
    InvalidText(String),

    #[error("Only text runs carry marks, found marks on '{0}'")]
    MarksOnNonText(String),
}
