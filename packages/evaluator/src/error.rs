use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;
pub type ExprResult<T> = Result<T, ExprError>;
pub type ParseResult<T> = Result<T, ParseError>;

/// Fatal errors. Any of these aborts the whole render invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Component '{name}' not found")]
    ComponentNotFound { name: String },

    #[error("Utility '{name}' not found")]
    UtilityNotFound { name: String },

    #[error("foreach - Tried to iterate a non-array: '{expression}' evaluated to {found}")]
    IterationSource { expression: String, found: String },

    #[error("Render depth limit of {depth} exceeded at element {element:?}")]
    RecursionLimit {
        depth: usize,
        element: Option<String>,
    },

    #[error("Invalid component tree: {message}")]
    InvalidUnit { message: String },
}

/// Soft errors raised while evaluating an expression. The caller logs these and treats
/// the field as absent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("'{name}' is not callable")]
    NotCallable { name: String },

    #[error("render() expects a component or a list of components: {message}")]
    InvalidRenderTarget { message: String },

    #[error("Utility '{name}' failed: {message}")]
    Utility { name: String, message: String },

    /// A fatal error raised by a nested render or dispatch. Never swallowed.
    #[error(transparent)]
    Fatal(#[from] EvalError),
}

impl ExprError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of expression at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },

    #[error("Expression nested deeper than {limit} levels at {pos}")]
    TooDeep { pos: usize, limit: usize },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
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

    pub fn too_deep(pos: usize, limit: usize) -> Self {
        Self::TooDeep { pos, limit }
    }
}

/// Error returned by host utility functions.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct UtilityError {
    pub message: String,
}

impl UtilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for UtilityError {
    fn from(s: String) -> Self {
        UtilityError::new(s)
    }
}

impl From<&str> for UtilityError {
    fn from(s: &str) -> Self {
        UtilityError::new(s)
    }
}
