//! Error types for STEP loading.

use thiserror::Error;

/// Why a STEP file could not be loaded.
#[derive(Error, Debug)]
pub enum StepError {
    /// The file could not be read.
    #[error("cannot read STEP file: {0}")]
    Io(#[from] std::io::Error),

    /// Bad character or token.
    #[error("syntax error at {line}:{col}: {message}")]
    Lexer {
        /// 1-based line.
        line: usize,
        /// 1-based column.
        col: usize,
        /// What was wrong.
        message: String,
    },

    /// Tokens that do not form a valid exchange structure.
    #[error("parse error on line {line}{}: {message}", entity_id.map(|id| format!(" in #{id}")).unwrap_or_default())]
    Parser {
        /// Line of the offending token, 0 when unknown.
        line: usize,
        /// Instance being parsed.
        entity_id: Option<u64>,
        /// What was wrong.
        message: String,
    },

    /// Malformed arguments of an otherwise well-formed entity.
    #[error("#{entity_id} {type_name}: {message}")]
    Malformed {
        /// Instance id.
        entity_id: u64,
        /// Entity type.
        type_name: String,
        /// What was wrong.
        message: String,
    },

    /// A reference to an instance that is not in the file.
    #[error("dangling reference #{0}")]
    MissingEntity(u64),

    /// Geometry that cannot be used, such as a zero direction.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A reference to the wrong kind of entity.
    #[error("#{entity_id} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Instance id.
        entity_id: u64,
        /// Required type.
        expected: String,
        /// Type found.
        actual: String,
    },

    /// Nothing in the file describes a body.
    #[error("no solid bodies in file")]
    NoSolids,
}

impl StepError {
    /// Syntax error at a source position.
    pub fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    /// Structural error, optionally inside instance `entity_id`.
    pub fn parser(line: usize, entity_id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parser {
            line,
            entity_id,
            message: message.into(),
        }
    }

    /// Reference to an entity of the wrong type.
    pub fn type_mismatch(
        entity_id: u64,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            entity_id,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result alias for STEP loading.
pub type Result<T> = std::result::Result<T, StepError>;
