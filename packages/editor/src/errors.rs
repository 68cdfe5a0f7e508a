//! Error types for the editor

use thiserror::Error;

use crate::step::StepError;
use crate::transaction::TransactionError;
use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] quill_parser::ParseError),

    #[error("Schema violation: {0}")]
    Schema(#[from] quill_parser::SchemaError),

    #[error("Transaction rejected: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Invalid position: {0}")]
    Position(#[from] StepError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown callout kind '{0}'")]
    InvalidCalloutKind(String),

    #[error("Math expression is empty")]
    EmptyMath,

    #[error("Command '{0}' does not apply at the current selection")]
    NotApplicable(&'static str),

    #[error("Editor is read-only")]
    ReadOnly,
}

pub type EditorResult<T> = Result<T, EditorError>;
