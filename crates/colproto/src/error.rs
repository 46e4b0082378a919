//! Error types for projected record reads

use crate::materialize::codec::FieldDecodeError;
use thiserror::Error;

/// Result type for colproto operations
pub type Result<T> = std::result::Result<T, ColProtoError>;

/// Shorthand for [`ColProtoError`]
pub type Error = ColProtoError;

/// Errors that can occur while planning or reading a column file
#[derive(Error, Debug)]
pub enum ColProtoError {
    /// Error reading or parsing Parquet file
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error with Arrow data structures
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required field directive could not be parsed
    #[error("Invalid required fields directive {directive:?}: {reason}")]
    InvalidRequiredFields { directive: String, reason: String },

    /// Required field index outside the schema's field list
    #[error("idx {index} is out of range for fields in {message} ({field_count} fields)")]
    RequiredFieldOutOfRange {
        index: usize,
        field_count: usize,
        message: String,
    },

    /// Message type not present in the descriptor pool
    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    /// Descriptor set could not be loaded
    #[error("Invalid descriptor set: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    /// The file carries no stored field list
    #[error("could not find columnar metadata under key {key:?}")]
    MissingMetadata { key: String },

    /// The stored field list could not be parsed
    #[error("Invalid columnar metadata: {0}")]
    InvalidMetadata(String),

    /// The stored field list does not describe the file's columns
    #[error("stored field list has {stored} entries but the file has {actual} columns")]
    ColumnCountMismatch { stored: usize, actual: usize },

    /// Required fields are not stored and the file has no unknowns column
    #[error("No unknowns column for fields not stored as columns: {}", .fields.join(", "))]
    MissingUnknownsColumn { fields: Vec<String> },

    /// Invalid column type
    #[error("Invalid column type for {column}: expected {expected}, got {actual}")]
    InvalidColumnType {
        column: String,
        expected: String,
        actual: String,
    },

    /// Row group range outside the file
    #[error("Invalid row group: {0}")]
    InvalidRowGroup(String),

    /// Column selection rejected by the source
    #[error("Invalid column selection: {0}")]
    InvalidColumnSelection(String),

    /// A known column failed to decode
    #[error("failed to decode column {column} as field {field}: {source}")]
    Decode {
        field: String,
        column: usize,
        #[source]
        source: FieldDecodeError,
    },

    /// The unknowns column is not a valid encoded message
    #[error("failed to merge unknowns column {column}: {source}")]
    UnknownFields {
        column: usize,
        #[source]
        source: prost::DecodeError,
    },

    /// Raw record does not contain a planned column
    #[error("record has {width} columns, column {column} requested")]
    ColumnOutOfRange { column: usize, width: usize },

    /// Operation not allowed in the source's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A previous error left the reader unusable
    #[error("reader failed on an earlier error")]
    ReaderFailed,
}

/// Coarse classification of a [`ColProtoError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller configuration, detected before any I/O
    Configuration,
    /// The file's metadata does not support the requested read
    MetadataIntegrity,
    /// A record's bytes are malformed
    Decode,
    /// Failure in the underlying column reader
    Io,
    /// API misuse or a reader that already failed
    Usage,
}

impl ColProtoError {
    /// Returns the category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ColProtoError::InvalidRequiredFields { .. }
            | ColProtoError::RequiredFieldOutOfRange { .. }
            | ColProtoError::UnknownMessage(_)
            | ColProtoError::Descriptor(_)
            | ColProtoError::InvalidRowGroup(_) => ErrorKind::Configuration,
            ColProtoError::MissingMetadata { .. }
            | ColProtoError::InvalidMetadata(_)
            | ColProtoError::ColumnCountMismatch { .. }
            | ColProtoError::MissingUnknownsColumn { .. }
            | ColProtoError::InvalidColumnType { .. } => ErrorKind::MetadataIntegrity,
            ColProtoError::Decode { .. }
            | ColProtoError::UnknownFields { .. }
            | ColProtoError::ColumnOutOfRange { .. } => ErrorKind::Decode,
            ColProtoError::Parquet(_) | ColProtoError::Arrow(_) | ColProtoError::Io(_) => {
                ErrorKind::Io
            }
            ColProtoError::InvalidColumnSelection(_)
            | ColProtoError::InvalidState(_)
            | ColProtoError::ReaderFailed => ErrorKind::Usage,
        }
    }
}
