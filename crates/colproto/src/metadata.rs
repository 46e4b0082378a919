//! Stored field list metadata
//!
//! When records are written column-wise the writer records, under
//! [`COLUMNAR_METADATA_KEY`], which field number each physical column holds.
//! The value is a [`ColumnarMetadata`] message in protobuf text format, e.g.
//!
//! ```text
//! classname: "example.Person"
//! field_id: 1
//! field_id: 2
//! field_id: -1
//! ```
//!
//! A trailing [`UNKNOWN_FIELDS_COLUMN`] entry marks the catch-all column that
//! holds every field without a dedicated column.

use crate::error::{ColProtoError, Result};
use crate::source::ColumnSource;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use std::sync::OnceLock;
use tracing::debug;

/// File metadata key under which the stored field list is written
pub const COLUMNAR_METADATA_KEY: &str = "elephantbird.columnar.metadata";

/// Stored field number marking the trailing unknown-fields column
pub const UNKNOWN_FIELDS_COLUMN: i32 = -1;

const METADATA_MESSAGE_NAME: &str = "colproto.ColumnarMetadata";

/// Column layout written alongside the data
#[derive(Clone, PartialEq, Message)]
pub struct ColumnarMetadata {
    /// Name of the message type the writer stored
    #[prost(string, optional, tag = "1")]
    pub classname: Option<String>,

    /// Field number held by each physical column, in column order
    #[prost(int32, repeated, packed = "false", tag = "2")]
    pub field_id: Vec<i32>,
}

impl ColumnarMetadata {
    /// Parses a metadata blob
    ///
    /// Text format is the primary encoding; blobs that are not valid text
    /// format are decoded as binary protobuf.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        let text_error = match std::str::from_utf8(blob) {
            Ok(text) => match DynamicMessage::parse_text_format(descriptor()?, text) {
                Ok(message) => {
                    return message
                        .transcode_to::<Self>()
                        .map_err(|e| ColProtoError::InvalidMetadata(e.to_string()))
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        Self::decode(blob).map_err(|e| {
            ColProtoError::InvalidMetadata(format!(
                "neither text format ({}) nor binary ({})",
                text_error, e
            ))
        })
    }

    /// Renders the metadata in text format, the encoding writers store
    pub fn to_text(&self) -> Result<String> {
        let mut message = DynamicMessage::new(descriptor()?);
        message
            .transcode_from(self)
            .map_err(|e| ColProtoError::InvalidMetadata(e.to_string()))?;
        Ok(message.to_text_format())
    }
}

/// Descriptor for [`ColumnarMetadata`], needed for text format parsing
fn descriptor() -> Result<MessageDescriptor> {
    static POOL: OnceLock<std::result::Result<DescriptorPool, String>> = OnceLock::new();

    let pool = POOL
        .get_or_init(|| build_pool().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ColProtoError::InvalidMetadata(e.clone()))?;

    pool.get_message_by_name(METADATA_MESSAGE_NAME)
        .ok_or_else(|| ColProtoError::UnknownMessage(METADATA_MESSAGE_NAME.to_string()))
}

fn build_pool() -> std::result::Result<DescriptorPool, prost_reflect::DescriptorError> {
    let field = |name: &str, number: i32, ty: Type, label: Label| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    };

    let file = FileDescriptorProto {
        name: Some("colproto/columnar_metadata.proto".to_string()),
        package: Some("colproto".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("ColumnarMetadata".to_string()),
            field: vec![
                field("classname", 1, Type::String, Label::Optional),
                field("field_id", 2, Type::Int32, Label::Repeated),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
}

/// Field number stored in each physical column of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFieldList {
    field_ids: Vec<i32>,
}

impl StoredFieldList {
    /// Creates a stored field list from per-column field numbers
    pub fn new(field_ids: Vec<i32>) -> Self {
        Self { field_ids }
    }

    /// Reads the stored field list from a column source's metadata
    pub fn from_source<S: ColumnSource + ?Sized>(source: &S) -> Result<Self> {
        let blob = source
            .metadata(COLUMNAR_METADATA_KEY)
            .ok_or_else(|| ColProtoError::MissingMetadata {
                key: COLUMNAR_METADATA_KEY.to_string(),
            })?;

        let metadata = ColumnarMetadata::parse(blob)?;
        if let Some(classname) = &metadata.classname {
            debug!(classname = %classname, "stored columnar metadata");
        }

        Ok(Self::from(metadata))
    }

    /// Field numbers in physical column order
    pub fn field_ids(&self) -> &[i32] {
        &self.field_ids
    }

    /// Number of physical columns described
    pub fn len(&self) -> usize {
        self.field_ids.len()
    }

    /// Returns true if no columns are described
    pub fn is_empty(&self) -> bool {
        self.field_ids.is_empty()
    }

    /// Returns true if the last column is the unknown-fields column
    pub fn has_unknown_column(&self) -> bool {
        self.field_ids.last() == Some(&UNKNOWN_FIELDS_COLUMN)
    }

    /// Position of the unknown-fields column, if the file has one
    pub fn unknown_column(&self) -> Option<usize> {
        self.has_unknown_column().then(|| self.field_ids.len() - 1)
    }

    /// Returns true if some column stores the given field number
    pub fn contains(&self, number: u32) -> bool {
        self.field_ids
            .iter()
            .any(|&id| u32::try_from(id).map_or(false, |id| id == number))
    }
}

impl From<ColumnarMetadata> for StoredFieldList {
    fn from(metadata: ColumnarMetadata) -> Self {
        Self::new(metadata.field_id)
    }
}
