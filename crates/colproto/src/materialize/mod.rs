//! Record materialization
//!
//! Rebuilds one message from one raw record following a [`ProjectionPlan`]:
//! known columns are decoded field by field, then the unknowns column, when
//! read, is merged on top as an encoded fragment of the same message type.

pub mod codec;

use crate::error::{ColProtoError, Result};
use crate::projection::ProjectionPlan;
use crate::source::RawRecord;
use prost_reflect::DynamicMessage;

/// Builds messages from raw records according to a projection plan
#[derive(Debug, Clone)]
pub struct RecordMaterializer {
    plan: ProjectionPlan,
}

impl RecordMaterializer {
    /// Creates a materializer for a plan
    pub fn new(plan: ProjectionPlan) -> Self {
        Self { plan }
    }

    /// Returns the plan in use
    pub fn plan(&self) -> &ProjectionPlan {
        &self.plan
    }

    /// Builds a fresh message from one record
    ///
    /// Empty columns leave their field unset. Any decode failure fails the
    /// whole record; no partial message is returned.
    pub fn materialize(&self, record: &RawRecord<'_>) -> Result<DynamicMessage> {
        let mut message = DynamicMessage::new(self.plan.message().clone());

        for (field, &column) in self.plan.known_fields().iter().zip(self.plan.columns()) {
            let bytes = column_bytes(record, column)?;
            if bytes.is_empty() {
                continue;
            }
            codec::decode_field(field, bytes, &mut message).map_err(|source| {
                ColProtoError::Decode {
                    field: field.full_name().to_string(),
                    column,
                    source,
                }
            })?;
        }

        if let Some(column) = self.plan.unknown_column() {
            let bytes = column_bytes(record, column)?;
            if !bytes.is_empty() {
                prost::Message::merge(&mut message, bytes)
                    .map_err(|source| ColProtoError::UnknownFields { column, source })?;
            }
        }

        Ok(message)
    }
}

fn column_bytes<'a>(record: &RawRecord<'a>, column: usize) -> Result<&'a [u8]> {
    record
        .column(column)
        .ok_or(ColProtoError::ColumnOutOfRange {
            column,
            width: record.len(),
        })
}
