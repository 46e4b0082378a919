//! Message schemas
//!
//! A [`MessageSchema`] wraps a protobuf [`MessageDescriptor`] and precomputes
//! a field-number lookup table so that planning and decoding never walk the
//! descriptor to resolve a field by number.

use crate::error::{ColProtoError, Result};
use prost_reflect::{DescriptorPool, DynamicMessage, FieldDescriptor, MessageDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Schema of one message type: its fields in declaration order plus a
/// number-to-field table
#[derive(Debug, Clone)]
pub struct MessageSchema {
    descriptor: MessageDescriptor,
    fields: Arc<[FieldDescriptor]>,
    by_number: Arc<HashMap<u32, usize>>,
}

impl MessageSchema {
    /// Builds a schema from a message descriptor
    pub fn new(descriptor: MessageDescriptor) -> Self {
        let fields: Arc<[FieldDescriptor]> = descriptor.fields().collect();
        let by_number = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.number(), index))
            .collect();

        Self {
            descriptor,
            fields,
            by_number: Arc::new(by_number),
        }
    }

    /// Looks up a message type by fully qualified name in a descriptor pool
    pub fn from_pool(pool: &DescriptorPool, message_name: &str) -> Result<Self> {
        let name = message_name.trim_start_matches('.');
        pool.get_message_by_name(name)
            .map(Self::new)
            .ok_or_else(|| ColProtoError::UnknownMessage(name.to_string()))
    }

    /// Loads a message type from an encoded `FileDescriptorSet`, as produced
    /// by `protoc --descriptor_set_out`
    pub fn from_descriptor_set(bytes: &[u8], message_name: &str) -> Result<Self> {
        let pool = DescriptorPool::decode(bytes)?;
        Self::from_pool(&pool, message_name)
    }

    /// Returns the underlying message descriptor
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Returns the fully qualified message name
    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    /// Returns the fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Returns the number of fields in the schema
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field at a schema-relative index
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// Returns the field carrying the given field number
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|&index| &self.fields[index])
    }

    /// Creates a fresh, empty message of this type
    pub fn new_message(&self) -> DynamicMessage {
        DynamicMessage::new(self.descriptor.clone())
    }
}
