//! Projection planning
//!
//! The columns actually read are the intersection of the required fields and
//! the fields stored as dedicated columns. Required fields without a column of
//! their own can only come from the trailing unknowns column, so it is added
//! to the read set whenever such a field exists.

use crate::error::{ColProtoError, Result};
use crate::metadata::StoredFieldList;
use crate::projection::RequiredFields;
use crate::schema::MessageSchema;
use prost_reflect::{FieldDescriptor, MessageDescriptor};
use std::collections::HashSet;
use std::fmt;
use tracing::info;

/// Per-file decision of which columns to read and how to decode them
#[derive(Debug, Clone)]
pub struct ProjectionPlan {
    /// Message type being rebuilt
    message: MessageDescriptor,

    /// Physical columns to read, ascending; the unknowns column is last if read
    columns: Vec<usize>,

    /// Field held by each known column, parallel to the head of `columns`
    known_fields: Vec<FieldDescriptor>,

    /// Whether the last entry of `columns` is the unknowns column
    read_unknown_column: bool,

    /// Required field numbers, in resolution order
    required_field_numbers: Vec<u32>,

    /// Required fields served by the unknowns column
    unknown_fields: Vec<FieldDescriptor>,

    /// Number of columns in the stored field list
    stored_column_count: usize,
}

impl ProjectionPlan {
    /// Computes the plan for one file
    pub fn build(
        schema: &MessageSchema,
        required: &RequiredFields,
        stored: &StoredFieldList,
    ) -> Result<Self> {
        Self::from_resolved(schema, required.resolve(schema)?, stored)
    }

    /// Computes the plan from field numbers already resolved against `schema`
    ///
    /// Numbers the schema does not define are skipped.
    pub fn from_resolved(
        schema: &MessageSchema,
        required_field_numbers: Vec<u32>,
        stored: &StoredFieldList,
    ) -> Result<Self> {
        let required_field_numbers: Vec<u32> = required_field_numbers
            .into_iter()
            .filter(|&number| schema.field_by_number(number).is_some())
            .collect();
        let required_set: HashSet<u32> = required_field_numbers.iter().copied().collect();

        let mut columns = Vec::new();
        let mut known_fields = Vec::new();

        for (position, &stored_id) in stored.field_ids().iter().enumerate() {
            let Ok(number) = u32::try_from(stored_id) else {
                continue;
            };
            if number == 0 || !required_set.contains(&number) {
                continue;
            }
            if let Some(field) = schema.field_by_number(number) {
                columns.push(position);
                known_fields.push(field.clone());
            }
        }

        // Required fields with no dedicated column
        let unknown_fields: Vec<FieldDescriptor> = required_field_numbers
            .iter()
            .filter(|&&number| !stored.contains(number))
            .filter_map(|&number| schema.field_by_number(number).cloned())
            .collect();

        let mut read_unknown_column = false;
        if !unknown_fields.is_empty() {
            let names: Vec<String> = unknown_fields.iter().map(|f| f.name().to_string()).collect();
            info!(fields = %names.join(" "), "required fields without a dedicated column");

            let last = stored
                .unknown_column()
                .ok_or(ColProtoError::MissingUnknownsColumn { fields: names })?;
            read_unknown_column = true;
            columns.push(last);
        }

        let plan = Self {
            message: schema.descriptor().clone(),
            columns,
            known_fields,
            read_unknown_column,
            required_field_numbers,
            unknown_fields,
            stored_column_count: stored.len(),
        };

        info!(
            message_type = %plan.message.full_name(),
            "reading {} out of {} stored columns for {} required columns",
            plan.describe_read(),
            plan.stored_column_count,
            plan.required_field_numbers.len()
        );

        Ok(plan)
    }

    /// Message type the plan rebuilds
    pub fn message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Physical columns to read, in ascending order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Fields decoded from dedicated columns, parallel to [`columns`](Self::columns)
    pub fn known_fields(&self) -> &[FieldDescriptor] {
        &self.known_fields
    }

    /// Whether the unknowns column is read
    pub fn reads_unknown_column(&self) -> bool {
        self.read_unknown_column
    }

    /// Physical position of the unknowns column when it is read
    pub fn unknown_column(&self) -> Option<usize> {
        if self.read_unknown_column {
            self.columns.last().copied()
        } else {
            None
        }
    }

    /// Required fields that are only available through the unknowns column
    pub fn unknown_fields(&self) -> &[FieldDescriptor] {
        &self.unknown_fields
    }

    /// Required field numbers, duplicates removed
    pub fn required_field_numbers(&self) -> &[u32] {
        &self.required_field_numbers
    }

    /// Number of physical columns in the file
    pub fn stored_column_count(&self) -> usize {
        self.stored_column_count
    }

    fn describe_read(&self) -> String {
        if self.read_unknown_column {
            format!("{} (including unknowns column)", self.columns.len())
        } else {
            self.columns.len().to_string()
        }
    }
}

impl fmt::Display for ProjectionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "message: {}", self.message.full_name())?;
        writeln!(
            f,
            "reading {} out of {} stored columns for {} required fields",
            self.describe_read(),
            self.stored_column_count,
            self.required_field_numbers.len()
        )?;
        for (field, column) in self.known_fields.iter().zip(&self.columns) {
            writeln!(f, "  column {}: {} = {}", column, field.name(), field.number())?;
        }
        if let Some(column) = self.unknown_column() {
            let names: Vec<&str> = self.unknown_fields.iter().map(|f| f.name()).collect();
            writeln!(f, "  column {}: unknowns ({})", column, names.join(", "))?;
        }
        Ok(())
    }
}
