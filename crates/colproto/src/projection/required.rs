//! Required field selection
//!
//! Callers name required fields by their *index* in the schema's field list,
//! not by protobuf field number. The directive form is a comma-separated list
//! of indices, e.g. `"0,2,5"`; an empty directive means every field.

use crate::error::{ColProtoError, Result};
use crate::schema::MessageSchema;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Fields a reader must populate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequiredFields {
    /// Every field in the schema
    #[default]
    All,

    /// Fields at the given schema-relative indices
    Indices(Vec<usize>),
}

impl RequiredFields {
    /// Parses a comma-separated list of schema-relative indices
    ///
    /// Whitespace around entries is ignored. An empty or blank directive
    /// selects all fields.
    pub fn parse(directive: &str) -> Result<Self> {
        if directive.trim().is_empty() {
            return Ok(RequiredFields::All);
        }

        let indices = directive
            .split(',')
            .map(|entry| {
                let entry = entry.trim();
                entry
                    .parse::<usize>()
                    .map_err(|e| ColProtoError::InvalidRequiredFields {
                        directive: directive.to_string(),
                        reason: format!("{:?}: {}", entry, e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RequiredFields::Indices(indices))
    }

    /// Resolves the selection to field numbers
    ///
    /// `All` yields every field number in schema order; explicit indices are
    /// mapped through the schema, keeping the first occurrence of duplicates.
    pub fn resolve(&self, schema: &MessageSchema) -> Result<Vec<u32>> {
        match self {
            RequiredFields::All => Ok(schema.fields().iter().map(|f| f.number()).collect()),
            RequiredFields::Indices(indices) => {
                let mut seen = HashSet::with_capacity(indices.len());
                let mut numbers = Vec::with_capacity(indices.len());
                for &index in indices {
                    let field =
                        schema
                            .field(index)
                            .ok_or_else(|| ColProtoError::RequiredFieldOutOfRange {
                                index,
                                field_count: schema.field_count(),
                                message: schema.full_name().to_string(),
                            })?;
                    if seen.insert(field.number()) {
                        numbers.push(field.number());
                    }
                }
                Ok(numbers)
            }
        }
    }
}

impl FromStr for RequiredFields {
    type Err = ColProtoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RequiredFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredFields::All => Ok(()),
            RequiredFields::Indices(indices) => {
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", index)?;
                }
                Ok(())
            }
        }
    }
}
