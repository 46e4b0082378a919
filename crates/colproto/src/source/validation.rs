//! Schema validation for Parquet column files

use crate::error::{ColProtoError, Result};
use arrow::datatypes::{DataType, Schema};

/// Validates that every root column of a Parquet file holds raw bytes
pub fn validate_schema(schema: &Schema) -> Result<()> {
    for field in schema.fields() {
        validate_column(field.name(), field.data_type())?;
    }
    Ok(())
}

/// Validates that a column has the `Binary` type
fn validate_column(column_name: &str, actual: &DataType) -> Result<()> {
    if !matches!(actual, DataType::Binary) {
        return Err(ColProtoError::InvalidColumnType {
            column: column_name.to_string(),
            expected: format!("{:?}", DataType::Binary),
            actual: format!("{:?}", actual),
        });
    }
    Ok(())
}
