//! # colproto
//!
//! Reads protobuf records that were stored column-wise, one column per known
//! field plus an optional trailing "unknowns" column, and rebuilds each record
//! as a [`prost_reflect::DynamicMessage`] while reading only the columns the
//! caller needs.
//!
//! The crate is split along the read path:
//! - [`schema`]: message schemas with a field-number lookup table
//! - [`metadata`]: the stored field list written alongside the columns
//! - [`projection`]: required fields and the per-file projection plan
//! - [`materialize`]: decoding column bytes back into a message
//! - [`source`]: the column reader contract, with Parquet and in-memory sources
//! - [`reader`]: the pull-based reader tying it all together
//!
//! ## Example
//!
//! ```no_run
//! use colproto::{MessageSchema, ProtoColumnReader, ReadOptions, RequiredFields};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptor_set = std::fs::read("person.fds")?;
//! let schema = MessageSchema::from_descriptor_set(&descriptor_set, "example.Person")?;
//! let required = RequiredFields::parse("0,2")?;
//!
//! let reader = ProtoColumnReader::open_parquet(
//!     "people.parquet",
//!     ReadOptions::default(),
//!     &schema,
//!     &required,
//! )?;
//!
//! for message in reader {
//!     println!("{:?}", message?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod materialize;
pub mod metadata;
pub mod projection;
pub mod reader;
pub mod schema;
pub mod source;

#[cfg(test)]
pub(crate) mod test_schema;

pub use error::{ColProtoError, Error, ErrorKind, Result};
pub use materialize::RecordMaterializer;
pub use metadata::{ColumnarMetadata, StoredFieldList, COLUMNAR_METADATA_KEY, UNKNOWN_FIELDS_COLUMN};
pub use projection::{ProjectionPlan, RequiredFields};
pub use reader::{ProtoColumnReader, ReaderState};
pub use schema::MessageSchema;
pub use source::{ColumnSource, MemoryColumnSource, ParquetColumnSource, RawRecord, ReadOptions};
