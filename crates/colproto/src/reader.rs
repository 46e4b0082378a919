//! Pull-based reader over one split of a column file
//!
//! Opening a reader reads the stored field list, computes the projection plan
//! and restricts the source to the planned columns. Records are then fetched
//! one at a time with [`ProtoColumnReader::next_record`]; the message is only
//! built when [`ProtoColumnReader::current_value`] asks for it, and is cached
//! until the next fetch.

use std::fs::File;
use std::path::Path;

use prost_reflect::DynamicMessage;
use tracing::{debug, error, info};

use crate::error::{ColProtoError, Result};
use crate::materialize::RecordMaterializer;
use crate::metadata::StoredFieldList;
use crate::projection::{ProjectionPlan, RequiredFields};
use crate::schema::MessageSchema;
use crate::source::{ColumnSource, ParquetColumnSource, ReadOptions};

/// Lifecycle of a [`ProtoColumnReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Plan computed, no record fetched yet
    PlanComputed,
    /// Positioned on a record
    Iterating,
    /// No more records in the split
    Exhausted,
    /// An unrecoverable error occurred
    Failed,
}

/// Reader rebuilding projected messages from a column source
pub struct ProtoColumnReader<S: ColumnSource> {
    source: S,
    materializer: RecordMaterializer,
    state: ReaderState,

    /// Message built for the current record, if requested
    current: Option<DynamicMessage>,

    records_read: u64,
}

impl ProtoColumnReader<ParquetColumnSource<File>> {
    /// Opens a split of a parquet column file
    pub fn open_parquet<P: AsRef<Path>>(
        path: P,
        options: ReadOptions,
        schema: &MessageSchema,
        required: &RequiredFields,
    ) -> Result<Self> {
        let path = path.as_ref();
        let required_field_numbers = required.resolve(schema)?;
        info!(
            message_type = %schema.full_name(),
            path = %path.display(),
            start_row_group = options.start_row_group,
            total_row_groups = options.total_row_groups,
            "reading column file"
        );
        let source = ParquetColumnSource::open(path, options)?;
        Self::open_resolved(source, schema, required_field_numbers)
    }
}

impl<S: ColumnSource> ProtoColumnReader<S> {
    /// Plans the read and configures the source's column selection
    ///
    /// The required fields are checked against the schema before the source
    /// is touched.
    pub fn open(source: S, schema: &MessageSchema, required: &RequiredFields) -> Result<Self> {
        let required_field_numbers = required.resolve(schema)?;
        Self::open_resolved(source, schema, required_field_numbers)
    }

    fn open_resolved(
        mut source: S,
        schema: &MessageSchema,
        required_field_numbers: Vec<u32>,
    ) -> Result<Self> {
        let stored = StoredFieldList::from_source(&source)?;
        if stored.len() != source.column_count() {
            return Err(ColProtoError::ColumnCountMismatch {
                stored: stored.len(),
                actual: source.column_count(),
            });
        }

        let plan = ProjectionPlan::from_resolved(schema, required_field_numbers, &stored)?;
        source.select_columns(plan.columns())?;

        Ok(Self {
            source,
            materializer: RecordMaterializer::new(plan),
            state: ReaderState::PlanComputed,
            current: None,
            records_read: 0,
        })
    }

    /// Returns the projection plan
    pub fn plan(&self) -> &ProjectionPlan {
        self.materializer.plan()
    }

    /// Returns the lifecycle state
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of records fetched so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Returns the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the reader, returning the source
    pub fn into_source(self) -> S {
        self.source
    }

    /// Advances to the next record, returning false at the end of the split
    ///
    /// The record is not decoded here; see [`current_value`](Self::current_value).
    pub fn next_record(&mut self) -> Result<bool> {
        match self.state {
            ReaderState::Failed => return Err(ColProtoError::ReaderFailed),
            ReaderState::Exhausted => return Ok(false),
            ReaderState::PlanComputed | ReaderState::Iterating => {}
        }

        self.current = None;
        match self.source.advance() {
            Ok(true) => {
                self.state = ReaderState::Iterating;
                self.records_read += 1;
                Ok(true)
            }
            Ok(false) => {
                self.state = ReaderState::Exhausted;
                info!(records = self.records_read, "split exhausted");
                Ok(false)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Returns the message for the current record
    ///
    /// The message is built on the first call for a record and cached; later
    /// calls return the same message. Returns `None` before the first record
    /// and at the end of the split.
    pub fn current_value(&mut self) -> Result<Option<&DynamicMessage>> {
        match self.state {
            ReaderState::Failed => return Err(ColProtoError::ReaderFailed),
            ReaderState::PlanComputed | ReaderState::Exhausted => return Ok(None),
            ReaderState::Iterating => {}
        }

        if self.current.is_none() {
            let built = match self.source.current() {
                Ok(Some(record)) => self.materializer.materialize(&record),
                Ok(None) => return Ok(None),
                Err(e) => Err(e),
            };
            match built {
                Ok(message) => {
                    debug!(record = self.records_read, "materialized record");
                    self.current = Some(message);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        Ok(self.current.as_ref())
    }

    fn fail(&mut self, e: ColProtoError) -> ColProtoError {
        error!(record = self.records_read, error = %e, "read failed");
        self.state = ReaderState::Failed;
        self.current = None;
        e
    }
}

impl<S: ColumnSource> Iterator for ProtoColumnReader<S> {
    type Item = Result<DynamicMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        // A failed reader has already surfaced its error
        if self.state == ReaderState::Failed {
            return None;
        }

        match self.next_record() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => return Some(Err(e)),
        }

        match self.current_value() {
            Ok(Some(message)) => Some(Ok(message.clone())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
