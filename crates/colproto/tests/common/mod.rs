//! Shared fixtures for the integration tests
//!
//! Column files are produced here the way the columnar writer lays them out:
//! one `Binary` column per stored field number holding that field's values
//! without tags, plus an optional trailing column holding every other field
//! as ordinary protobuf bytes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use arrow::array::{ArrayRef, BinaryArray, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use bytes::Bytes;
use colproto::{
    ColumnarMetadata, MemoryColumnSource, MessageSchema, COLUMNAR_METADATA_KEY,
    UNKNOWN_FIELDS_COLUMN,
};
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use prost::encoding::{decode_key, decode_varint, WireType};
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, Kind, MapKey, ReflectMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions,
};

pub const PERSON: &str = "example.Person";

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn typed_field(name: &str, number: i32, ty: Type, label: Label, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, ty, label)
    }
}

/// Descriptor set for the `example` package
///
/// ```text
/// message Person {
///   enum PhoneType { MOBILE = 0; HOME = 1; WORK = 2; }
///   message PhoneNumber { string number = 1; PhoneType type = 2; }
///
///   string name = 1;
///   int32 id = 2;
///   string email = 3;
///   repeated PhoneNumber phones = 4;
///   map<string, int64> scores = 5;
///   repeated sint32 deltas = 6;
///   double weight = 8;
///   bytes avatar = 9;
///   PhoneNumber home = 10;
/// }
/// ```
pub fn descriptor_set() -> FileDescriptorSet {
    let phone_type = EnumDescriptorProto {
        name: Some("PhoneType".to_string()),
        value: ["MOBILE", "HOME", "WORK"]
            .iter()
            .enumerate()
            .map(|(number, name)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(number as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let phone_number = DescriptorProto {
        name: Some("PhoneNumber".to_string()),
        field: vec![
            field("number", 1, Type::String, Label::Optional),
            typed_field("type", 2, Type::Enum, Label::Optional, ".example.Person.PhoneType"),
        ],
        ..Default::default()
    };

    let scores_entry = DescriptorProto {
        name: Some("ScoresEntry".to_string()),
        field: vec![
            field("key", 1, Type::String, Label::Optional),
            field("value", 2, Type::Int64, Label::Optional),
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    let person = DescriptorProto {
        name: Some("Person".to_string()),
        field: vec![
            field("name", 1, Type::String, Label::Optional),
            field("id", 2, Type::Int32, Label::Optional),
            field("email", 3, Type::String, Label::Optional),
            typed_field("phones", 4, Type::Message, Label::Repeated, ".example.Person.PhoneNumber"),
            typed_field("scores", 5, Type::Message, Label::Repeated, ".example.Person.ScoresEntry"),
            field("deltas", 6, Type::Sint32, Label::Repeated),
            field("weight", 8, Type::Double, Label::Optional),
            field("avatar", 9, Type::Bytes, Label::Optional),
            typed_field("home", 10, Type::Message, Label::Optional, ".example.Person.PhoneNumber"),
        ],
        nested_type: vec![phone_number, scores_entry],
        enum_type: vec![phone_type],
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("example/person.proto".to_string()),
            package: Some("example".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![person],
            ..Default::default()
        }],
    }
}

/// Proto2 descriptor set with group fields
///
/// ```text
/// message Legacy {
///   optional group Result = 1 { optional string url = 2; }
///   repeated group Item = 3 { optional int32 count = 4; }
/// }
/// ```
pub fn legacy_descriptor_set() -> FileDescriptorSet {
    let legacy = DescriptorProto {
        name: Some("Legacy".to_string()),
        field: vec![
            typed_field("result", 1, Type::Group, Label::Optional, ".example.Legacy.Result"),
            typed_field("item", 3, Type::Group, Label::Repeated, ".example.Legacy.Item"),
        ],
        nested_type: vec![
            DescriptorProto {
                name: Some("Result".to_string()),
                field: vec![field("url", 2, Type::String, Label::Optional)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("Item".to_string()),
                field: vec![field("count", 4, Type::Int32, Label::Optional)],
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("example/legacy.proto".to_string()),
            package: Some("example".to_string()),
            syntax: Some("proto2".to_string()),
            message_type: vec![legacy],
            ..Default::default()
        }],
    }
}

/// Pool shared by every fixture
///
/// Dynamic messages only compare equal when their descriptors come from the
/// same pool, so messages built here and messages read back must share it.
pub fn pool() -> DescriptorPool {
    static POOL: OnceLock<DescriptorPool> = OnceLock::new();
    POOL.get_or_init(|| {
        DescriptorPool::from_file_descriptor_set(descriptor_set()).expect("valid descriptor set")
    })
    .clone()
}

pub fn person_schema() -> MessageSchema {
    MessageSchema::from_pool(&pool(), PERSON).expect("example.Person exists")
}

pub fn legacy_schema() -> MessageSchema {
    let pool = DescriptorPool::from_file_descriptor_set(legacy_descriptor_set())
        .expect("valid descriptor set");
    MessageSchema::from_pool(&pool, "example.Legacy").expect("example.Legacy exists")
}

fn phone(schema: &MessageSchema, number: &str, kind: i32) -> Value {
    let descriptor = schema
        .descriptor()
        .parent_pool()
        .get_message_by_name("example.Person.PhoneNumber")
        .expect("PhoneNumber exists");
    let mut phone = DynamicMessage::new(descriptor);
    phone.set_field_by_name("number", Value::String(number.to_string()));
    phone.set_field_by_name("type", Value::EnumNumber(kind));
    Value::Message(phone)
}

/// A fully populated person
pub fn full_person(schema: &MessageSchema) -> DynamicMessage {
    let mut person = schema.new_message();
    person.set_field_by_name("name", Value::String("Ada".to_string()));
    person.set_field_by_name("id", Value::I32(-7));
    person.set_field_by_name("email", Value::String("ada@example.com".to_string()));
    person.set_field_by_name(
        "phones",
        Value::List(vec![phone(schema, "555-0100", 1), phone(schema, "555-0199", 2)]),
    );
    person.set_field_by_name(
        "scores",
        Value::Map(HashMap::from([
            (MapKey::String("math".to_string()), Value::I64(97)),
            (MapKey::String("chess".to_string()), Value::I64(-3)),
        ])),
    );
    person.set_field_by_name(
        "deltas",
        Value::List(vec![Value::I32(-1), Value::I32(0), Value::I32(300)]),
    );
    person.set_field_by_name("weight", Value::F64(61.5));
    person.set_field_by_name("avatar", Value::Bytes(Bytes::from_static(&[0, 1, 255])));
    person.set_field_by_name("home", phone(schema, "555-0000", 1));
    person
}

/// A person with only a few fields set
pub fn sparse_person(schema: &MessageSchema, name: &str, id: i32) -> DynamicMessage {
    let mut person = schema.new_message();
    person.set_field_by_name("name", Value::String(name.to_string()));
    person.set_field_by_name("id", Value::I32(id));
    person
}

/// Keeps only the given field numbers
pub fn project(message: &DynamicMessage, numbers: &[u32]) -> DynamicMessage {
    let mut projected = message.clone();
    for field in message.descriptor().fields() {
        if !numbers.contains(&field.number()) {
            projected.clear_field(&field);
        }
    }
    projected
}

/// Splits an encoded message into stored columns
///
/// Fields listed in `stored` get their tagless values appended to their
/// column; packed repeated scalars are unpacked. Everything else goes to the
/// trailing unknowns column when `stored` ends with the sentinel, and is
/// dropped otherwise.
pub fn shred(message: &DynamicMessage, stored: &[i32]) -> Vec<Vec<u8>> {
    let descriptor = message.descriptor();
    let mut columns = vec![Vec::new(); stored.len()];
    let unknowns = stored.iter().position(|&id| id == UNKNOWN_FIELDS_COLUMN);

    let encoded = message.encode_to_vec();
    let mut buf = encoded.as_slice();
    while !buf.is_empty() {
        let entry = buf;
        let (number, wire_type) = decode_key(&mut buf).expect("valid key");
        let value = buf;

        let mut payload_start = 0;
        match wire_type {
            WireType::Varint => {
                decode_varint(&mut buf).expect("valid varint");
            }
            WireType::SixtyFourBit => buf = &buf[8..],
            WireType::ThirtyTwoBit => buf = &buf[4..],
            WireType::LengthDelimited => {
                let len = decode_varint(&mut buf).expect("valid length") as usize;
                payload_start = value.len() - buf.len();
                buf = &buf[len..];
            }
            WireType::StartGroup | WireType::EndGroup => panic!("groups are not shredded"),
        }
        let value = &value[..value.len() - buf.len()];

        match stored.iter().position(|&id| id == number as i32) {
            Some(column) => {
                let field = descriptor.get_field(number).expect("stored field in schema");
                let packed = field.is_list()
                    && wire_type == WireType::LengthDelimited
                    && !matches!(field.kind(), Kind::String | Kind::Bytes | Kind::Message(_));
                if packed {
                    columns[column].extend_from_slice(&value[payload_start..]);
                } else {
                    columns[column].extend_from_slice(value);
                }
            }
            None => {
                if let Some(column) = unknowns {
                    columns[column].extend_from_slice(&entry[..entry.len() - buf.len()]);
                }
            }
        }
    }
    columns
}

/// Length-prefixed value, as stored for strings, bytes and messages
pub fn length_prefixed(value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    prost::encoding::encode_varint(value.len() as u64, &mut buf);
    buf.extend_from_slice(value);
    buf
}

pub fn metadata_text(classname: &str, stored: &[i32]) -> String {
    ColumnarMetadata {
        classname: Some(classname.to_string()),
        field_id: stored.to_vec(),
    }
    .to_text()
    .expect("metadata renders as text")
}

/// In-memory source holding the shredded messages
pub fn memory_source(messages: &[DynamicMessage], stored: &[i32]) -> MemoryColumnSource {
    let mut source = MemoryColumnSource::new(stored.len())
        .with_metadata(COLUMNAR_METADATA_KEY, metadata_text(PERSON, stored));
    for message in messages {
        let row = shred(message, stored).into_iter().map(Bytes::from).collect();
        source.push_row(row).expect("row matches column count");
    }
    source
}

fn column_name(position: usize, id: i32) -> String {
    if id == UNKNOWN_FIELDS_COLUMN {
        "unknowns".to_string()
    } else {
        format!("c{}_f{}", position, id)
    }
}

/// Writes raw rows to an in-memory parquet file
///
/// `None` cells are written as nulls. `metadata` is stored under the
/// columnar metadata key when present.
pub fn write_parquet_rows(
    column_names: &[String],
    rows: &[Vec<Option<Vec<u8>>>],
    metadata: Option<String>,
    row_group_size: usize,
) -> Bytes {
    let schema = Arc::new(Schema::new(
        column_names
            .iter()
            .map(|name| Field::new(name, DataType::Binary, true))
            .collect::<Vec<_>>(),
    ));

    let columns: Vec<ArrayRef> = (0..column_names.len())
        .map(|column| {
            let values: Vec<Option<&[u8]>> =
                rows.iter().map(|row| row[column].as_deref()).collect();
            Arc::new(BinaryArray::from(values)) as ArrayRef
        })
        .collect();

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .set_key_value_metadata(
            metadata.map(|text| vec![KeyValue::new(COLUMNAR_METADATA_KEY.to_string(), text)]),
        )
        .build();

    let mut writer =
        ArrowWriter::try_new(Vec::new(), schema.clone(), Some(props)).expect("create writer");
    if !rows.is_empty() {
        let batch = RecordBatch::try_new(schema, columns).expect("build batch");
        writer.write(&batch).expect("write batch");
    }
    Bytes::from(writer.into_inner().expect("close writer"))
}

/// Shreds messages into an in-memory parquet column file
pub fn write_parquet(messages: &[DynamicMessage], stored: &[i32], row_group_size: usize) -> Bytes {
    let names: Vec<String> = stored
        .iter()
        .enumerate()
        .map(|(position, &id)| column_name(position, id))
        .collect();
    let rows: Vec<Vec<Option<Vec<u8>>>> = messages
        .iter()
        .map(|message| shred(message, stored).into_iter().map(Some).collect())
        .collect();
    write_parquet_rows(&names, &rows, Some(metadata_text(PERSON, stored)), row_group_size)
}
