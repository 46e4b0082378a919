//! Decoding of one known column into one field
//!
//! A known column holds the field's value without its tag, in protobuf wire
//! representation: varints for integer kinds, little endian for fixed-width
//! kinds, and a varint length prefix for strings, bytes and messages. Repeated
//! fields concatenate their elements; map fields are a sequence of
//! length-prefixed entry messages.

use bytes::{Buf, Bytes};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, Value};
use thiserror::Error;

/// Errors decoding a single column value
#[derive(Error, Debug)]
pub enum FieldDecodeError {
    /// Fewer bytes than the value needs
    #[error("truncated value: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Malformed varint
    #[error("malformed varint: {0}")]
    Varint(#[source] prost::DecodeError),

    /// String value is not UTF-8
    #[error("invalid UTF-8 in string value: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Nested message failed to decode
    #[error("malformed nested message: {0}")]
    Message(#[source] prost::DecodeError),

    /// Bytes left over after a singular value
    #[error("{0} trailing bytes after singular value")]
    TrailingBytes(usize),

    /// Repeated groups carry no length and cannot be split without tags
    #[error("repeated group fields cannot be decoded from a column")]
    RepeatedGroup,

    /// Map entry key of a kind maps cannot use
    #[error("invalid map key")]
    InvalidMapKey,

    /// Decoded value rejected by the message
    #[error("value rejected by message: {0}")]
    Rejected(String),
}

type Result<T> = std::result::Result<T, FieldDecodeError>;

/// Decodes a non-empty column buffer and assigns it to `field` of `message`
///
/// Repeated and map values are appended to whatever the field already holds.
pub fn decode_field(
    field: &FieldDescriptor,
    mut buf: &[u8],
    message: &mut DynamicMessage,
) -> Result<()> {
    if field.is_map() {
        let Kind::Message(entry) = field.kind() else {
            return Err(FieldDecodeError::InvalidMapKey);
        };
        let mut entries = Vec::new();
        while buf.has_remaining() {
            let bytes = read_length_delimited(&mut buf)?;
            let entry = DynamicMessage::decode(entry.clone(), bytes)
                .map_err(FieldDecodeError::Message)?;
            let key = entry
                .get_field_by_number(1)
                .map(|v| v.into_owned())
                .ok_or(FieldDecodeError::InvalidMapKey)?;
            let value = entry
                .get_field_by_number(2)
                .map(|v| v.into_owned())
                .ok_or(FieldDecodeError::InvalidMapKey)?;
            entries.push((map_key(key)?, value));
        }
        if let Value::Map(map) = message.get_field_mut(field) {
            map.extend(entries);
        }
        return Ok(());
    }

    let kind = field.kind();

    if field.is_list() {
        if field.is_group() {
            return Err(FieldDecodeError::RepeatedGroup);
        }
        let mut values = Vec::new();
        while buf.has_remaining() {
            values.push(read_value(&mut buf, &kind)?);
        }
        if let Value::List(list) = message.get_field_mut(field) {
            list.extend(values);
        }
        return Ok(());
    }

    let value = match &kind {
        // A group's body is not length-prefixed: the whole column is the group
        Kind::Message(desc) if field.is_group() => {
            let group =
                DynamicMessage::decode(desc.clone(), buf).map_err(FieldDecodeError::Message)?;
            buf = &[];
            Value::Message(group)
        }
        _ => read_value(&mut buf, &kind)?,
    };

    if buf.has_remaining() {
        return Err(FieldDecodeError::TrailingBytes(buf.remaining()));
    }

    message
        .try_set_field(field, value)
        .map_err(|e| FieldDecodeError::Rejected(e.to_string()))
}

/// Reads one value of the given kind
fn read_value(buf: &mut &[u8], kind: &Kind) -> Result<Value> {
    let value = match kind {
        Kind::Double => Value::F64(f64::from_bits(read_fixed64(buf)?)),
        Kind::Float => Value::F32(f32::from_bits(read_fixed32(buf)?)),
        Kind::Int32 => Value::I32(read_varint(buf)? as i32),
        Kind::Int64 => Value::I64(read_varint(buf)? as i64),
        Kind::Uint32 => Value::U32(read_varint(buf)? as u32),
        Kind::Uint64 => Value::U64(read_varint(buf)?),
        Kind::Sint32 => Value::I32(zigzag32(read_varint(buf)? as u32)),
        Kind::Sint64 => Value::I64(zigzag64(read_varint(buf)?)),
        Kind::Fixed32 => Value::U32(read_fixed32(buf)?),
        Kind::Fixed64 => Value::U64(read_fixed64(buf)?),
        Kind::Sfixed32 => Value::I32(read_fixed32(buf)? as i32),
        Kind::Sfixed64 => Value::I64(read_fixed64(buf)? as i64),
        Kind::Bool => Value::Bool(read_varint(buf)? != 0),
        Kind::String => {
            let bytes = read_length_delimited(buf)?;
            Value::String(std::str::from_utf8(bytes)?.to_owned())
        }
        Kind::Bytes => Value::Bytes(Bytes::copy_from_slice(read_length_delimited(buf)?)),
        Kind::Message(desc) => {
            let bytes = read_length_delimited(buf)?;
            Value::Message(
                DynamicMessage::decode(desc.clone(), bytes).map_err(FieldDecodeError::Message)?,
            )
        }
        // Unknown numbers are kept as-is
        Kind::Enum(_) => Value::EnumNumber(read_varint(buf)? as i32),
    };
    Ok(value)
}

fn read_varint(buf: &mut &[u8]) -> Result<u64> {
    prost::encoding::decode_varint(buf).map_err(FieldDecodeError::Varint)
}

fn read_fixed32(buf: &mut &[u8]) -> Result<u32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn read_fixed64(buf: &mut &[u8]) -> Result<u64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn read_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = read_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| FieldDecodeError::Truncated {
        needed: usize::MAX,
        remaining: buf.len(),
    })?;
    ensure_remaining(buf, len)?;
    let bytes: &'a [u8] = *buf;
    let (value, rest) = bytes.split_at(len);
    *buf = rest;
    Ok(value)
}

fn ensure_remaining(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(FieldDecodeError::Truncated {
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

fn zigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

fn map_key(value: Value) -> Result<MapKey> {
    match value {
        Value::Bool(v) => Ok(MapKey::Bool(v)),
        Value::I32(v) => Ok(MapKey::I32(v)),
        Value::I64(v) => Ok(MapKey::I64(v)),
        Value::U32(v) => Ok(MapKey::U32(v)),
        Value::U64(v) => Ok(MapKey::U64(v)),
        Value::String(v) => Ok(MapKey::String(v)),
        _ => Err(FieldDecodeError::InvalidMapKey),
    }
}
