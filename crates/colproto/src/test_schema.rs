//! Descriptor fixtures for unit tests

use crate::schema::MessageSchema;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

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

/// `test.Person { string name = 1; int32 id = 2; string email = 3; repeated string tags = 7; }`
pub(crate) fn person_schema() -> MessageSchema {
    let file = FileDescriptorProto {
        name: Some("test/person.proto".to_string()),
        package: Some("test".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Person".to_string()),
            field: vec![
                field("name", 1, Type::String, Label::Optional),
                field("id", 2, Type::Int32, Label::Optional),
                field("email", 3, Type::String, Label::Optional),
                field("tags", 7, Type::String, Label::Repeated),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
        .expect("valid test descriptor");
    MessageSchema::from_pool(&pool, "test.Person").expect("test.Person exists")
}

/// Encodes a string value the way a known column stores it: length prefix, no tag
pub(crate) fn string_column(value: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    prost::encoding::encode_varint(value.len() as u64, &mut buf);
    buf.extend_from_slice(value.as_bytes());
    buf
}
