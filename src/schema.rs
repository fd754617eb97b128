//! The schema model: declared fields, the struct schema they form, and the
//! coercion rules that reconcile a declared wire type with a decoded value.
//!
//! A `Schema` is an ordered, immutable description of a struct's fields. It
//! is built once (by the builder here, or by the `#[derive(Jce)]` macro) and
//! held for the life of the process.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::value::Value;
use crate::wire::{
    BodyDecoder, WireTypeTable, WT_BYTE, WT_BYTE_ARRAY, WT_FLOAT32, WT_FLOAT64, WT_INT16,
    WT_INT32, WT_INT64, WT_LIST, WT_LONG_STRING, WT_MAP, WT_SHORT_STRING, WT_STRUCT_START,
    WT_ZERO_TAG,
};

/// A single declared field: name, field id, declared wire type, optional
/// default, and the "non-wire" flag.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub field_id: u8,
    pub wire_type: u8,
    pub default: Option<Value>,
    pub non_wire: bool,
}

/// An ordered, validated set of fields plus the wire-type table used to
/// decode them.
pub struct Schema {
    fields: Vec<Field>,
    by_id: BTreeMap<u8, usize>,
    wire_types: WireTypeTable,
}

impl Schema {
    pub fn new() -> SchemaBuilder {
        SchemaBuilder {
            fields: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Fields in declaration order (not necessarily ascending field id;
    /// use `fields_by_id` for the encode-order iteration the struct encoder needs).
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields in ascending field-id order, as the struct encoder must
    /// iterate them.
    pub fn fields_by_id(&self) -> impl Iterator<Item = &Field> {
        self.by_id.values().map(move |&idx| &self.fields[idx])
    }

    pub fn field_by_id(&self, field_id: u8) -> Option<&Field> {
        self.by_id.get(&field_id).map(|&idx| &self.fields[idx])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn wire_types(&self) -> &WireTypeTable {
        &self.wire_types
    }
}

pub struct SchemaBuilder {
    fields: Vec<Field>,
    overrides: Vec<(u8, BodyDecoder)>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: &'static str, field_id: u8, wire_type: u8) -> Self {
        self.fields.push(Field {
            name,
            field_id,
            wire_type,
            default: None,
            non_wire: false,
        });
        self
    }

    pub fn field_with_default(
        mut self,
        name: &'static str,
        field_id: u8,
        wire_type: u8,
        default: Value,
    ) -> Self {
        self.fields.push(Field {
            name,
            field_id,
            wire_type,
            default: Some(default),
            non_wire: false,
        });
        self
    }

    /// A field populated only from a caller-supplied `ExtraMap` on decode,
    /// never iterated by the struct encoder.
    pub fn non_wire_field(mut self, name: &'static str, default: Value) -> Self {
        self.fields.push(Field {
            name,
            field_id: 0,
            wire_type: WT_BYTE,
            default: Some(default),
            non_wire: true,
        });
        self
    }

    /// Substitutes the body decoder used for one wire-type code when
    /// decoding this struct's fields.
    pub fn wire_type_override(mut self, wire_type: u8, decoder: BodyDecoder) -> Self {
        self.overrides.push((wire_type, decoder));
        self
    }

    /// Validates field-id uniqueness and range and builds the immutable
    /// `Schema`.
    pub fn build(self) -> Result<Schema> {
        let mut by_id = BTreeMap::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if field.non_wire {
                continue;
            }
            if field.field_id < 1 {
                return Err(Error::InvalidFieldId(field.field_id as i64));
            }
            if by_id.insert(field.field_id, idx).is_some() {
                return Err(Error::InvalidFieldId(field.field_id as i64));
            }
        }
        let mut wire_types = WireTypeTable::default();
        for (wire_type, decoder) in self.overrides {
            wire_types = wire_types.with_override(wire_type, decoder);
        }
        Ok(Schema {
            fields: self.fields,
            by_id,
            wire_types,
        })
    }
}

/// The coarse compatibility class a wire type belongs to for coercion
/// purposes: integer widths collapse into one class since narrowing is an
/// encode-time-only concern.
fn wire_type_class(wire_type: u8) -> Result<&'static str> {
    match wire_type {
        WT_BYTE | WT_ZERO_TAG => Ok("byte"),
        WT_INT16 | WT_INT32 | WT_INT64 => Ok("int"),
        WT_FLOAT32 => Ok("float32"),
        WT_FLOAT64 => Ok("float64"),
        WT_SHORT_STRING | WT_LONG_STRING => Ok("string"),
        WT_MAP => Ok("map"),
        WT_LIST => Ok("list"),
        WT_STRUCT_START => Ok("struct"),
        WT_BYTE_ARRAY => Ok("bytes"),
        other => Err(Error::UnknownWireType {
            field_id: 0,
            wire_type: other,
        }),
    }
}

fn value_class(value: &Value) -> &'static str {
    match value {
        Value::Byte(_) | Value::Bool(_) => "byte",
        Value::Int(_) => "int",
        Value::Float(_) => "float32",
        Value::Double(_) => "float64",
        Value::Str(_) => "string",
        Value::Bytes(_) => "bytes",
        Value::Map(_) => "map",
        Value::List(_) => "list",
        Value::Struct(_) => "struct",
    }
}

/// Reconciles a field's declared wire type with a value produced by
/// bottom-up decoding, a raw byte sequence, or a host primitive. Byte and
/// int classes accept each other since narrowing only affects the wire
/// width, never the in-memory representation; within that pair the result
/// always normalizes to `Value::Int` so callers see a single widened type
/// regardless of which width the encoder picked.
pub fn validate(field: &Field, raw: Value) -> Result<Value> {
    let declared = wire_type_class(field.wire_type)?;
    let incoming = value_class(&raw);

    if declared == incoming {
        return Ok(raw);
    }
    if matches!(declared, "byte" | "int") && matches!(incoming, "byte" | "int") {
        return Ok(match raw {
            Value::Byte(b) => Value::Int(b as i64),
            other => other,
        });
    }
    if let Value::Bytes(bytes) = &raw {
        if matches!(declared, "byte" | "int") {
            return decode_int_from_raw_bytes(field, bytes);
        }
    }

    Err(Error::TypeMismatch {
        field_id: field.field_id as u16,
        expected: declared,
        actual: raw.kind_name(),
    })
}

/// Re-decodes a raw byte sequence into an integer by its length:
/// 1→byte, 2→int16, 4→int32, 8→int64.
fn decode_int_from_raw_bytes(field: &Field, bytes: &[u8]) -> Result<Value> {
    let n = match bytes.len() {
        1 => bytes[0] as i8 as i64,
        2 => BigEndian::read_i16(&bytes[0..2]) as i64,
        4 => BigEndian::read_i32(&bytes[0..4]) as i64,
        8 => BigEndian::read_i64(&bytes[0..8]),
        _ => {
            return Err(Error::TypeMismatch {
                field_id: field.field_id as u16,
                expected: "1, 2, 4, or 8 raw bytes",
                actual: "bytes",
            })
        }
    };
    Ok(Value::Int(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_duplicate_field_ids() {
        let result = Schema::new()
            .field("a", 1, WT_SHORT_STRING)
            .field("b", 1, WT_INT32)
            .build();
        assert!(matches!(result, Err(Error::InvalidFieldId(1))));
    }

    #[test]
    fn build_rejects_zero_field_id() {
        let result = Schema::new().field("a", 0, WT_SHORT_STRING).build();
        assert!(matches!(result, Err(Error::InvalidFieldId(0))));
    }

    #[test]
    fn non_wire_field_does_not_collide_with_real_ids() {
        let schema = Schema::new()
            .field("server", 1, WT_SHORT_STRING)
            .non_wire_field("extra", Value::Str("extra_default".into()))
            .build()
            .unwrap();
        assert_eq!(schema.fields_by_id().count(), 1);
        assert!(schema.field_by_name("extra").unwrap().non_wire);
    }

    #[test]
    fn validate_widens_byte_to_declared_int_field() {
        let field = Field {
            name: "port",
            field_id: 2,
            wire_type: WT_INT32,
            default: None,
            non_wire: false,
        };
        let widened = validate(&field, Value::Byte(5)).unwrap();
        assert_eq!(widened, Value::Int(5));
    }

    #[test]
    fn validate_reinterprets_raw_bytes_by_length() {
        let field = Field {
            name: "port",
            field_id: 2,
            wire_type: WT_INT32,
            default: None,
            non_wire: false,
        };
        let decoded = validate(&field, Value::Bytes(vec![0x1F, 0x40])).unwrap();
        assert_eq!(decoded, Value::Int(8000));
    }

    #[test]
    fn validate_rejects_incompatible_class() {
        let field = Field {
            name: "server",
            field_id: 1,
            wire_type: WT_SHORT_STRING,
            default: None,
            non_wire: false,
        };
        assert!(matches!(
            validate(&field, Value::Int(5)),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
