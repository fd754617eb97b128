//! Top-level encode/decode surface.
//!
//! `Encodable`/`Decodable` are the small interface a surrounding
//! schema/validation framework needs to provide: field enumeration,
//! defaults, and construction from a name→value mapping. The `#[derive(Jce)]`
//! macro implements both for a plain struct; nothing here depends on that
//! macro existing.

use crate::error::{Error, Result};
use crate::header::read_header;
use crate::schema::{validate, Schema};
use crate::value::{ExtraMap, FieldBag, Value};
use crate::wire::{self, write_tagged};

/// A type whose fields a `Schema` can enumerate for encoding.
pub trait Encodable {
    fn schema() -> &'static Schema;

    /// The value bound to `field_id`, or `None` if the caller never set it
    /// (the encoder falls back to the field's declared default, if any).
    fn field_value(&self, field_id: u8) -> Option<Value>;
}

/// A type a `Schema`-indexed field bag can be reassembled into.
pub trait Decodable: Sized {
    fn schema() -> &'static Schema;

    /// Builds an instance from the coerced wire fields and the
    /// caller-supplied `extras` for `non_wire` fields.
    fn from_fields(fields: FieldBag, extras: ExtraMap) -> Result<Self>;
}

/// Serializes a schema-bound value: fields in ascending field-id order,
/// never wrapped in struct-start/struct-end at the top level.
pub fn encode<T: Encodable>(value: &T) -> Result<Vec<u8>> {
    let schema = T::schema();
    let mut out = Vec::new();
    for field in schema.fields_by_id() {
        let v = match value.field_value(field.field_id) {
            Some(v) => v,
            None => field
                .default
                .clone()
                .ok_or_else(|| Error::MissingField(field.name.to_string(), field.field_id))?,
        };
        write_tagged(&mut out, field.field_id, &v)?;
    }
    Ok(out)
}

/// Parses a buffer into a raw `field_id -> Value` bag with no schema.
/// Consumes until the buffer is exhausted; duplicate field ids overwrite
/// earlier ones.
pub fn decode_raw(bytes: &[u8]) -> Result<FieldBag> {
    let mut pos = 0;
    let mut bag = FieldBag::new();
    while pos < bytes.len() {
        let (field_id, wire_type, header_len) = read_header(bytes, pos)?;
        let (value, body_len) = wire::read_body(bytes, pos + header_len, wire_type, field_id)?;
        if bag.insert(field_id, value).is_some() {
            log::warn!("duplicate field id {field_id} in top-level payload; last value wins");
        }
        pos += header_len + body_len;
    }
    Ok(bag)
}

/// Reassembles one struct instance from a raw bag against `schema`: coerce
/// present fields through `validate`, fall back to declared defaults, and
/// fill `non_wire` fields from `extras` (falling back to their own default
/// when the caller didn't supply one).
fn reassemble<T: Decodable>(schema: &Schema, bag: FieldBag, mut extras: ExtraMap) -> Result<T> {
    let mut resolved = FieldBag::new();
    for field in schema.fields() {
        if field.non_wire {
            if !extras.contains_key(field.name) {
                if let Some(default) = &field.default {
                    extras.insert(field.name.to_string(), default.clone());
                }
            }
            continue;
        }
        let value = match bag.get(&field.field_id) {
            Some(raw) => validate(field, raw.clone())?,
            None => field
                .default
                .clone()
                .ok_or_else(|| Error::MissingField(field.name.to_string(), field.field_id))?,
        };
        resolved.insert(field.field_id, value);
    }
    T::from_fields(resolved, extras)
}

/// Deserializes a schema-bound value. `extras` supplies values for fields
/// marked `non_wire`; omitted non-wire fields fall back to their declared
/// default.
pub fn decode<T: Decodable>(bytes: &[u8], extras: Option<ExtraMap>) -> Result<T> {
    let bag = decode_raw(bytes)?;
    reassemble(T::schema(), bag, extras.unwrap_or_default())
}

/// Decodes a top-level payload, pulls the list at `field_id`, and
/// reassembles each entry against `T`'s schema, treating every list
/// element as a struct-payload bag rather than a list of bare scalars.
pub fn decode_list<T: Decodable>(bytes: &[u8], field_id: u8) -> Result<Vec<T>> {
    let bag = decode_raw(bytes)?;
    let list = bag
        .get(&field_id)
        .ok_or_else(|| Error::MissingField("list".to_string(), field_id))?;
    let items = match list {
        Value::List(items) => items,
        other => {
            return Err(Error::TypeMismatch {
                field_id: field_id as u16,
                expected: "list",
                actual: other.kind_name(),
            })
        }
    };
    let schema = T::schema();
    items
        .iter()
        .map(|item| match item {
            Value::Struct(element_bag) => reassemble(schema, element_bag.clone(), ExtraMap::new()),
            other => Err(Error::TypeMismatch {
                field_id: 0,
                expected: "struct",
                actual: other.kind_name(),
            }),
        })
        .collect()
}
