//! Per-wire-type body codecs plus the tagged-value reader/writer that glues
//! a header to a body.
//!
//! Each `write_*` function appends header bytes and then the body to an
//! output buffer. Each `read_*` function consumes a body (the header has
//! already been read by the caller) and returns `(value, bytes_consumed)`.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::header::{read_header, write_header};
use crate::value::Value;

pub const WT_BYTE: u8 = 0;
pub const WT_INT16: u8 = 1;
pub const WT_INT32: u8 = 2;
pub const WT_INT64: u8 = 3;
pub const WT_FLOAT32: u8 = 4;
pub const WT_FLOAT64: u8 = 5;
pub const WT_SHORT_STRING: u8 = 6;
pub const WT_LONG_STRING: u8 = 7;
pub const WT_MAP: u8 = 8;
pub const WT_LIST: u8 = 9;
pub const WT_STRUCT_START: u8 = 10;
pub const WT_STRUCT_END: u8 = 11;
pub const WT_ZERO_TAG: u8 = 12;
pub const WT_BYTE_ARRAY: u8 = 13;

fn need(buf: &[u8], offset: usize, n: usize) -> Result<()> {
    if buf.len() < offset + n {
        Err(Error::ShortBuffer {
            offset,
            needed: n,
            available: buf.len().saturating_sub(offset),
        })
    } else {
        Ok(())
    }
}

/// Writes a tagged value: header + body, choosing the wire type by value
/// shape and (for `Int`) by magnitude (the narrowing policy below).
pub fn write_tagged(out: &mut Vec<u8>, field_id: u8, value: &Value) -> Result<()> {
    match value {
        Value::Byte(b) => write_byte(out, field_id, *b),
        Value::Bool(v) => write_byte(out, field_id, if *v { 1 } else { 0 }),
        Value::Int(v) => write_int(out, field_id, *v),
        Value::Float(v) => {
            write_header(out, field_id, WT_FLOAT32)?;
            let mut buf = [0u8; 4];
            BigEndian::write_f32(&mut buf, *v);
            out.extend_from_slice(&buf);
            Ok(())
        }
        Value::Double(v) => {
            write_header(out, field_id, WT_FLOAT64)?;
            let mut buf = [0u8; 8];
            BigEndian::write_f64(&mut buf, *v);
            out.extend_from_slice(&buf);
            Ok(())
        }
        Value::Str(s) => write_string(out, field_id, s),
        Value::Bytes(b) => write_bytes_value(out, field_id, b),
        Value::Map(m) => write_map(out, field_id, m),
        Value::List(l) => write_list(out, field_id, l),
        Value::Struct(fields) => write_struct(out, field_id, fields),
    }
}

/// Encodes a byte field. Zero-byte elision: a `0x00` payload is
/// emitted as a zero-tag header with no body.
pub fn write_byte(out: &mut Vec<u8>, field_id: u8, value: i8) -> Result<()> {
    if value == 0 {
        write_header(out, field_id, WT_ZERO_TAG)
    } else {
        write_header(out, field_id, WT_BYTE)?;
        out.push(value as u8);
        Ok(())
    }
}

/// Encodes an integer using the smallest width that holds it.
pub fn write_int(out: &mut Vec<u8>, field_id: u8, value: i64) -> Result<()> {
    if (-128..=127).contains(&value) {
        write_byte(out, field_id, value as i8)
    } else if (-32768..=32767).contains(&value) {
        write_header(out, field_id, WT_INT16)?;
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, value as i16);
        out.extend_from_slice(&buf);
        Ok(())
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
        write_header(out, field_id, WT_INT32)?;
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, value as i32);
        out.extend_from_slice(&buf);
        Ok(())
    } else {
        write_header(out, field_id, WT_INT64)?;
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, value);
        out.extend_from_slice(&buf);
        Ok(())
    }
}

/// Encodes a string, selecting short- vs long-string by UTF-8 byte length.
pub fn write_string(out: &mut Vec<u8>, field_id: u8, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() < 256 {
        write_header(out, field_id, WT_SHORT_STRING)?;
        out.push(bytes.len() as u8);
    } else {
        write_header(out, field_id, WT_LONG_STRING)?;
        let mut len_buf = [0u8; 4];
        BigEndian::write_u32(&mut len_buf, bytes.len() as u32);
        out.extend_from_slice(&len_buf);
    }
    out.extend_from_slice(bytes);
    Ok(())
}

/// Encodes a byte-array field (wire type 13): an inner `0x00` header, a
/// tagged length at field id 0, then raw bytes.
pub fn write_bytes_value(out: &mut Vec<u8>, field_id: u8, value: &[u8]) -> Result<()> {
    write_header(out, field_id, WT_BYTE_ARRAY)?;
    write_header(out, 0, WT_BYTE)?;
    write_int(out, 0, value.len() as i64)?;
    out.extend_from_slice(value);
    Ok(())
}

/// Encodes a map: header, a tagged count at field id 0, then `N`
/// `(key@0, value@1)` pairs.
pub fn write_map(out: &mut Vec<u8>, field_id: u8, entries: &[(Value, Value)]) -> Result<()> {
    write_header(out, field_id, WT_MAP)?;
    write_int(out, 0, entries.len() as i64)?;
    for (k, v) in entries {
        write_tagged(out, 0, k)?;
        write_tagged(out, 1, v)?;
    }
    Ok(())
}

/// Encodes a list: header, a tagged count at field id 0, then `N` items
/// each tagged at field id 0.
pub fn write_list(out: &mut Vec<u8>, field_id: u8, items: &[Value]) -> Result<()> {
    write_header(out, field_id, WT_LIST)?;
    write_int(out, 0, items.len() as i64)?;
    for item in items {
        write_tagged(out, 0, item)?;
    }
    Ok(())
}

/// Encodes a nested struct: struct-start header, the fields (each a tagged
/// value in ascending field id), struct-end header. Top-level structs are
/// NOT wrapped this way — only nested ones.
pub fn write_struct(out: &mut Vec<u8>, field_id: u8, fields: &crate::value::FieldBag) -> Result<()> {
    write_header(out, field_id, WT_STRUCT_START)?;
    for (id, value) in fields {
        write_tagged(out, *id, value)?;
    }
    write_header(out, field_id, WT_STRUCT_END)?;
    Ok(())
}

/// A body decoder for one wire-type code: given the buffer and the offset
/// just past the header, returns `(value, bytes_consumed)`.
pub type BodyDecoder = fn(&[u8], usize) -> Result<(Value, usize)>;

fn decode_byte(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 1)?;
    Ok((Value::Byte(buf[offset] as i8), 1))
}

fn decode_int16(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 2)?;
    let v = BigEndian::read_i16(&buf[offset..offset + 2]);
    Ok((Value::Int(v as i64), 2))
}

fn decode_int32(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 4)?;
    let v = BigEndian::read_i32(&buf[offset..offset + 4]);
    Ok((Value::Int(v as i64), 4))
}

fn decode_int64(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 8)?;
    let v = BigEndian::read_i64(&buf[offset..offset + 8]);
    Ok((Value::Int(v), 8))
}

fn decode_float32(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 4)?;
    let v = BigEndian::read_f32(&buf[offset..offset + 4]);
    Ok((Value::Float(v), 4))
}

fn decode_float64(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 8)?;
    let v = BigEndian::read_f64(&buf[offset..offset + 8]);
    Ok((Value::Double(v), 8))
}

fn decode_short_string(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 1)?;
    let len = buf[offset] as usize;
    need(buf, offset + 1, len)?;
    let s = String::from_utf8_lossy(&buf[offset + 1..offset + 1 + len]).into_owned();
    Ok((Value::Str(s), 1 + len))
}

fn decode_long_string(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    need(buf, offset, 4)?;
    let len = BigEndian::read_u32(&buf[offset..offset + 4]) as usize;
    need(buf, offset + 4, len)?;
    let s = String::from_utf8_lossy(&buf[offset + 4..offset + 4 + len]).into_owned();
    Ok((Value::Str(s), 4 + len))
}

fn decode_map(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    let mut pos = offset;
    let (cf, cw, ch) = read_header(buf, pos)?;
    let (count_value, cb) = read_body(buf, pos + ch, cw, cf)?;
    pos += ch + cb;
    let count = int_value(&count_value)?;
    if count < 0 {
        return Err(Error::InvalidLength {
            offset: pos,
            length: count,
        });
    }
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if pos >= buf.len() {
            return Err(Error::Truncated {
                offset: pos,
                expected: (count as usize - entries.len()) * 2,
            });
        }
        let (kf, kw, kh) = read_header(buf, pos)?;
        let (key, kb) = read_body(buf, pos + kh, kw, kf)?;
        pos += kh + kb;
        let (vf, vw, vh) = read_header(buf, pos)?;
        let (val, vb) = read_body(buf, pos + vh, vw, vf)?;
        pos += vh + vb;
        entries.push((key, val));
    }
    Ok((Value::Map(entries), pos - offset))
}

fn decode_list(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    let mut pos = offset;
    let (cf, cw, ch) = read_header(buf, pos)?;
    let (count_value, cb) = read_body(buf, pos + ch, cw, cf)?;
    pos += ch + cb;
    let count = int_value(&count_value)?;
    if count < 0 {
        return Err(Error::InvalidLength {
            offset: pos,
            length: count,
        });
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if pos >= buf.len() {
            return Err(Error::Truncated {
                offset: pos,
                expected: count as usize - items.len(),
            });
        }
        let (f, w, h) = read_header(buf, pos)?;
        let (item, b) = read_body(buf, pos + h, w, f)?;
        pos += h + b;
        items.push(item);
    }
    Ok((Value::List(items), pos - offset))
}

fn decode_struct_start(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    let (bag, n) = read_struct_body(buf, offset)?;
    Ok((Value::Struct(bag), n))
}

fn decode_zero_tag(_buf: &[u8], _offset: usize) -> Result<(Value, usize)> {
    Ok((Value::Byte(0), 0))
}

fn decode_byte_array(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    let (inner_field, inner_wire, header_len) = read_header(buf, offset)?;
    if inner_field != 0 || inner_wire != WT_BYTE {
        return Err(Error::TypeMismatch {
            field_id: 0,
            expected: "byte-array inner header",
            actual: "other",
        });
    }
    let mut pos = offset + header_len;
    let (lf, lw, lh) = read_header(buf, pos)?;
    let (len_value, lb) = read_body(buf, pos + lh, lw, lf)?;
    pos += lh + lb;
    let length = int_value(&len_value)?;
    if length < 0 {
        return Err(Error::InvalidLength {
            offset: pos,
            length,
        });
    }
    let length = length as usize;
    need(buf, pos, length)?;
    let data = buf[pos..pos + length].to_vec();
    pos += length;
    Ok((Value::Bytes(data), pos - offset))
}

/// Unwraps a tagged integer count (byte or wider) into an `i64`.
fn int_value(value: &Value) -> Result<i64> {
    match value {
        Value::Byte(b) => Ok(*b as i64),
        Value::Int(i) => Ok(*i),
        other => Err(Error::TypeMismatch {
            field_id: 0,
            expected: "int",
            actual: other.kind_name(),
        }),
    }
}

/// The mapping from wire-type code to body decoder. Struct schemas may
/// override any entry; `decode_raw` and nested decoding use
/// `WireTypeTable::default()` unless a schema-specific table is threaded
/// through.
#[derive(Clone)]
pub struct WireTypeTable(BTreeMap<u8, BodyDecoder>);

impl Default for WireTypeTable {
    fn default() -> Self {
        let mut map: BTreeMap<u8, BodyDecoder> = BTreeMap::new();
        map.insert(WT_BYTE, decode_byte);
        map.insert(WT_INT16, decode_int16);
        map.insert(WT_INT32, decode_int32);
        map.insert(WT_INT64, decode_int64);
        map.insert(WT_FLOAT32, decode_float32);
        map.insert(WT_FLOAT64, decode_float64);
        map.insert(WT_SHORT_STRING, decode_short_string);
        map.insert(WT_LONG_STRING, decode_long_string);
        map.insert(WT_MAP, decode_map);
        map.insert(WT_LIST, decode_list);
        map.insert(WT_STRUCT_START, decode_struct_start);
        map.insert(WT_ZERO_TAG, decode_zero_tag);
        map.insert(WT_BYTE_ARRAY, decode_byte_array);
        Self(map)
    }
}

impl WireTypeTable {
    /// Substitutes the decoder used for one wire-type code, letting a
    /// struct schema override any entry.
    pub fn with_override(mut self, wire_type: u8, decoder: BodyDecoder) -> Self {
        self.0.insert(wire_type, decoder);
        self
    }

    pub fn dispatch(&self, wire_type: u8, field_id: u8, buf: &[u8], offset: usize) -> Result<(Value, usize)> {
        match self.0.get(&wire_type) {
            Some(decoder) => decoder(buf, offset),
            None => Err(Error::UnknownWireType {
                field_id: field_id as u16,
                wire_type,
            }),
        }
    }
}

/// Reads the body following a header of the given wire type, using the
/// default wire-type table. Returns `(value, bytes_consumed)`;
/// consumption does not include the header, which the caller has already
/// read. `WT_STRUCT_END` is never passed here — the struct decoder treats
/// it as a sentinel before reaching the body.
pub fn read_body(buf: &[u8], offset: usize, wire_type: u8, field_id: u8) -> Result<(Value, usize)> {
    thread_local! {
        static DEFAULT_TABLE: WireTypeTable = WireTypeTable::default();
    }
    DEFAULT_TABLE.with(|table| table.dispatch(wire_type, field_id, buf, offset))
}

/// Reads the body of a nested struct: tagged fields until a struct-end
/// header is seen. An unterminated struct at buffer end is a hard error.
pub fn read_struct_body(buf: &[u8], offset: usize) -> Result<(crate::value::FieldBag, usize)> {
    read_struct_body_with(buf, offset, &WireTypeTable::default())
}

/// As `read_struct_body`, but dispatching wire-type codes through a
/// caller-supplied table (used when a schema overrides the default table).
pub fn read_struct_body_with(
    buf: &[u8],
    offset: usize,
    table: &WireTypeTable,
) -> Result<(crate::value::FieldBag, usize)> {
    let mut pos = offset;
    let mut bag = crate::value::FieldBag::new();
    loop {
        if pos >= buf.len() {
            return Err(Error::Truncated {
                offset: pos,
                expected: 1,
            });
        }
        let (field_id, wire_type, header_len) = read_header(buf, pos)?;
        if wire_type == WT_STRUCT_END {
            pos += header_len;
            break;
        }
        let (value, body_len) = table.dispatch(wire_type, field_id, buf, pos + header_len)?;
        if bag.insert(field_id, value).is_some() {
            log::warn!("duplicate field id {field_id} in struct payload; last value wins");
        }
        pos += header_len + body_len;
    }
    Ok((bag, pos - offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_byte_elision() {
        let mut buf = Vec::new();
        write_byte(&mut buf, 1, 0).unwrap();
        assert_eq!(buf, vec![0x1C]);
        let (field_id, wire_type, header_len) = read_header(&buf, 0).unwrap();
        assert_eq!((field_id, wire_type), (1, WT_ZERO_TAG));
        let (value, consumed) = read_body(&buf, header_len, wire_type, field_id).unwrap();
        assert_eq!(value, Value::Byte(0));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn nonzero_byte_field() {
        let mut buf = Vec::new();
        write_byte(&mut buf, 1, -16).unwrap();
        assert_eq!(buf, vec![0x10, 0xF0]);
    }

    #[test]
    fn int_narrowing_is_minimal() {
        let cases: &[(i64, u8)] = &[
            (127, WT_BYTE),
            (-128, WT_BYTE),
            (128, WT_INT16),
            (-32768, WT_INT16),
            (32768, WT_INT32),
            (-2147483648, WT_INT32),
            (2147483648, WT_INT64),
            (123123123123123123, WT_INT64),
        ];
        for &(value, expected_wire_type) in cases {
            let mut buf = Vec::new();
            write_int(&mut buf, 1, value).unwrap();
            let (_, wire_type, header_len) = read_header(&buf, 0).unwrap();
            assert_eq!(wire_type, expected_wire_type, "value {value}");
            let (decoded, _) = read_body(&buf, header_len, wire_type, 1).unwrap();
            assert_eq!(decoded, Value::Int(value));
        }
    }

    #[test]
    fn short_string_vector() {
        let mut buf = Vec::new();
        write_string(&mut buf, 1, "Hello").unwrap();
        assert_eq!(buf, vec![0x16, 0x05, b'H', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn long_string_vector() {
        let mut buf = Vec::new();
        write_string(&mut buf, 1, &"Hello".repeat(100)).unwrap();
        assert_eq!(&buf[0..5], &[0x17, 0x00, 0x00, 0x01, 0xF4]);
        assert_eq!(buf.len(), 5 + 500);
    }

    #[test]
    fn map_round_trip() {
        let entries = vec![
            (Value::Str("one".into()), Value::Str("foo".into())),
            (Value::Str("two".into()), Value::Str("bar".into())),
        ];
        let mut buf = Vec::new();
        write_map(&mut buf, 1, &entries).unwrap();
        let expected = hex("18 00 02 06 03 6F 6E 65 16 03 66 6F 6F 06 03 74 77 6F 16 03 62 61 72");
        assert_eq!(buf, expected);

        let (_, wire_type, header_len) = read_header(&buf, 0).unwrap();
        let (decoded, consumed) = read_body(&buf, header_len, wire_type, 1).unwrap();
        assert_eq!(consumed, buf.len() - header_len);
        assert_eq!(decoded, Value::Map(entries));
    }

    #[test]
    fn byte_array_round_trip() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut buf = Vec::new();
        write_bytes_value(&mut buf, 1, &data).unwrap();
        let (_, wire_type, header_len) = read_header(&buf, 0).unwrap();
        let (decoded, consumed) = read_body(&buf, header_len, wire_type, 1).unwrap();
        assert_eq!(consumed, buf.len() - header_len);
        assert_eq!(decoded, Value::Bytes(data));
    }

    #[test]
    fn empty_byte_array_round_trip() {
        let mut buf = Vec::new();
        write_bytes_value(&mut buf, 1, &[]).unwrap();
        let (_, wire_type, header_len) = read_header(&buf, 0).unwrap();
        let (decoded, _) = read_body(&buf, header_len, wire_type, 1).unwrap();
        assert_eq!(decoded, Value::Bytes(vec![]));
    }

    #[test]
    fn nested_struct_requires_terminator() {
        // struct-start with no struct-end before the buffer runs out.
        let mut buf = Vec::new();
        write_header(&mut buf, 1, WT_STRUCT_START).unwrap();
        write_byte(&mut buf, 1, 5).unwrap();
        assert!(matches!(
            read_struct_body(&buf, 1),
            Err(Error::Truncated { .. })
        ));
    }

    fn hex(s: &str) -> Vec<u8> {
        s.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).unwrap())
            .collect()
    }
}
