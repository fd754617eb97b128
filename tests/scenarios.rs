//! End-to-end wire-format scenarios and the additional edge cases around
//! header overflow, integer narrowing, string width selection, struct
//! round-tripping with extras, and map encoding.

use std::sync::OnceLock;

use jcewire::schema::Schema;
use jcewire::value::{ExtraMap, FieldBag};
use jcewire::wire::{WT_INT32, WT_SHORT_STRING};
use jcewire::{decode, decode_raw, encode, Decodable, Encodable, Error, Value};

fn hex(s: &str) -> Vec<u8> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).unwrap())
        .collect()
}

#[test]
fn scenario_a_header_small_id() {
    let mut buf = Vec::new();
    jcewire::header::write_header(&mut buf, 1, 0).unwrap();
    assert_eq!(buf, hex("10"));
    assert_eq!(jcewire::header::read_header(&buf, 0).unwrap(), (1, 0, 1));
}

#[test]
fn scenario_b_header_overflow_id() {
    let mut buf = Vec::new();
    jcewire::header::write_header(&mut buf, 0xAA, 0).unwrap();
    assert_eq!(buf, hex("F0 AA"));
    assert_eq!(
        jcewire::header::read_header(&buf, 0).unwrap(),
        (0xAA, 0, 2)
    );
}

#[test]
fn scenario_c_byte_field() {
    let mut buf = Vec::new();
    jcewire::wire::write_byte(&mut buf, 1, -16).unwrap();
    assert_eq!(buf, hex("10 F0"));

    let mut zero_buf = Vec::new();
    jcewire::wire::write_byte(&mut zero_buf, 1, 0).unwrap();
    assert_eq!(zero_buf, hex("1C"));
}

#[test]
fn scenario_d_int_narrowing() {
    let cases: &[(&str, i64)] = &[
        ("10 7F", 127),
        ("11 80 00", -32768),
        ("12 80 00 00 00", -2147483648),
        ("13 01 B5 6B D4 01 63 F3 B3", 123123123123123123),
    ];
    for (expected_hex, value) in cases {
        let mut buf = Vec::new();
        jcewire::wire::write_int(&mut buf, 1, *value).unwrap();
        assert_eq!(buf, hex(expected_hex), "value {value}");
    }
}

#[test]
fn scenario_e_string_widths() {
    let mut short = Vec::new();
    jcewire::wire::write_string(&mut short, 1, "Hello").unwrap();
    assert_eq!(short, hex("16 05 48 65 6C 6C 6F"));

    let mut long = Vec::new();
    jcewire::wire::write_string(&mut long, 1, &"Hello".repeat(100)).unwrap();
    assert_eq!(&long[0..5], &hex("17 00 00 01 F4")[..]);
    assert_eq!(&long[5..], "Hello".repeat(100).as_bytes());
}

struct Endpoint {
    server: String,
    port: i64,
    location: String,
    extra: String,
    extra_default: String,
}

fn endpoint_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::new()
            .field("server", 1, WT_SHORT_STRING)
            .field("port", 2, WT_INT32)
            .field("location", 8, WT_SHORT_STRING)
            .non_wire_field("extra", Value::Str(String::new()))
            .non_wire_field("extra_default", Value::Str("extra_default".into()))
            .build()
            .unwrap()
    })
}

impl Encodable for Endpoint {
    fn schema() -> &'static Schema {
        endpoint_schema()
    }

    fn field_value(&self, field_id: u8) -> Option<Value> {
        match field_id {
            1 => Some(Value::Str(self.server.clone())),
            2 => Some(Value::Int(self.port)),
            8 => Some(Value::Str(self.location.clone())),
            _ => None,
        }
    }
}

impl Decodable for Endpoint {
    fn schema() -> &'static Schema {
        endpoint_schema()
    }

    fn from_fields(mut fields: FieldBag, mut extras: ExtraMap) -> jcewire::Result<Self> {
        let server = match fields.remove(&1) {
            Some(Value::Str(s)) => s,
            _ => return Err(Error::MissingField("server".into(), 1)),
        };
        let port = match fields.remove(&2) {
            Some(Value::Int(i)) => i,
            _ => return Err(Error::MissingField("port".into(), 2)),
        };
        let location = match fields.remove(&8) {
            Some(Value::Str(s)) => s,
            _ => return Err(Error::MissingField("location".into(), 8)),
        };
        let extra = match extras.remove("extra") {
            Some(Value::Str(s)) => s,
            _ => return Err(Error::MissingField("extra".into(), 0)),
        };
        let extra_default = match extras.remove("extra_default") {
            Some(Value::Str(s)) => s,
            _ => return Err(Error::MissingField("extra_default".into(), 0)),
        };
        Ok(Endpoint {
            server,
            port,
            location,
            extra,
            extra_default,
        })
    }
}

#[test]
fn scenario_f_end_to_end_struct_with_extras() {
    let endpoint = Endpoint {
        server: "rcnb".into(),
        port: 8000,
        location: "rcnb".into(),
        extra: String::new(),
        extra_default: String::new(),
    };
    let bytes = encode(&endpoint).unwrap();
    assert_eq!(
        bytes,
        hex("16 04 72 63 6E 62 21 1F 40 86 04 72 63 6E 62")
    );

    let mut extras = ExtraMap::new();
    extras.insert("extra".to_string(), Value::Str("xxx".to_string()));
    let decoded: Endpoint = decode(&bytes, Some(extras)).unwrap();
    assert_eq!(decoded.server, "rcnb");
    assert_eq!(decoded.port, 8000);
    assert_eq!(decoded.location, "rcnb");
    assert_eq!(decoded.extra, "xxx");
    assert_eq!(decoded.extra_default, "extra_default");
}

#[test]
fn scenario_g_map() {
    let mut buf = Vec::new();
    let entries = vec![
        (Value::Str("one".into()), Value::Str("foo".into())),
        (Value::Str("two".into()), Value::Str("bar".into())),
    ];
    jcewire::wire::write_map(&mut buf, 1, &entries).unwrap();
    assert_eq!(
        buf,
        hex("18 00 02 06 03 6F 6E 65 16 03 66 6F 6F 06 03 74 77 6F 16 03 62 61 72")
    );
}

#[test]
fn invariant_2_reencoding_decode_raw_is_stable() {
    let bytes = hex("16 04 72 63 6E 62 21 1F 40 86 04 72 63 6E 62");
    let bag = decode_raw(&bytes).unwrap();
    let mut reencoded = Vec::new();
    for (field_id, value) in &bag {
        jcewire::wire::write_tagged(&mut reencoded, *field_id, value).unwrap();
    }
    let reencoded_bag = decode_raw(&reencoded).unwrap();
    assert_eq!(bag, reencoded_bag);
}

#[test]
fn decode_raw_on_empty_buffer_is_an_empty_bag_not_an_error() {
    assert!(decode_raw(&[]).unwrap().is_empty());
}

#[test]
fn unterminated_nested_struct_is_a_hard_error() {
    let mut buf = Vec::new();
    jcewire::header::write_header(&mut buf, 1, jcewire::wire::WT_STRUCT_START).unwrap();
    jcewire::wire::write_byte(&mut buf, 1, 9).unwrap();
    assert!(matches!(
        jcewire::wire::read_struct_body(&buf, 1),
        Err(Error::Truncated { .. })
    ));
}

#[test]
fn unknown_wire_type_is_reported_with_field_context() {
    let buf = hex("1E");
    let result = decode_raw(&buf);
    assert!(matches!(
        result,
        Err(Error::UnknownWireType {
            field_id: 1,
            wire_type: 14
        })
    ));
}
