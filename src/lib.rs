//! A library for encoding and decoding values in the JCE tagged binary wire
//! format — a tagged, self-describing, field-numbered format in the
//! Thrift/Protocol Buffers family.
//!
//! The codec engine (header, primitive and composite wire codecs, value
//! coercion, schema model, struct encoder/decoder, and the top-level API) is
//! the crate's core. Schema declaration can go through the [`schema::Schema`]
//! builder directly, or through the `#[derive(Jce)]` macro re-exported here.

pub mod codec;
pub mod error;
pub mod header;
pub mod schema;
pub mod value;
pub mod wire;

pub use codec::{decode, decode_list, decode_raw, encode, Decodable, Encodable};
pub use error::{Error, Result};
pub use jce_macro::Jce;
pub use schema::{Field, Schema};
pub use value::{ExtraMap, FieldBag, Value};
