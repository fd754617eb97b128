/// Error kinds surfaced by the codec engine.
///
/// Every variant that has a natural byte offset or field-id/wire-type
/// context carries it, so a caller can log or report without re-deriving
/// it from the raw bytes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("buffer too short at offset {offset}: needed {needed}, had {available}")]
    ShortBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown wire type {wire_type} at field {field_id}")]
    UnknownWireType { field_id: u16, wire_type: u8 },

    #[error("could not infer a wire type for host value")]
    UnknownType,

    #[error("type mismatch for field {field_id}: expected {expected}, got {actual}")]
    TypeMismatch {
        field_id: u16,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid field id {0}")]
    InvalidFieldId(i64),

    #[error("invalid length {length} at offset {offset}")]
    InvalidLength { offset: usize, length: i64 },

    #[error("truncated container: expected {expected} more byte(s) at offset {offset}")]
    Truncated { offset: usize, expected: usize },

    #[error("missing required field {0:?} (id {1})")]
    MissingField(String, u8),
}

pub type Result<T> = std::result::Result<T, Error>;
