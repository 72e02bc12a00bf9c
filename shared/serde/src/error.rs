use thiserror::Error;

/// Any failure while reading from or writing to a bit stream: reading past the
/// end of the buffer, a value outside its declared range, non-zero padding, a
/// failed check value, or a writer that ran past its byte bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit stream serialization failed")]
pub struct SerdeErr;
