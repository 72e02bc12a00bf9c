//! # Channelwire Serde
//! Bit-level serialization used by the channelwire connection layer.
//!
//! A single `ser` routine per structure serves two stream roles: writing into a
//! [`BitWriter`] and measuring with a [`BitCounter`]. Reading goes through a
//! [`BitReader`], where every read is fallible since packets are untrusted input.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_reader;
mod bit_writer;
mod check;
mod constants;
mod error;
mod impls;
mod integer;
mod ranged;
mod serde;

pub use bit_reader::BitReader;
pub use bit_writer::{BitCounter, BitWrite, BitWriter};
pub use check::{de_check, ser_check, SERDE_CHECK_VALUE};
pub use constants::{MTU_SIZE_BITS, MTU_SIZE_BYTES};
pub use error::SerdeErr;
pub use integer::{
    SerdeInteger, SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};
pub use ranged::{bits_required, de_ranged, ser_ranged};
pub use serde::{ConstBitLength, Serde};
