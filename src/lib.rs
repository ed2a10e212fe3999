//! # evesbms
//!
//! This crate provides a frame-level codec for the CAN telemetry broadcast
//! by EVES battery modules: balancing state, cell voltage groups,
//! temperature groups and the pack-wide aggregate messages.
//!
//! Every frame carries six data bytes followed by a big-endian CRC-16-CCITT
//! trailer. Decoding verifies the checksum before anything else; encoding is
//! infallible and seals the trailer itself. Two identifier dialects are in
//! the field, see [`protocol::ProtocolVariant`].
//!
//! ## Features
//!
//! This crate uses a feature-based system to keep dependencies minimal.
//!
//! - `serde`: Enables `serde` support for serializing/deserializing frames
//!   and decoded messages.

/// Contains error types for the library.
mod error;

/// CRC-16 checksum engine shared by all frames.
mod crc;

/// Field-level value codecs.
pub mod fields;

/// Frame builders and decoders for the telemetry bus.
pub mod protocol;

pub use crc::{calculate_crc16, is_crc_valid};
pub use error::Error;
