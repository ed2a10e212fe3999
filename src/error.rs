/// Errors reported by the frame decoders.
///
/// Encoding never fails: out-of-range physical values wrap or saturate as
/// documented on the individual field codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The checksum trailer of a received frame does not match the CRC-16
    /// recomputed over its data bytes. Nothing was decoded.
    #[error("CRC mismatch - calculated={calculated:#06x} received={received:#06x}")]
    Checksum { calculated: u16, received: u16 },
    /// The identifier is neither a fixed pack-aggregate identifier nor
    /// inside the per-module telemetry window `0x6000..=0x6FFF`.
    #[error("unknown message identifier {0:#06x}")]
    UnknownId(u32),
    /// The identifier is a per-module one, but its message-type byte maps
    /// to no message kind under the selected protocol variant.
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),
    /// A kind-specific decoder was handed a valid frame of a different
    /// message kind.
    #[error("frame {0:#06x} does not carry the requested message kind")]
    UnexpectedMessage(u32),
}
