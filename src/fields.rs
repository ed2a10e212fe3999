//! Field-level codecs shared by the message layer.
//!
//! Cell voltages travel in a 14-bit sub-byte packing, temperatures as a
//! single offset byte, cell indexes and pack voltages as plain big-endian
//! words. Encoding is total: values outside a field's wire range wrap or
//! saturate as documented on the owning type, they never error.

use std::ops::Deref;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single cell voltage in millivolts.
///
/// On the wire this is a 14-bit quantity split over two bytes: the first
/// carries the low eight bits, the second the remaining six. Values above
/// [`Self::MAX`] lose their upper bits when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellVoltage(u16);

impl CellVoltage {
    /// Smallest encodable voltage in millivolts.
    pub const MIN: u16 = 0;
    /// Largest voltage the 14-bit packing can carry, in millivolts.
    pub const MAX: u16 = 0x3FFF;

    pub fn new(millivolts: u16) -> Self {
        Self(millivolts)
    }

    /// Packs the voltage into its two wire bytes, low byte first.
    pub fn encode(self) -> [u8; 2] {
        [self.0 as u8, ((self.0 >> 8) & 0x3F) as u8]
    }

    /// Unpacks a voltage from its two wire bytes, low byte first.
    ///
    /// The two padding bits of the second byte are ignored.
    pub fn decode(bytes: [u8; 2]) -> Self {
        Self(u16::from(bytes[0]) | ((u16::from(bytes[1]) & 0x3F) << 8))
    }

    /// The voltage in volts.
    pub fn to_volts(self) -> f32 {
        f32::from(self.0) / 1000.0
    }
}

impl Deref for CellVoltage {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<CellVoltage> for u16 {
    fn from(value: CellVoltage) -> Self {
        value.0
    }
}

/// A temperature in whole degrees Celsius.
///
/// The wire format is one byte holding the temperature shifted up by 40,
/// which covers [`Self::MIN`] through [`Self::MAX`]. Encoding saturates
/// to that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Temperature(i16);

impl Temperature {
    /// Coldest encodable temperature in degrees Celsius.
    pub const MIN: i16 = -40;
    /// Hottest encodable temperature in degrees Celsius.
    pub const MAX: i16 = 215;

    const OFFSET: i16 = 40;

    pub fn new(celsius: i16) -> Self {
        Self(celsius)
    }

    /// Packs the temperature into its single wire byte.
    pub fn encode(self) -> u8 {
        (i32::from(self.0) + i32::from(Self::OFFSET)).clamp(0x00, 0xFF) as u8
    }

    /// Unpacks a temperature from its single wire byte.
    pub fn decode(byte: u8) -> Self {
        Self(i16::from(byte) - Self::OFFSET)
    }
}

impl Deref for Temperature {
    type Target = i16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Temperature> for i16 {
    fn from(value: Temperature) -> Self {
        value.0
    }
}

/// A cell position inside the pack, as carried by the aggregate messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellIndex(u16);

impl CellIndex {
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    /// Packs the index into its two big-endian wire bytes.
    pub fn encode(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Unpacks an index from its two big-endian wire bytes.
    pub fn decode(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

impl Deref for CellIndex {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<CellIndex> for u16 {
    fn from(value: CellIndex) -> Self {
        value.0
    }
}

/// A pack voltage in tenths of a volt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackVoltage(u16);

impl PackVoltage {
    pub fn new(decivolts: u16) -> Self {
        Self(decivolts)
    }

    /// Packs the voltage into its two big-endian wire bytes.
    pub fn encode(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Unpacks a voltage from its two big-endian wire bytes.
    pub fn decode(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// The voltage in volts.
    pub fn to_volts(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl Deref for PackVoltage {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<PackVoltage> for u16 {
    fn from(value: PackVoltage) -> Self {
        value.0
    }
}

/// One decoded cell voltage together with its pack-wide cell number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellReading {
    /// Zero-based cell number within the pack.
    pub cell: u16,
    /// Measured voltage in millivolts.
    pub millivolts: u16,
}
