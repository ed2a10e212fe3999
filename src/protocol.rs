//! Frame builders and decoders for the battery module telemetry bus.

use crate::crc::{calculate_crc16, is_crc_valid, CRC_LENGTH};
use crate::fields::{CellIndex, CellReading, CellVoltage, PackVoltage, Temperature};
use crate::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of bytes in every frame, checksum trailer included.
pub const FRAME_LENGTH: usize = 8;
/// Number of data bytes preceding the checksum trailer.
pub const DATA_LENGTH: usize = FRAME_LENGTH - CRC_LENGTH;
/// Highest temperature group number a module broadcasts.
pub const MAX_TEMPERATURE_GROUP: u8 = 2;

const MODULE_WINDOW_BASE: u32 = 0x6000;
const MODULE_WINDOW_END: u32 = 0x6FFF;

const TYPE_BALANCING: u8 = 0x01;
const TYPE_CELL_GROUP_BASE: u8 = 0x02;
const TYPE_TEMPERATURE_TOP: u8 = 0x0F;

// The extended dialect spreads cell groups over the type byte's nibbles,
// twelve groups per high-nibble bank.
const GROUPS_PER_BANK: u8 = 12;

const PAD_BYTE: u8 = 0xFF;

macro_rules! read_bit {
    ($value:expr,$position:expr) => {
        ($value >> $position) & 1 != 0
    };
}

/// The identifier dialect spoken by the module firmware.
///
/// Two firmware generations share the frame layouts but disagree on how
/// module numbers and cell groups map into the identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProtocolVariant {
    /// Wire module numbers are offset by one and cell groups spread over
    /// both nibbles of the type byte, addressing up to 166 groups.
    #[default]
    Extended,
    /// Wire module numbers are used as-is and cell groups occupy eight
    /// consecutive type bytes.
    Compact,
}

impl ProtocolVariant {
    /// Highest module number this dialect can address.
    pub fn max_module(self) -> u8 {
        match self {
            Self::Extended => 14,
            Self::Compact => 15,
        }
    }

    /// Highest cell voltage group number this dialect can address.
    pub fn max_cell_group(self) -> u8 {
        match self {
            Self::Extended => 165,
            Self::Compact => 7,
        }
    }

    /// Wire module number broadcast for a logical module number.
    pub fn wire_module(self, module: u8) -> u8 {
        debug_assert!(module <= self.max_module());
        match self {
            Self::Extended => module + 1,
            Self::Compact => module,
        }
    }

    /// Logical module number behind a received wire module number.
    pub fn module(self, wire_module: u8) -> u8 {
        match self {
            // Wire module 0 never appears in this dialect; decoding it wraps.
            Self::Extended => wire_module.wrapping_sub(1),
            Self::Compact => wire_module,
        }
    }

    /// Message type byte carrying the given cell voltage group.
    pub fn cell_group_message_type(self, group: u8) -> u8 {
        debug_assert!(group <= self.max_cell_group());
        match self {
            Self::Extended => {
                ((group / GROUPS_PER_BANK) << 4) + TYPE_CELL_GROUP_BASE + group % GROUPS_PER_BANK
            }
            Self::Compact => TYPE_CELL_GROUP_BASE + group,
        }
    }

    /// Cell voltage group carried by a message type byte, if any.
    pub fn cell_group(self, message_type: u8) -> Option<u8> {
        match self {
            Self::Extended => {
                let bank = message_type >> 4;
                let slot = message_type & 0x0F;
                if !(TYPE_CELL_GROUP_BASE..=TYPE_CELL_GROUP_BASE + GROUPS_PER_BANK - 1)
                    .contains(&slot)
                {
                    return None;
                }
                // Type 0x0D belongs to temperature group 2, not to cell
                // group 11 of bank 0.
                if bank == 0 && slot == TYPE_CELL_GROUP_BASE + GROUPS_PER_BANK - 1 {
                    return None;
                }
                let group = bank * GROUPS_PER_BANK + slot - TYPE_CELL_GROUP_BASE;
                (group <= self.max_cell_group()).then_some(group)
            }
            Self::Compact => (TYPE_CELL_GROUP_BASE..=TYPE_CELL_GROUP_BASE + self.max_cell_group())
                .contains(&message_type)
                .then(|| message_type - TYPE_CELL_GROUP_BASE),
        }
    }

    /// Message type byte carrying the given temperature group.
    ///
    /// Temperature groups count downwards from the top of the type space
    /// and are shared by both dialects.
    pub fn temperature_group_message_type(self, group: u8) -> u8 {
        debug_assert!(group <= MAX_TEMPERATURE_GROUP);
        TYPE_TEMPERATURE_TOP - group
    }

    /// Temperature group carried by a message type byte, if any.
    pub fn temperature_group(self, message_type: u8) -> Option<u8> {
        ((TYPE_TEMPERATURE_TOP - MAX_TEMPERATURE_GROUP)..=TYPE_TEMPERATURE_TOP)
            .contains(&message_type)
            .then(|| TYPE_TEMPERATURE_TOP - message_type)
    }
}

/// A frame identifier.
///
/// Per-module telemetry lives in the window `0x6000..=0x6FFF`, with the
/// wire module number in bits 8 to 11 and the message type in the low
/// byte. Pack-level aggregates use fixed identifiers outside the window.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageId(u32);

impl MessageId {
    /// Pack voltage summary broadcast.
    pub const PACK_VOLTAGES: Self = Self(0x8000);
    /// Pack cell statistics broadcast.
    pub const PACK_CELL_STATS: Self = Self(0x8010);
    /// Pack temperature summary broadcast.
    pub const PACK_TEMPERATURES: Self = Self(0x8020);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Composes a per-module telemetry identifier.
    ///
    /// Wire module numbers above 15 push the result out of the telemetry
    /// window; composition does not police them.
    pub fn module(wire_module: u8, message_type: u8) -> Self {
        Self(MODULE_WINDOW_BASE + (u32::from(wire_module) << 8) + u32::from(message_type))
    }

    /// True when the identifier falls inside the per-module telemetry
    /// window.
    pub fn is_module_telemetry(self) -> bool {
        (MODULE_WINDOW_BASE..=MODULE_WINDOW_END).contains(&self.0)
    }

    /// Wire module number of a per-module identifier.
    ///
    /// Callers must have checked [`Self::is_module_telemetry`] first.
    pub fn wire_module(self) -> u8 {
        debug_assert!(self.is_module_telemetry());
        (((self.0 & 0xFF00) - MODULE_WINDOW_BASE) >> 8) as u8
    }

    /// Message type byte of a per-module identifier.
    pub fn message_type(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MessageId({:#06x})", self.0)
    }
}

impl From<u32> for MessageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<MessageId> for u32 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// One 8-byte frame as it travels on the bus.
///
/// The first six bytes carry message data, the last two the big-endian
/// CRC-16 of those six.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Raw frame identifier, see [`MessageId`].
    pub id: u32,
    /// Data bytes followed by the checksum trailer.
    pub data: [u8; FRAME_LENGTH],
}

impl Frame {
    /// Builds a frame over the given data bytes and seals it with the
    /// checksum trailer.
    pub fn new(id: impl Into<u32>, data: [u8; DATA_LENGTH]) -> Self {
        let mut bytes = [0; FRAME_LENGTH];
        bytes[..DATA_LENGTH].copy_from_slice(&data);
        let crc = calculate_crc16(&bytes);
        bytes[DATA_LENGTH..].copy_from_slice(&crc.to_be_bytes());
        Self {
            id: id.into(),
            data: bytes,
        }
    }

    /// The frame identifier.
    pub fn message_id(&self) -> MessageId {
        MessageId::new(self.id)
    }

    /// True when the checksum trailer matches the data bytes.
    pub fn is_crc_valid(&self) -> bool {
        is_crc_valid(&self.data)
    }

    fn validate_checksum(&self) -> std::result::Result<(), Error> {
        let calculated = calculate_crc16(&self.data);
        let received = u16::from_be_bytes([self.data[DATA_LENGTH], self.data[DATA_LENGTH + 1]]);
        if calculated != received {
            log::warn!(
                "Invalid checksum - calculated={:04X} received={:04X} frame={:?}",
                calculated,
                received,
                self
            );
            return Err(Error::Checksum {
                calculated,
                received,
            });
        }
        Ok(())
    }
}

impl std::ops::Deref for Frame {
    type Target = [u8; FRAME_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Frame {{ id: {:#06x}, data: {:02X?} }}", self.id, self.data)
    }
}

/// Which cells of a module are currently bleeding charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BalancingState {
    pub module: u8,
    pub mask: u32, // bit n set = cell n balancing
}

impl BalancingState {
    pub fn encode(&self, variant: ProtocolVariant) -> Frame {
        let mut data = [PAD_BYTE; DATA_LENGTH];
        data[2..6].copy_from_slice(&self.mask.to_be_bytes());
        Frame::new(
            MessageId::module(variant.wire_module(self.module), TYPE_BALANCING),
            data,
        )
    }

    pub fn decode(frame: &Frame, variant: ProtocolVariant) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        let id = frame.message_id();
        if !id.is_module_telemetry() || id.message_type() != TYPE_BALANCING {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        Ok(Self {
            module: variant.module(id.wire_module()),
            mask: u32::from_be_bytes([frame.data[2], frame.data[3], frame.data[4], frame.data[5]]),
        })
    }

    /// True when the given cell of this module is balancing.
    ///
    /// The mask covers cells 0 through 31.
    pub fn is_balancing(&self, cell: u8) -> bool {
        debug_assert!(cell < 32);
        read_bit!(self.mask, cell)
    }
}

/// Three consecutive cell voltages of one module.
///
/// In the extended dialect, cell group 11 shares its type byte with
/// temperature group 2; receivers resolve that byte as temperatures, so
/// group 11 cannot be delivered there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellVoltageGroup {
    pub module: u8,
    pub group: u8,          // three cells per group
    pub cells: [u16; 3],    // millivolts
}

impl CellVoltageGroup {
    pub fn encode(&self, variant: ProtocolVariant) -> Frame {
        let mut data = [0; DATA_LENGTH];
        for (i, &millivolts) in self.cells.iter().enumerate() {
            data[i * 2..i * 2 + 2].copy_from_slice(&CellVoltage::new(millivolts).encode());
        }
        Frame::new(
            MessageId::module(
                variant.wire_module(self.module),
                variant.cell_group_message_type(self.group),
            ),
            data,
        )
    }

    pub fn decode(frame: &Frame, variant: ProtocolVariant) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        let id = frame.message_id();
        if !id.is_module_telemetry() {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        let Some(group) = variant.cell_group(id.message_type()) else {
            return Err(Error::UnexpectedMessage(frame.id));
        };
        let module = variant.module(id.wire_module());
        let mut cells = [0; 3];
        for (i, millivolts) in cells.iter_mut().enumerate() {
            let voltage = CellVoltage::decode([frame.data[i * 2], frame.data[i * 2 + 1]]);
            log::trace!(
                "Module #{} group #{} cell #{} millivolts={}",
                module,
                group,
                i,
                *voltage
            );
            *millivolts = voltage.into();
        }
        Ok(Self {
            module,
            group,
            cells,
        })
    }

    /// The group's voltages paired with their pack-wide cell numbers.
    pub fn readings(&self) -> [CellReading; 3] {
        let first = u16::from(self.group) * 3;
        [
            CellReading {
                cell: first,
                millivolts: self.cells[0],
            },
            CellReading {
                cell: first + 1,
                millivolts: self.cells[1],
            },
            CellReading {
                cell: first + 2,
                millivolts: self.cells[2],
            },
        ]
    }
}

/// Six temperature sensor readings of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemperatureGroup {
    pub module: u8,
    pub group: u8,             // six sensors per group
    pub temperatures: [i16; 6], // degrees Celsius
}

impl TemperatureGroup {
    pub fn encode(&self, variant: ProtocolVariant) -> Frame {
        let mut data = [0; DATA_LENGTH];
        for (i, &celsius) in self.temperatures.iter().enumerate() {
            data[i] = Temperature::new(celsius).encode();
        }
        Frame::new(
            MessageId::module(
                variant.wire_module(self.module),
                variant.temperature_group_message_type(self.group),
            ),
            data,
        )
    }

    pub fn decode(frame: &Frame, variant: ProtocolVariant) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        let id = frame.message_id();
        if !id.is_module_telemetry() {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        let Some(group) = variant.temperature_group(id.message_type()) else {
            return Err(Error::UnexpectedMessage(frame.id));
        };
        let module = variant.module(id.wire_module());
        let mut temperatures = [0; 6];
        for (i, celsius) in temperatures.iter_mut().enumerate() {
            let temperature = Temperature::decode(frame.data[i]);
            log::trace!(
                "Module #{} group #{} sensor #{} celsius={}",
                module,
                group,
                i,
                *temperature
            );
            *celsius = temperature.into();
        }
        Ok(Self {
            module,
            group,
            temperatures,
        })
    }
}

/// Pack-level voltage summary, broadcast under a fixed identifier.
///
/// The extreme cell voltages ride in the same 14-bit packing as the
/// per-module group broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackVoltages {
    pub pack_voltage: u16,    // tenths of a volt
    pub highest_voltage: u16, // millivolts
    pub lowest_voltage: u16,  // millivolts
}

impl PackVoltages {
    pub fn encode(&self) -> Frame {
        let mut data = [0; DATA_LENGTH];
        data[0..2].copy_from_slice(&PackVoltage::new(self.pack_voltage).encode());
        data[2..4].copy_from_slice(&CellVoltage::new(self.highest_voltage).encode());
        data[4..6].copy_from_slice(&CellVoltage::new(self.lowest_voltage).encode());
        Frame::new(MessageId::PACK_VOLTAGES, data)
    }

    pub fn decode(frame: &Frame) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        if frame.message_id() != MessageId::PACK_VOLTAGES {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        Ok(Self {
            pack_voltage: PackVoltage::decode([frame.data[0], frame.data[1]]).into(),
            highest_voltage: CellVoltage::decode([frame.data[2], frame.data[3]]).into(),
            lowest_voltage: CellVoltage::decode([frame.data[4], frame.data[5]]).into(),
        })
    }
}

/// Pack-level cell statistics, broadcast under a fixed identifier.
///
/// The average voltage rides in the 14-bit cell voltage packing; the two
/// cell positions are plain big-endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackCellStats {
    pub average_voltage: u16, // millivolts
    pub highest_cell: u16,
    pub lowest_cell: u16,
}

impl PackCellStats {
    pub fn encode(&self) -> Frame {
        let mut data = [0; DATA_LENGTH];
        data[0..2].copy_from_slice(&CellVoltage::new(self.average_voltage).encode());
        data[2..4].copy_from_slice(&CellIndex::new(self.highest_cell).encode());
        data[4..6].copy_from_slice(&CellIndex::new(self.lowest_cell).encode());
        Frame::new(MessageId::PACK_CELL_STATS, data)
    }

    pub fn decode(frame: &Frame) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        if frame.message_id() != MessageId::PACK_CELL_STATS {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        Ok(Self {
            average_voltage: CellVoltage::decode([frame.data[0], frame.data[1]]).into(),
            highest_cell: CellIndex::decode([frame.data[2], frame.data[3]]).into(),
            lowest_cell: CellIndex::decode([frame.data[4], frame.data[5]]).into(),
        })
    }
}

/// Pack-level temperature summary, broadcast under a fixed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackTemperatures {
    pub highest_temperature: i16, // degrees Celsius
    pub lowest_temperature: i16,  // degrees Celsius
    pub average_temperature: i16, // degrees Celsius
}

impl PackTemperatures {
    pub fn encode(&self) -> Frame {
        let mut data = [PAD_BYTE; DATA_LENGTH];
        data[0] = Temperature::new(self.highest_temperature).encode();
        data[1] = Temperature::new(self.lowest_temperature).encode();
        data[2] = Temperature::new(self.average_temperature).encode();
        Frame::new(MessageId::PACK_TEMPERATURES, data)
    }

    pub fn decode(frame: &Frame) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        if frame.message_id() != MessageId::PACK_TEMPERATURES {
            return Err(Error::UnexpectedMessage(frame.id));
        }
        // Bytes 3 to 5 are padding and carry no data.
        Ok(Self {
            highest_temperature: Temperature::decode(frame.data[0]).into(),
            lowest_temperature: Temperature::decode(frame.data[1]).into(),
            average_temperature: Temperature::decode(frame.data[2]).into(),
        })
    }
}

/// Any message the codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Message {
    Balancing(BalancingState),
    CellVoltages(CellVoltageGroup),
    Temperatures(TemperatureGroup),
    PackVoltages(PackVoltages),
    PackCellStats(PackCellStats),
    PackTemperatures(PackTemperatures),
}

impl Message {
    /// Classifies and decodes a received frame.
    ///
    /// The checksum is verified before any classification, so a corrupted
    /// frame reports [`Error::Checksum`] even when its identifier is
    /// unknown.
    pub fn decode(frame: &Frame, variant: ProtocolVariant) -> std::result::Result<Self, Error> {
        frame.validate_checksum()?;
        match frame.message_id() {
            MessageId::PACK_VOLTAGES => Ok(Self::PackVoltages(PackVoltages::decode(frame)?)),
            MessageId::PACK_CELL_STATS => Ok(Self::PackCellStats(PackCellStats::decode(frame)?)),
            MessageId::PACK_TEMPERATURES => {
                Ok(Self::PackTemperatures(PackTemperatures::decode(frame)?))
            }
            id if id.is_module_telemetry() => {
                let message_type = id.message_type();
                if message_type == TYPE_BALANCING {
                    Ok(Self::Balancing(BalancingState::decode(frame, variant)?))
                } else if variant.temperature_group(message_type).is_some() {
                    Ok(Self::Temperatures(TemperatureGroup::decode(frame, variant)?))
                } else if variant.cell_group(message_type).is_some() {
                    Ok(Self::CellVoltages(CellVoltageGroup::decode(frame, variant)?))
                } else {
                    Err(Error::UnknownMessageType(message_type))
                }
            }
            _ => Err(Error::UnknownId(frame.id)),
        }
    }

    /// Encodes the message into its frame.
    pub fn encode(&self, variant: ProtocolVariant) -> Frame {
        match self {
            Self::Balancing(msg) => msg.encode(variant),
            Self::CellVoltages(msg) => msg.encode(variant),
            Self::Temperatures(msg) => msg.encode(variant),
            Self::PackVoltages(msg) => msg.encode(),
            Self::PackCellStats(msg) => msg.encode(),
            Self::PackTemperatures(msg) => msg.encode(),
        }
    }
}
