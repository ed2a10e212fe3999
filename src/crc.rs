//! CRC-16-CCITT checksum engine for the 8-byte telemetry frames.
//!
//! Initial value `0xFFFF`, polynomial `0x1021`, processed one byte at a
//! time, most significant bit first. The bit order must match the module
//! firmware exactly or every frame fails validation.

const INITIAL: u16 = 0xFFFF;
const POLYNOMIAL: u16 = 0x1021;

/// Width of the checksum trailer in bytes.
pub const CRC_LENGTH: usize = 2;

/// Computes the CRC-16-CCITT of a frame, excluding the checksum trailer.
///
/// Callers pass the whole frame, trailer included; the final
/// [`CRC_LENGTH`] bytes never enter the computation. Slices shorter than
/// the trailer yield the CRC of no data.
pub fn calculate_crc16(frame: &[u8]) -> u16 {
    let data_len = frame.len().saturating_sub(CRC_LENGTH);
    crc16(&frame[..data_len])
}

/// Checks the big-endian checksum trailer of a received frame.
///
/// Recomputes the CRC over everything before the trailer and compares it
/// against the trailer bytes. Returns `false` on any mismatch and on
/// frames too short to carry a trailer; never panics.
pub fn is_crc_valid(frame: &[u8]) -> bool {
    if frame.len() < CRC_LENGTH {
        return false;
    }
    let received = u16::from_be_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
    calculate_crc16(frame) == received
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_test() {
        // CRC-16/CCITT-FALSE check value.
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16(&[]), INITIAL);
    }

    #[test]
    fn trailer_exclusion_test() {
        let payload = [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x2A];
        let mut frame = [0u8; 8];
        frame[..6].copy_from_slice(&payload);
        let crc = calculate_crc16(&frame);
        assert_eq!(crc, crc16(&payload));

        // The trailer content must not affect the computation.
        frame[6..].copy_from_slice(&crc.to_be_bytes());
        assert_eq!(calculate_crc16(&frame), crc);
    }

    #[test]
    fn validity_test() {
        let mut frame = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0x00, 0x00];
        let crc = calculate_crc16(&frame);
        frame[6..].copy_from_slice(&crc.to_be_bytes());
        assert!(is_crc_valid(&frame));

        frame[6] ^= 0x01;
        assert!(!is_crc_valid(&frame));
    }

    #[test]
    fn short_input_test() {
        assert!(!is_crc_valid(&[]));
        assert!(!is_crc_valid(&[0xAB]));
        // Two bytes leave no data; only the empty-data CRC validates.
        assert!(is_crc_valid(&INITIAL.to_be_bytes()));
        assert!(!is_crc_valid(&[0x00, 0x00]));
    }
}
