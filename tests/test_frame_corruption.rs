use evesbms::protocol::{
    BalancingState, CellVoltageGroup, Frame, Message, ProtocolVariant, TemperatureGroup,
};
use evesbms::Error;

fn flip_bit(frame: &Frame, bit: usize) -> Frame {
    let mut corrupted = *frame;
    corrupted.data[bit / 8] ^= 1 << (bit % 8);
    corrupted
}

#[test]
fn any_single_bit_flip_is_rejected() {
    let frame = CellVoltageGroup {
        module: 4,
        group: 2,
        cells: [3655, 3702, 3688],
    }
    .encode(ProtocolVariant::Extended);

    for bit in 0..64 {
        let corrupted = flip_bit(&frame, bit);
        assert!(
            matches!(
                Message::decode(&corrupted, ProtocolVariant::Extended),
                Err(Error::Checksum { .. })
            ),
            "flip of bit {bit} slipped through"
        );
    }
}

#[test]
fn any_double_bit_flip_is_rejected() {
    let frame = TemperatureGroup {
        module: 1,
        group: 0,
        temperatures: [24, 25, 25, 26, 24, 23],
    }
    .encode(ProtocolVariant::Extended);

    for first in 0..64 {
        for second in first + 1..64 {
            let corrupted = flip_bit(&flip_bit(&frame, first), second);
            assert!(
                !corrupted.is_crc_valid(),
                "flips of bits {first} and {second} slipped through"
            );
        }
    }
}

#[test]
fn identifier_is_not_covered_by_the_checksum() {
    // The checksum seals the data bytes only. A hit on the identifier
    // reroutes the frame instead of failing validation.
    let frame = BalancingState { module: 2, mask: 1 }.encode(ProtocolVariant::Extended);
    let mut rerouted = frame;
    rerouted.id ^= 0x0100;
    match Message::decode(&rerouted, ProtocolVariant::Extended).unwrap() {
        Message::Balancing(state) => assert_eq!(state.module, 1),
        other => panic!("arrived as {other:?}"),
    }
}

#[test]
fn stale_trailer_is_rejected() {
    // Rebuilding a frame's data without resealing it must not validate.
    let frame = BalancingState { module: 2, mask: 1 }.encode(ProtocolVariant::Extended);
    let mut stale = frame;
    stale.data[5] = 0x02;
    assert!(!stale.is_crc_valid());
    assert!(matches!(
        Message::decode(&stale, ProtocolVariant::Extended),
        Err(Error::Checksum { .. })
    ));
}
