use evesbms::protocol::{
    BalancingState, CellVoltageGroup, Frame, Message, PackCellStats, PackTemperatures,
    PackVoltages, ProtocolVariant, TemperatureGroup,
};

#[test]
fn every_kind_roundtrips_in_both_dialects() {
    for variant in [ProtocolVariant::Extended, ProtocolVariant::Compact] {
        let messages = [
            Message::Balancing(BalancingState {
                module: 1,
                mask: 0x0000_0FF0,
            }),
            Message::CellVoltages(CellVoltageGroup {
                module: 0,
                group: 3,
                cells: [3642, 3700, 3689],
            }),
            Message::Temperatures(TemperatureGroup {
                module: 2,
                group: 1,
                temperatures: [18, 19, 21, 20, 22, 19],
            }),
            Message::PackVoltages(PackVoltages {
                pack_voltage: 512,
                highest_voltage: 3721,
                lowest_voltage: 3640,
            }),
            Message::PackCellStats(PackCellStats {
                average_voltage: 3680,
                highest_cell: 3,
                lowest_cell: 90,
            }),
            Message::PackTemperatures(PackTemperatures {
                highest_temperature: 33,
                lowest_temperature: 19,
                average_temperature: 26,
            }),
        ];
        for message in messages {
            let frame = message.encode(variant);
            assert!(frame.is_crc_valid());
            assert_eq!(Message::decode(&frame, variant).unwrap(), message);
        }
    }
}

#[test]
fn cell_groups_cover_the_full_address_space() {
    for variant in [ProtocolVariant::Extended, ProtocolVariant::Compact] {
        for module in 0..=variant.max_module() {
            for group in 0..=variant.max_cell_group() {
                // Extended group 11 lands on the temperature type byte and
                // arrives as a temperature group instead.
                if variant == ProtocolVariant::Extended && group == 11 {
                    continue;
                }
                let sent = CellVoltageGroup {
                    module,
                    group,
                    cells: [3700, 3655, 3703],
                };
                let frame = sent.encode(variant);
                match Message::decode(&frame, variant).unwrap() {
                    Message::CellVoltages(received) => assert_eq!(received, sent),
                    other => panic!("module {module} group {group} arrived as {other:?}"),
                }
            }
        }
    }
}

#[test]
fn temperature_groups_cover_the_full_address_space() {
    for variant in [ProtocolVariant::Extended, ProtocolVariant::Compact] {
        for module in 0..=variant.max_module() {
            for group in 0..=2 {
                let sent = TemperatureGroup {
                    module,
                    group,
                    temperatures: [-40, -5, 0, 25, 100, 215],
                };
                let frame = sent.encode(variant);
                match Message::decode(&frame, variant).unwrap() {
                    Message::Temperatures(received) => assert_eq!(received, sent),
                    other => panic!("module {module} group {group} arrived as {other:?}"),
                }
            }
        }
    }
}

#[test]
fn balancing_masks_roundtrip() {
    for variant in [ProtocolVariant::Extended, ProtocolVariant::Compact] {
        for mask in [0x0000_0000, 0x0000_002A, 0x8000_0001, 0xFFFF_FFFF] {
            let sent = BalancingState { module: 5, mask };
            match Message::decode(&sent.encode(variant), variant).unwrap() {
                Message::Balancing(received) => assert_eq!(received, sent),
                other => panic!("mask {mask:#010x} arrived as {other:?}"),
            }
        }
    }
}

#[test]
fn known_balancing_frame_decodes() {
    // Module 0 with cells 1, 3 and 5 bleeding.
    let frame = Frame {
        id: 0x6101,
        data: [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x2A, 0x85, 0x28],
    };
    assert!(frame.is_crc_valid());
    match Message::decode(&frame, ProtocolVariant::Extended).unwrap() {
        Message::Balancing(state) => {
            assert_eq!(state.module, 0);
            assert_eq!(state.mask, 0x2A);
            assert!(state.is_balancing(1));
            assert!(state.is_balancing(3));
            assert!(state.is_balancing(5));
            assert!(!state.is_balancing(0));
        }
        other => panic!("arrived as {other:?}"),
    }
}

#[test]
fn dialect_mismatch_shifts_module_numbers() {
    // The extended dialect offsets wire module numbers by one, so a
    // receiver on the wrong dialect sees every module shifted.
    let frame = BalancingState { module: 0, mask: 1 }.encode(ProtocolVariant::Extended);
    match Message::decode(&frame, ProtocolVariant::Compact).unwrap() {
        Message::Balancing(state) => assert_eq!(state.module, 1),
        other => panic!("arrived as {other:?}"),
    }
}
