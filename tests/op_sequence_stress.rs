//! Рандомизированные последовательности команд: инварианты машины состояний
//! держатся для произвольного порядка операций.

use anyhow::Result;
use std::collections::HashSet;

use Permafrost::config::SnapConfig;
use Permafrost::ctl::{dispatch_code, CmdArg, CmdOut};
use Permafrost::device::{AccessMode, OpenMode, SnapshotDevice};
use Permafrost::error::SnapError;

#[test]
fn random_command_sequences_hold_invariants() -> Result<()> {
    let mut rng = oorandom::Rand32::new(0xDEC0_DE07);

    for round in 0..40 {
        let dev = SnapshotDevice::new(SnapConfig::default().with_mem_pages(2));
        dev.register_swap(5, 8);

        let mode = if round % 2 == 0 {
            OpenMode::ReadOnly
        } else {
            OpenMode::WriteOnly
        };
        let mut s = dev.open(mode)?;
        assert!(matches!(dev.open(mode), Err(SnapError::Busy)));

        // Модель: выданные оффсеты текущей эпохи (между FreeSwapPages)
        let mut epoch_offsets: HashSet<u64> = HashSet::new();

        for _ in 0..120 {
            // Коды 0..=13: немного за границей пространства команд
            let code = rng.rand_range(0..14);
            let arg = match code {
                6 => CmdArg::U64(rng.rand_u32() as u64),
                10 => CmdArg::Device(if rng.rand_u32() % 4 == 0 { 99 } else { 5 }),
                _ => CmdArg::None,
            };

            let was_frozen = s.is_frozen();
            let was_ready = s.image_ready();

            match dispatch_code(&mut s, code, arg) {
                Ok(out) => {
                    match code {
                        3 => {
                            // Успешный захват возможен только из легального состояния
                            assert_eq!(s.mode(), AccessMode::ReadOnly);
                            assert!(was_frozen && !was_ready);
                            assert!(s.image_ready());
                            assert!(matches!(out, CmdOut::Flag(true)));
                        }
                        4 => {
                            assert_eq!(s.mode(), AccessMode::WriteOnly);
                            assert!(was_frozen);
                        }
                        8 => {
                            let off = match out {
                                CmdOut::Offset(o) => o,
                                other => panic!("alloc returned {:?}", other),
                            };
                            assert!(
                                epoch_offsets.insert(off),
                                "offset {} handed out twice in epoch",
                                off
                            );
                        }
                        9 => {
                            epoch_offsets.clear();
                            assert_eq!(s.claimed_swap_pages(), 0);
                        }
                        5 => assert!(!s.image_ready()),
                        _ => {}
                    }
                }
                Err(e) => {
                    // Ошибка не должна полуобновить frozen/image_ready
                    match e {
                        SnapError::Busy
                        | SnapError::PermissionDenied
                        | SnapError::NoDevice
                        | SnapError::InvalidArgument(_)
                        | SnapError::OutOfSpace
                        | SnapError::Io(_) => {}
                    }
                    assert_eq!(s.is_frozen(), was_frozen);
                    assert_eq!(s.image_ready(), was_ready);
                }
            }

            // Глобальные инварианты
            if s.image_ready() {
                assert_eq!(s.mode(), AccessMode::ReadOnly);
            }
            assert!(s.claimed_swap_pages() <= 8);
            assert_eq!(epoch_offsets.len() as u64, s.claimed_swap_pages());
        }

        s.close();
        assert!(dev.is_available(), "slot must be free after close");
    }
    Ok(())
}
