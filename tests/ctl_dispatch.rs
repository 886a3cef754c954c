use anyhow::Result;

use Permafrost::config::SnapConfig;
use Permafrost::consts::{CMD_MAX, PAGE_SIZE};
use Permafrost::ctl::{dispatch, dispatch_code, Cmd, CmdArg, CmdOut};
use Permafrost::device::{OpenMode, SnapshotDevice};
use Permafrost::error::SnapError;

fn dev() -> SnapshotDevice {
    let d = SnapshotDevice::new(SnapConfig::default().with_mem_pages(2));
    d.register_swap(5, 8);
    d
}

#[test]
fn full_capture_protocol_via_dispatch() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::ReadOnly)?;

    assert_eq!(dispatch(&mut s, Cmd::Freeze, CmdArg::None)?, CmdOut::None);
    let out = dispatch(&mut s, Cmd::CaptureAtomic, CmdArg::None)?;
    assert_eq!(out, CmdOut::Flag(true));
    assert!(s.image_ready());

    assert_eq!(dispatch(&mut s, Cmd::FreeImage, CmdArg::None)?, CmdOut::None);
    assert!(!s.image_ready());
    assert_eq!(dispatch(&mut s, Cmd::Unfreeze, CmdArg::None)?, CmdOut::None);
    assert!(!s.is_frozen());
    Ok(())
}

#[test]
fn swap_protocol_via_raw_codes() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::WriteOnly)?;

    // SetSwapTarget=10, AllocateSwapPage=8, QueryAvailableSwap=7, FreeSwapPages=9
    assert_eq!(dispatch_code(&mut s, 10, CmdArg::Device(5))?, CmdOut::None);
    let avail = dispatch_code(&mut s, 7, CmdArg::None)?;
    assert_eq!(avail, CmdOut::Bytes(8 * PAGE_SIZE));

    let off = dispatch_code(&mut s, 8, CmdArg::None)?;
    assert_eq!(off, CmdOut::Offset(0));
    let off2 = dispatch_code(&mut s, 8, CmdArg::None)?;
    assert_eq!(off2, CmdOut::Offset(PAGE_SIZE));

    assert_eq!(dispatch_code(&mut s, 9, CmdArg::None)?, CmdOut::None);
    assert_eq!(s.claimed_swap_pages(), 0);
    Ok(())
}

#[test]
fn set_image_size_hint_stores_value() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::ReadOnly)?;
    dispatch(&mut s, Cmd::SetImageSizeHint, CmdArg::U64(123_456))?;
    assert_eq!(s.image_size_hint(), 123_456);
    // Значение не валидируется
    dispatch(&mut s, Cmd::SetImageSizeHint, CmdArg::U64(u64::MAX))?;
    assert_eq!(s.image_size_hint(), u64::MAX);
    Ok(())
}

#[test]
fn out_of_range_code_is_invalid_argument() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::ReadOnly)?;
    assert!(matches!(
        dispatch_code(&mut s, 0, CmdArg::None),
        Err(SnapError::InvalidArgument(_))
    ));
    assert!(matches!(
        dispatch_code(&mut s, CMD_MAX + 1, CmdArg::None),
        Err(SnapError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn argument_type_mismatch_is_invalid_argument() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::ReadOnly)?;

    // Команда без аргумента с аргументом
    assert!(matches!(
        dispatch(&mut s, Cmd::Freeze, CmdArg::U64(1)),
        Err(SnapError::InvalidArgument(_))
    ));
    // Команда с аргументом без него
    assert!(matches!(
        dispatch(&mut s, Cmd::SetImageSizeHint, CmdArg::None),
        Err(SnapError::InvalidArgument(_))
    ));
    assert!(matches!(
        dispatch(&mut s, Cmd::SetSwapTarget, CmdArg::U64(5)),
        Err(SnapError::InvalidArgument(_))
    ));
    // Валидация аргумента — до эффекта: состояние не тронуто
    assert!(!s.is_frozen());
    Ok(())
}

#[test]
fn errors_map_through_dispatch() -> Result<()> {
    let dev = dev();
    let mut s = dev.open(OpenMode::WriteOnly)?;

    // Захват в режиме записи — PermissionDenied из сессии
    assert!(matches!(
        dispatch(&mut s, Cmd::CaptureAtomic, CmdArg::None),
        Err(SnapError::PermissionDenied)
    ));
    // Аллокация без target — NoDevice
    assert!(matches!(
        dispatch(&mut s, Cmd::AllocateSwapPage, CmdArg::None),
        Err(SnapError::NoDevice)
    ));
    Ok(())
}
