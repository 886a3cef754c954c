use anyhow::Result;
use std::sync::Arc;

use Permafrost::config::SnapConfig;
use Permafrost::device::{AccessMode, OpenMode, SessionDeps, SnapshotDevice};
use Permafrost::engine::MemImageEngine;
use Permafrost::error::SnapError;
use Permafrost::platform::MockPlatform;
use Permafrost::quiesce::{InProcQuiesce, QuiesceProbe};

#[test]
fn second_open_is_busy_until_close() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default());

    let s = dev.open(OpenMode::ReadOnly)?;
    assert!(!dev.is_available());
    assert!(matches!(dev.open(OpenMode::ReadOnly), Err(SnapError::Busy)));
    assert!(matches!(dev.open(OpenMode::WriteOnly), Err(SnapError::Busy)));

    s.close();
    assert!(dev.is_available());

    // После close открытие снова проходит
    let s2 = dev.open(OpenMode::WriteOnly)?;
    assert_eq!(s2.mode(), AccessMode::WriteOnly);
    Ok(())
}

#[test]
fn read_write_open_rejected_outright() {
    let dev = SnapshotDevice::new(SnapConfig::default());
    assert!(matches!(
        dev.open(OpenMode::ReadWrite),
        Err(SnapError::InvalidArgument(_))
    ));
    // Слот не должен быть съеден отвергнутым открытием
    assert!(dev.is_available());
}

#[test]
fn drop_releases_slot() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default());
    {
        let _s = dev.open(OpenMode::ReadOnly)?;
        assert!(!dev.is_available());
    }
    assert!(dev.is_available());
    Ok(())
}

#[test]
fn close_unwinds_frozen_state() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default().with_mem_pages(2));

    let qprobe = Arc::new(QuiesceProbe::default());
    let deps = SessionDeps {
        quiesce: Box::new(InProcQuiesce::with_probe(qprobe.clone())),
        platform: Box::new(MockPlatform::new()),
        engine: Box::new(MemImageEngine::new(2)),
    };
    let mut s = dev.open_with(OpenMode::ReadOnly, deps)?;

    s.freeze()?;
    assert!(qprobe.contexts_stopped());
    assert!(qprobe.tasks_frozen());

    // Close обязан безусловно разморозить и вернуть слот
    s.close();
    assert!(!qprobe.contexts_stopped());
    assert!(!qprobe.tasks_frozen());
    assert!(dev.is_available());
    Ok(())
}

#[test]
fn read_mode_derives_swap_target_from_resume_device() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default().with_resume_device(Some(3)));
    dev.register_swap(3, 8);

    let s = dev.open(OpenMode::ReadOnly)?;
    assert_eq!(s.swap_target(), Some(3));
    s.close();

    // В режиме записи target не выводится
    let s = dev.open(OpenMode::WriteOnly)?;
    assert_eq!(s.swap_target(), None);
    Ok(())
}

#[test]
fn unregistered_resume_device_leaves_target_unset() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default().with_resume_device(Some(42)));
    let s = dev.open(OpenMode::ReadOnly)?;
    assert_eq!(s.swap_target(), None);
    Ok(())
}
