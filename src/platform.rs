//! platform — граница устройств и низкоэнергетических переходов.
//!
//! Контроллер дёргает suspend/resume устройств вокруг атомарного захвата,
//! восстановления и S2RAM-подобного перехода. MockPlatform считает вызовы
//! и умеет инжектировать отказы (для сценариев из тестов).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, SnapError};

/// Граница «устройства + платформенный sleep».
pub trait Platform: Send {
    /// Остановить I/O всех устройств. Может отказать.
    fn suspend_devices(&mut self) -> Result<()>;
    fn resume_devices(&mut self);

    /// Подготовка платформы к low-power состоянию с сохранением памяти.
    fn prepare_low_power(&mut self) -> Result<()>;
    /// Переход в low-power состояние; возвращает управление после пробуждения.
    fn enter_low_power(&mut self) -> Result<()>;
    fn finish_low_power(&mut self);
}

/// Счётчики/флаги платформы (разделяются с тестами).
#[derive(Debug, Default)]
pub struct PlatformProbe {
    pub suspend_calls: AtomicU64,
    pub resume_calls: AtomicU64,
    pub sleep_cycles: AtomicU64,
    pub devices_suspended: AtomicBool,
    /// Инжекция отказов.
    pub fail_suspend: AtomicBool,
    pub fail_enter: AtomicBool,
}

impl PlatformProbe {
    pub fn suspend_calls(&self) -> u64 {
        self.suspend_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> u64 {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn sleep_cycles(&self) -> u64 {
        self.sleep_cycles.load(Ordering::SeqCst)
    }

    pub fn devices_suspended(&self) -> bool {
        self.devices_suspended.load(Ordering::SeqCst)
    }

    pub fn set_fail_suspend(&self, on: bool) {
        self.fail_suspend.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_enter(&self, on: bool) {
        self.fail_enter.store(on, Ordering::SeqCst);
    }
}

/// Mock-платформа поверх зонда.
pub struct MockPlatform {
    probe: Arc<PlatformProbe>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(PlatformProbe::default()),
        }
    }

    pub fn with_probe(probe: Arc<PlatformProbe>) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> Arc<PlatformProbe> {
        self.probe.clone()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn suspend_devices(&mut self) -> Result<()> {
        self.probe.suspend_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_suspend.load(Ordering::SeqCst) {
            return Err(SnapError::Io("device suspend failed".into()));
        }
        self.probe.devices_suspended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume_devices(&mut self) {
        self.probe.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.devices_suspended.store(false, Ordering::SeqCst);
    }

    fn prepare_low_power(&mut self) -> Result<()> {
        Ok(())
    }

    fn enter_low_power(&mut self) -> Result<()> {
        if self.probe.fail_enter.load(Ordering::SeqCst) {
            return Err(SnapError::Io("platform transition failed".into()));
        }
        self.probe.sleep_cycles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn finish_low_power(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspend_resume_balance() {
        let mut p = MockPlatform::new();
        let probe = p.probe();
        p.suspend_devices().unwrap();
        assert!(probe.devices_suspended());
        p.resume_devices();
        assert!(!probe.devices_suspended());
        assert_eq!(probe.suspend_calls(), 1);
        assert_eq!(probe.resume_calls(), 1);
    }
}
