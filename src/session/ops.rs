//! session/ops — машина состояний: freeze/unfreeze, атомарные
//! capture/restore, освобождение образа, low-power переход.
//!
//! Порядок протокола строгий: предусловия проверяются ДО любых побочных
//! эффектов; неудачи не оставляют frozen/image_ready полуобновлёнными.
//! Единственное задокументированное исключение — отказ suspend устройств
//! на low-power пути: он репортится, но переход по умолчанию продолжается
//! (эталонная последовательность; см. SnapConfig::abort_on_suspend_failure).

use log::{debug, info, warn};

use crate::device::AccessMode;
use crate::engine::CapturePoint;
use crate::error::{Result, SnapError};
use crate::metrics::{
    record_capture, record_device_suspend_failure, record_freeze, record_image_freed,
    record_lowpower_cycle, record_restore, record_thaw,
};

use super::Session;

impl Session {
    /// Заморозить всё прочее исполнение. No-op, если уже заморожено.
    ///
    /// Последовательность: stop_contexts → freeze_tasks. Если задачи не
    /// остановились, контексты возвращаются ДО выхода, результат — Busy.
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        self.quiesce.stop_contexts()?;
        if self.quiesce.freeze_tasks().is_err() {
            self.quiesce.resume_contexts();
            return Err(SnapError::Busy);
        }
        self.frozen = true;
        record_freeze();
        info!("system frozen");
        Ok(())
    }

    /// Возобновить исполнение. No-op, если не заморожено.
    pub fn unfreeze(&mut self) -> Result<()> {
        if !self.frozen {
            return Ok(());
        }
        self.quiesce.thaw_tasks();
        self.quiesce.resume_contexts();
        self.frozen = false;
        record_thaw();
        info!("system thawed");
        Ok(())
    }

    /// Атомарный захват образа памяти.
    ///
    /// Требует mode=ReadOnly, frozen=true и отсутствие готового образа
    /// (иначе PermissionDenied). Устройства suspend'ятся вокруг захвата.
    /// Возвращает CapturePoint; restore_point — аналог in_suspend: эта точка
    /// исполнения и есть точка восстановления.
    pub fn capture_atomic(&mut self) -> Result<CapturePoint> {
        if self.mode() != AccessMode::ReadOnly || !self.frozen || self.image_ready {
            return Err(SnapError::PermissionDenied);
        }

        if let Err(e) = self.platform.suspend_devices() {
            self.platform.resume_devices();
            return Err(e);
        }
        let res = self.engine.capture(self.size_hint);
        self.platform.resume_devices();

        let cp = res?;
        self.image_ready = true;
        self.offset = 0;
        record_capture();
        info!(
            "image captured: {} pages, {} B (restore_point={})",
            cp.pages, cp.bytes, cp.restore_point
        );
        Ok(cp)
    }

    /// Атомарное восстановление из полностью загруженного образа.
    ///
    /// Требует mode=WriteOnly, frozen=true и полный образ в движке (иначе
    /// PermissionDenied). На отказе устройства возобновляются. На реальном
    /// железе успешный путь не возвращает управление (память процесса
    /// замещена); in-process движок возвращает Ok после замены памяти —
    /// задокументированное ограничение тестовой среды.
    pub fn restore_atomic(&mut self) -> Result<()> {
        if self.mode() != AccessMode::WriteOnly || !self.frozen || !self.engine.loaded() {
            return Err(SnapError::PermissionDenied);
        }

        if let Err(e) = self.platform.suspend_devices() {
            self.platform.resume_devices();
            return Err(e);
        }
        let res = self.engine.restore();
        self.platform.resume_devices();
        res?;

        self.engine.free();
        record_restore();
        info!("image restored, control returned to restored state");
        Ok(())
    }

    /// Освободить буферы образа и курсор; image_ready=false.
    /// Разрешено в любом состоянии, идемпотентно.
    pub fn free_image(&mut self) {
        self.engine.free();
        if self.image_ready {
            record_image_freed();
        }
        self.image_ready = false;
        self.offset = 0;
        debug!("image buffers freed");
    }

    /// Low-power цикл с возвратом (аналог S2RAM при замороженной системе).
    ///
    /// PermissionDenied вне frozen. Лок перехода берётся ТОЛЬКО try_lock'ом:
    /// при контензии — немедленный Busy, без очереди и без побочных эффектов.
    /// Отказ suspend устройств репортится, но переход продолжается, если не
    /// включён abort_on_suspend_failure.
    pub fn enter_low_power(&mut self) -> Result<()> {
        if !self.frozen {
            return Err(SnapError::PermissionDenied);
        }
        let shared = self.shared.clone();
        let _guard = match shared.transition.try_lock() {
            Ok(g) => g,
            Err(_) => return Err(SnapError::Busy),
        };

        self.platform.prepare_low_power()?;

        if let Err(e) = self.platform.suspend_devices() {
            record_device_suspend_failure();
            warn!("device suspend failed on low-power path: {}", e);
            if self.shared.cfg.abort_on_suspend_failure {
                self.platform.finish_low_power();
                return Err(e);
            }
            // Эталонная последовательность: переход уже в полёте, продолжаем.
        }

        let res = self.platform.enter_low_power();
        self.platform.resume_devices();
        self.platform.finish_low_power();
        res?;

        record_lowpower_cycle();
        info!("low-power cycle complete");
        Ok(())
    }
}
