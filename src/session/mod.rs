//! session — Snapshot Session Controller: запись состояния сессии + машина
//! состояний поверх коллабораторов (quiesce, platform, engine, swap).
//!
//! Одна сессия на endpoint (слот в device.rs). Все мутирующие операции идут
//! через &mut Session — клиент один, операции сериализованы по построению.
//!
//! Раскладка:
//! - mod.rs    — запись сессии, swap-делегаты, close/Drop;
//! - ops.rs    — freeze/unfreeze, атомарные capture/restore, low-power;
//! - stream.rs — потоковое чтение/запись образа.

mod ops;
mod stream;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, info};

use crate::consts::PAGE_SIZE;
use crate::device::{AccessMode, DeviceShared, SessionDeps};
use crate::engine::ImageEngine;
use crate::error::{Result, SnapError};
use crate::metrics::{record_swap_alloc, record_swap_free};
use crate::platform::Platform;
use crate::quiesce::QuiesceService;
use crate::swap::PageBitmap;

/// Открытая сессия снапшота (см. модель данных в README).
pub struct Session {
    pub(crate) shared: Arc<DeviceShared>,
    mode: AccessMode,

    swap_target: Option<u32>,
    bitmap: Option<PageBitmap>,

    pub(crate) frozen: bool,
    pub(crate) image_ready: bool,

    /// Монотонный байтовый оффсет потокового курсора.
    pub(crate) offset: u64,
    pub(crate) size_hint: u64,

    pub(crate) quiesce: Box<dyn QuiesceService>,
    pub(crate) platform: Box<dyn Platform>,
    pub(crate) engine: Box<dyn ImageEngine>,

    released: bool,
}

impl Session {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        mode: AccessMode,
        swap_target: Option<u32>,
        deps: SessionDeps,
        size_hint: u64,
    ) -> Self {
        Self {
            shared,
            mode,
            swap_target,
            bitmap: None,
            frozen: false,
            image_ready: false,
            offset: 0,
            size_hint,
            quiesce: deps.quiesce,
            platform: deps.platform,
            engine: deps.engine,
            released: false,
        }
    }

    // ----------------- accessors -----------------

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn image_ready(&self) -> bool {
        self.image_ready
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn swap_target(&self) -> Option<u32> {
        self.swap_target
    }

    /// Число страниц, занятых этой сессией в swap-области.
    pub fn claimed_swap_pages(&self) -> u64 {
        self.bitmap.as_ref().map(|b| b.claimed()).unwrap_or(0)
    }

    /// Целевой размер следующего захвата. Значение не валидируется.
    pub fn set_image_size_hint(&mut self, bytes: u64) {
        debug!("image size hint set to {} B", bytes);
        self.size_hint = bytes;
    }

    pub fn image_size_hint(&self) -> u64 {
        self.size_hint
    }

    // ----------------- swap delegation -----------------

    /// Назначить swap-область. PermissionDenied, если аллокации уже начались
    /// (target неизменен, пока существует bitmap); NoDevice для незарегистрированного id.
    pub fn set_swap_target(&mut self, device: u32) -> Result<()> {
        if self.bitmap.is_some() {
            return Err(SnapError::PermissionDenied);
        }
        self.shared.swaps.lookup(device)?;
        self.swap_target = Some(device);
        Ok(())
    }

    /// Свободное место в назначенной области, байты. NoDevice без target.
    /// Область могла быть перерегистрирована меньшего размера, чем уже
    /// занято сессией — тогда свободно 0.
    pub fn query_available_swap(&self) -> Result<u64> {
        let dev = self.swap_target.ok_or(SnapError::NoDevice)?;
        let area = self.shared.swaps.lookup(dev)?;
        let claimed = self.claimed_swap_pages();
        Ok(area.total_pages.saturating_sub(claimed) * PAGE_SIZE)
    }

    /// Занять одну свободную страницу; возвращает байтовый оффсет в области.
    ///
    /// NoDevice без target; OutOfSpace, когда свободных страниц нет. Bitmap
    /// создаётся лениво по числу свободных страниц области при первом вызове.
    pub fn allocate_swap_page(&mut self) -> Result<u64> {
        let dev = self.swap_target.ok_or(SnapError::NoDevice)?;
        if self.bitmap.is_none() {
            let area = self.shared.swaps.lookup(dev)?;
            self.bitmap = Some(PageBitmap::new(area.total_pages));
        }
        let idx = self
            .bitmap
            .as_mut()
            .expect("bitmap created above")
            .allocate()?;
        record_swap_alloc();
        Ok(idx * PAGE_SIZE)
    }

    /// Освободить все занятые страницы и уничтожить bitmap. Идемпотентно;
    /// target сохраняется (следующая аллокация пересоздаст bitmap).
    pub fn free_swap_pages(&mut self) {
        if let Some(mut bm) = self.bitmap.take() {
            let freed = bm.clear_all();
            if freed > 0 {
                record_swap_free(freed);
            }
            debug!("freed {} swap pages", freed);
        }
    }

    // ----------------- close -----------------

    /// Закрыть сессию. Безусловно разматывает состояние: thaw при
    /// замороженном состоянии, буферы образа, занятые swap-страницы, слот.
    /// С точки зрения клиента не может отказать.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.frozen {
            self.quiesce.thaw_tasks();
            self.quiesce.resume_contexts();
            self.frozen = false;
            crate::metrics::record_thaw();
        }
        self.engine.free();
        self.image_ready = false;
        self.free_swap_pages();

        self.shared.available.store(true, Ordering::SeqCst);
        info!("session closed, slot released");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
