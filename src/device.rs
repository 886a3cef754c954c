//! device — единственная привилегированная точка входа подсистемы снапшотов.
//!
//! SnapshotDevice владеет:
//! - слотом доступности (явный семафор: AtomicBool; одна сессия на endpoint);
//! - неблокирующим локом низкоэнергетического перехода (try_lock, без очереди);
//! - реестром swap-областей и конфигурацией.
//!
//! Никаких скрытых процессных синглтонов: тесты строят приватные endpoint'ы.
//! Открытие в режиме ReadWrite отвергается сразу (InvalidArgument).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::config::SnapConfig;
use crate::engine::{ImageEngine, MemImageEngine};
use crate::error::{Result, SnapError};
use crate::platform::{MockPlatform, Platform};
use crate::quiesce::{InProcQuiesce, QuiesceService};
use crate::session::Session;
use crate::swap::SwapRegistry;

/// Режим открытия endpoint'а.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    WriteOnly,
    /// Отвергается сразу: endpoint односторонний.
    ReadWrite,
}

/// Режим доступа открытой сессии. Фиксируется на open и не меняется.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Сторона захвата: образ читается наружу.
    ReadOnly,
    /// Сторона восстановления: образ загружается внутрь.
    WriteOnly,
}

/// Разделяемое состояние endpoint'а (живёт, пока жива сессия или сам endpoint).
pub struct DeviceShared {
    pub(crate) cfg: SnapConfig,
    /// true = слот свободен.
    pub(crate) available: AtomicBool,
    /// Лок low-power перехода. Берётся ТОЛЬКО try_lock'ом.
    pub(crate) transition: Mutex<()>,
    pub(crate) swaps: SwapRegistry,
}

/// Набор коллабораторов сессии (инжектируется в тестах).
pub struct SessionDeps {
    pub quiesce: Box<dyn QuiesceService>,
    pub platform: Box<dyn Platform>,
    pub engine: Box<dyn ImageEngine>,
}

impl SessionDeps {
    /// In-process коллабораторы по конфигу endpoint'а.
    pub fn default_for(cfg: &SnapConfig) -> Self {
        Self {
            quiesce: Box::new(InProcQuiesce::new()),
            platform: Box::new(MockPlatform::new()),
            engine: Box::new(MemImageEngine::new(cfg.mem_pages)),
        }
    }
}

/// Endpoint подсистемы снапшотов.
pub struct SnapshotDevice {
    shared: Arc<DeviceShared>,
}

impl SnapshotDevice {
    pub fn new(cfg: SnapConfig) -> Self {
        Self {
            shared: Arc::new(DeviceShared {
                cfg,
                available: AtomicBool::new(true),
                transition: Mutex::new(()),
                swaps: SwapRegistry::new(),
            }),
        }
    }

    /// Endpoint с конфигом из окружения (PF_*).
    pub fn from_env() -> Self {
        Self::new(SnapConfig::from_env())
    }

    pub fn config(&self) -> &SnapConfig {
        &self.shared.cfg
    }

    /// Зарегистрировать swap-область (id → число страниц).
    pub fn register_swap(&self, id: u32, total_pages: u64) {
        self.shared.swaps.register(id, total_pages);
    }

    /// Открыть сессию с in-process коллабораторами.
    pub fn open(&self, mode: OpenMode) -> Result<Session> {
        let deps = SessionDeps::default_for(&self.shared.cfg);
        self.open_with(mode, deps)
    }

    /// Открыть сессию с инжектированными коллабораторами.
    ///
    /// Busy, если слот уже занят; InvalidArgument для ReadWrite. В режиме
    /// чтения swap target выводится из сконфигурированного resume-устройства.
    pub fn open_with(&self, mode: OpenMode, deps: SessionDeps) -> Result<Session> {
        let access = match mode {
            OpenMode::ReadOnly => AccessMode::ReadOnly,
            OpenMode::WriteOnly => AccessMode::WriteOnly,
            OpenMode::ReadWrite => {
                return Err(SnapError::InvalidArgument(
                    "read-write open is not supported".into(),
                ))
            }
        };

        if self
            .shared
            .available
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SnapError::Busy);
        }

        // В режиме чтения target берём из resume-устройства, если оно задано
        // и зарегистрировано; иначе оставляем пустым.
        let mut swap_target = None;
        if access == AccessMode::ReadOnly {
            if let Some(dev) = self.shared.cfg.resume_device {
                if self.shared.swaps.contains(dev) {
                    swap_target = Some(dev);
                } else {
                    warn!("resume device {} not registered, swap target unset", dev);
                }
            }
        }

        info!("session opened ({:?})", access);
        Ok(Session::new(
            self.shared.clone(),
            access,
            swap_target,
            deps,
            self.shared.cfg.default_image_size_hint,
        ))
    }

    /// Слот свободен (нет открытой сессии).
    pub fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    /// Подержать лок перехода (симуляция контензии в тестах).
    /// Возвращает guard; пока он жив, EnterLowPowerAndReturn отвечает Busy.
    pub fn hold_transition_lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.shared.transition.lock().unwrap()
    }
}
