//! quiesce — сервис глобальной остановки «всего остального».
//!
//! Протокол Freeze (см. session/ops.rs):
//! 1) stop_contexts() — остановить прочие контексты исполнения;
//! 2) freeze_tasks() — остановить все прочие планируемые задачи; может
//!    отказать (Busy) — тогда контексты обязаны быть возвращены ДО выхода.
//!
//! Unfreeze — в обратном порядке: thaw_tasks(), затем resume_contexts().
//!
//! InProcQuiesce — in-process реализация с разделяемым зондом (QuiesceProbe):
//! тесты наблюдают состояние и инжектируют отказ freeze_tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SnapError};

/// Граница «остановить/возобновить всё прочее исполнение».
pub trait QuiesceService: Send {
    fn stop_contexts(&mut self) -> Result<()>;
    fn resume_contexts(&mut self);
    /// Может отказать (Busy) — например, задача не хочет останавливаться.
    fn freeze_tasks(&mut self) -> Result<()>;
    fn thaw_tasks(&mut self);
}

/// Наблюдаемое состояние квиесенса (атомики; разделяется с тестами).
#[derive(Debug, Default)]
pub struct QuiesceProbe {
    pub contexts_stopped: AtomicBool,
    pub tasks_frozen: AtomicBool,
    /// Инжекция отказа freeze_tasks (для сценариев Busy).
    pub fail_freeze_tasks: AtomicBool,
}

impl QuiesceProbe {
    pub fn contexts_stopped(&self) -> bool {
        self.contexts_stopped.load(Ordering::SeqCst)
    }

    pub fn tasks_frozen(&self) -> bool {
        self.tasks_frozen.load(Ordering::SeqCst)
    }

    pub fn set_fail_freeze_tasks(&self, on: bool) {
        self.fail_freeze_tasks.store(on, Ordering::SeqCst);
    }
}

/// In-process реализация квиесенса.
pub struct InProcQuiesce {
    probe: Arc<QuiesceProbe>,
}

impl InProcQuiesce {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(QuiesceProbe::default()),
        }
    }

    pub fn with_probe(probe: Arc<QuiesceProbe>) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> Arc<QuiesceProbe> {
        self.probe.clone()
    }
}

impl Default for InProcQuiesce {
    fn default() -> Self {
        Self::new()
    }
}

impl QuiesceService for InProcQuiesce {
    fn stop_contexts(&mut self) -> Result<()> {
        self.probe.contexts_stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume_contexts(&mut self) {
        self.probe.contexts_stopped.store(false, Ordering::SeqCst);
    }

    fn freeze_tasks(&mut self) -> Result<()> {
        if self.probe.fail_freeze_tasks.load(Ordering::SeqCst) {
            return Err(SnapError::Busy);
        }
        self.probe.tasks_frozen.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn thaw_tasks(&mut self) {
        self.probe.tasks_frozen.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_failure_leaves_tasks_unfrozen() {
        let mut q = InProcQuiesce::new();
        let probe = q.probe();
        probe.set_fail_freeze_tasks(true);
        q.stop_contexts().unwrap();
        assert!(matches!(q.freeze_tasks(), Err(SnapError::Busy)));
        assert!(!probe.tasks_frozen());
        assert!(probe.contexts_stopped());
        q.resume_contexts();
        assert!(!probe.contexts_stopped());
    }
}
