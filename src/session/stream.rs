//! session/stream — потоковый курсор образа.
//!
//! Чтение отдаёт байты захваченного образа (нужен готовый образ), запись
//! накапливает образ на стороне восстановления (только WriteOnly). Оффсет
//! монотонно растёт и репортится клиенту; ошибки копирования/целостности — Io.

use crate::device::AccessMode;
use crate::error::{Result, SnapError};
use crate::metrics::{record_stream_read, record_stream_write};

use super::Session;

impl Session {
    /// Прочитать очередной кусок образа в buf. Возвращает число байт;
    /// 0 — конец образа. PermissionDenied без готового образа.
    pub fn stream_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.image_ready {
            return Err(SnapError::PermissionDenied);
        }
        let n = self.engine.read(buf)?;
        self.offset += n as u64;
        record_stream_read(n);
        Ok(n)
    }

    /// Дописать кусок образа из buf (сторона восстановления).
    /// PermissionDenied вне режима WriteOnly.
    pub fn stream_write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode() != AccessMode::WriteOnly {
            return Err(SnapError::PermissionDenied);
        }
        let n = self.engine.write(buf)?;
        self.offset += n as u64;
        record_stream_write(n);
        Ok(n)
    }

    /// Полный образ загружен потоковыми записями (готов к restore_atomic).
    pub fn image_loaded(&self) -> bool {
        self.engine.loaded()
    }

    /// Размер образа в движке, байты (0 — образа нет).
    pub fn image_bytes(&self) -> u64 {
        self.engine.image_bytes()
    }
}
