//! swap — Page Allocator Adapter: реестр swap-областей + карта занятых страниц.
//!
//! Реестр знает зарегистрированные области (id → число страниц); сами
//! занятые страницы живут в PageBitmap, которым владеет сессия.
//!
//! Контракт (проверяется контроллером и адаптером):
//! - SetSwapTarget после начала аллокаций → PermissionDenied (target
//!   неизменен, пока существует bitmap);
//! - AllocateSwapPage без target → NoDevice; нет свободной страницы →
//!   OutOfSpace; bitmap создаётся лениво по числу свободных страниц области;
//! - FreeSwapPages освобождает все занятые страницы и уничтожает bitmap,
//!   идемпотентно; target при этом сохраняется.

pub mod bitmap;

pub use bitmap::PageBitmap;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SnapError};

/// Зарегистрированная swap-область.
#[derive(Debug, Clone, Copy)]
pub struct SwapArea {
    pub total_pages: u64,
}

/// Реестр swap-областей (id → область). Разделяется между endpoint'ом и сессией.
pub struct SwapRegistry {
    areas: Mutex<HashMap<u32, SwapArea>>,
}

impl SwapRegistry {
    pub fn new() -> Self {
        Self {
            areas: Mutex::new(HashMap::new()),
        }
    }

    /// Зарегистрировать область. Повторная регистрация того же id перезаписывает размер.
    pub fn register(&self, id: u32, total_pages: u64) {
        let mut g = self.areas.lock().unwrap();
        g.insert(id, SwapArea { total_pages });
    }

    /// Область по id. NoDevice, если не зарегистрирована.
    pub fn lookup(&self, id: u32) -> Result<SwapArea> {
        let g = self.areas.lock().unwrap();
        g.get(&id).copied().ok_or(SnapError::NoDevice)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.areas.lock().unwrap().contains_key(&id)
    }
}

impl Default for SwapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unknown_is_no_device() {
        let reg = SwapRegistry::new();
        assert!(matches!(reg.lookup(7), Err(SnapError::NoDevice)));
        reg.register(7, 32);
        assert_eq!(reg.lookup(7).unwrap().total_pages, 32);
    }
}
