//! swap/bitmap — битовая карта занятых страниц swap-области.
//!
//! Модель «арена + индекс»: бит-сет фиксированной ёмкости, адресуемый
//! индексом страницы.
//! - allocate = find-first-clear (строго возрастающие индексы до первого free);
//! - free = сброс всех бит, занятых сессией.
//!
//! Владелец — Session; карта создаётся лениво при первой аллокации и
//! уничтожается на FreeSwapPages/Close.

use crate::error::{Result, SnapError};

/// Fixed-capacity bitset over u64 words.
pub struct PageBitmap {
    words: Vec<u64>,
    capacity: u64,
    claimed: u64,
}

impl PageBitmap {
    /// Карта на `capacity` страниц, все свободны.
    pub fn new(capacity: u64) -> Self {
        let nwords = ((capacity + 63) / 64) as usize;
        Self {
            words: vec![0u64; nwords],
            capacity,
            claimed: 0,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Число занятых страниц.
    pub fn claimed(&self) -> u64 {
        self.claimed
    }

    pub fn is_set(&self, idx: u64) -> bool {
        if idx >= self.capacity {
            return false;
        }
        (self.words[(idx / 64) as usize] >> (idx % 64)) & 1 == 1
    }

    /// Занять первую свободную страницу. OutOfSpace, если свободных нет.
    pub fn allocate(&mut self) -> Result<u64> {
        for (w, word) in self.words.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }
            let bit = (!*word).trailing_zeros() as u64;
            let idx = (w as u64) * 64 + bit;
            if idx >= self.capacity {
                break;
            }
            *word |= 1u64 << bit;
            self.claimed += 1;
            return Ok(idx);
        }
        Err(SnapError::OutOfSpace)
    }

    /// Сбросить все занятые биты. Возвращает число освобождённых страниц.
    pub fn clear_all(&mut self) -> u64 {
        let freed = self.claimed;
        for w in self.words.iter_mut() {
            *w = 0;
        }
        self.claimed = 0;
        freed
    }
}
