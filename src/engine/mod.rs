//! engine — Memory Image Engine: захват/восстановление памяти + потоковый курсор.
//!
//! Контроллер работает с движком через трейт ImageEngine:
//! - capture(hint) — сериализовать память в образ (handle для чтения);
//! - read/write    — потоковый курсор поверх байтов образа;
//! - loaded()      — полный образ загружен потоковыми записями;
//! - restore()     — декодировать загруженный образ и заменить им память;
//! - free()        — сбросить буферы и курсор.
//!
//! MemImageEngine — in-process движок поверх разделяемой «физической памяти»
//! (Arc<Mutex<Vec<u8>>>). На реальном железе restore не возвращает управление
//! на успешном пути; для in-process движка это задокументированное
//! ограничение — успешный restore возвращает Ok после замены памяти.

pub mod image;

use std::sync::{Arc, Mutex};

use log::debug;

use crate::consts::PAGE_SIZE;
use crate::error::{Result, SnapError};

use image::{decode_image, encode_image, image_len, read_image_header};

/// Итог атомарного захвата.
#[derive(Debug, Clone, Copy)]
pub struct CapturePoint {
    /// Аналог in_suspend: эта точка исполнения — сама точка восстановления.
    pub restore_point: bool,
    pub pages: u64,
    pub bytes: u64,
}

/// Граница движка образа памяти.
pub trait ImageEngine: Send {
    /// Захватить полный образ памяти. hint — целевой размер (0 = без ограничений).
    fn capture(&mut self, size_hint: u64) -> Result<CapturePoint>;

    /// Восстановить память из загруженного образа. Io, если образ неполон
    /// или целостность нарушена.
    fn restore(&mut self) -> Result<()>;

    /// Прочитать очередные байты образа в buf. 0 = конец образа.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Дописать байты образа из buf (сторона восстановления).
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Полный образ загружен потоковыми записями.
    fn loaded(&self) -> bool;

    /// Сбросить буферы и курсор. Идемпотентно.
    fn free(&mut self);

    /// Размер захваченного/загруженного образа в байтах (0 — образа нет).
    fn image_bytes(&self) -> u64;
}

/// In-process движок поверх разделяемой памяти.
pub struct MemImageEngine {
    memory: Arc<Mutex<Vec<u8>>>,
    /// Захваченный или полностью загруженный образ.
    image: Option<Vec<u8>>,
    /// Курсор чтения по image.
    read_pos: usize,
    /// Staging потоковой загрузки (сторона записи).
    staging: Vec<u8>,
}

impl MemImageEngine {
    /// Движок с собственной памятью из mem_pages страниц (детерминированный паттерн).
    pub fn new(mem_pages: u64) -> Self {
        let len = (mem_pages * PAGE_SIZE) as usize;
        let mem: Vec<u8> = (0..len).map(|i| (i % 255) as u8).collect();
        Self::with_memory(Arc::new(Mutex::new(mem)))
    }

    /// Движок поверх внешней (разделяемой) памяти — для тестов.
    pub fn with_memory(memory: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            memory,
            image: None,
            read_pos: 0,
            staging: Vec::new(),
        }
    }

    pub fn memory(&self) -> Arc<Mutex<Vec<u8>>> {
        self.memory.clone()
    }

    /// Ожидаемая полная длина загружаемого образа, если заголовок уже виден.
    fn staged_expected_len(&self) -> Option<u64> {
        let hdr = read_image_header(&self.staging).ok()?;
        Some(image_len(hdr.page_size, hdr.n_pages))
    }
}

impl ImageEngine for MemImageEngine {
    fn capture(&mut self, size_hint: u64) -> Result<CapturePoint> {
        let mem = self.memory.lock().unwrap();
        if size_hint > 0 {
            // Hint — advisory: усечение памяти in-process движок не моделирует.
            debug!(
                "capture: image size hint {} B (memory {} B)",
                size_hint,
                mem.len()
            );
        }
        let img = encode_image(&mem, PAGE_SIZE as u32);
        let pages = (mem.len() as u64 + PAGE_SIZE - 1) / PAGE_SIZE;
        let bytes = img.len() as u64;
        self.image = Some(img);
        self.read_pos = 0;
        Ok(CapturePoint {
            restore_point: true,
            pages,
            bytes,
        })
    }

    fn restore(&mut self) -> Result<()> {
        if !self.loaded() {
            return Err(SnapError::Io("no complete image loaded".into()));
        }
        let img = self.image.take().unwrap_or_else(|| {
            // loaded()==true при полном staging — переносим его в image.
            std::mem::take(&mut self.staging)
        });
        let restored = decode_image(&img)?;
        let mut mem = self.memory.lock().unwrap();
        let n = restored.len().min(mem.len());
        mem[..n].copy_from_slice(&restored[..n]);
        debug!("restore: {} B written back into memory", n);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let img = match &self.image {
            Some(i) => i,
            None => return Err(SnapError::Io("no captured image to read".into())),
        };
        let left = img.len().saturating_sub(self.read_pos);
        let n = left.min(buf.len());
        buf[..n].copy_from_slice(&img[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if let Some(expected) = self.staged_expected_len() {
            if self.staging.len() as u64 >= expected {
                return Err(SnapError::Io("image already fully loaded".into()));
            }
            let room = (expected - self.staging.len() as u64) as usize;
            let n = room.min(buf.len());
            self.staging.extend_from_slice(&buf[..n]);
            return Ok(n);
        }
        // Заголовок ещё не полон — принимаем всё и валидируем магию, когда он виден.
        self.staging.extend_from_slice(buf);
        if self.staging.len() >= crate::consts::IMAGE_HDR_SIZE {
            read_image_header(&self.staging)?;
        }
        Ok(buf.len())
    }

    fn loaded(&self) -> bool {
        if self.image.is_some() {
            return true;
        }
        match self.staged_expected_len() {
            Some(expected) => self.staging.len() as u64 == expected,
            None => false,
        }
    }

    fn free(&mut self) {
        self.image = None;
        self.staging.clear();
        self.read_pos = 0;
    }

    fn image_bytes(&self) -> u64 {
        if let Some(i) = &self.image {
            return i.len() as u64;
        }
        self.staging.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_then_stream_read_full_image() {
        let mut e = MemImageEngine::new(2);
        let cp = e.capture(0).unwrap();
        assert!(cp.restore_point);
        assert_eq!(cp.pages, 2);

        let mut out = Vec::new();
        let mut buf = [0u8; 300];
        loop {
            let n = e.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out.len() as u64, cp.bytes);
        read_image_header(&out).unwrap();
    }

    #[test]
    fn streamed_write_becomes_loaded_then_restores() {
        let mem = Arc::new(Mutex::new(vec![0x5Au8; PAGE_SIZE as usize]));
        let img = encode_image(&mem.lock().unwrap().clone(), PAGE_SIZE as u32);

        // Память «ушла» от снимка
        mem.lock().unwrap().fill(0x00);

        let mut e = MemImageEngine::with_memory(mem.clone());
        for chunk in img.chunks(100) {
            let n = e.write(chunk).unwrap();
            assert_eq!(n, chunk.len());
        }
        assert!(e.loaded());
        e.restore().unwrap();
        assert!(mem.lock().unwrap().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn restore_without_image_fails() {
        let mut e = MemImageEngine::new(1);
        assert!(matches!(e.restore(), Err(SnapError::Io(_))));
    }

    #[test]
    fn bad_magic_rejected_early() {
        let mut e = MemImageEngine::new(1);
        let garbage = vec![0u8; 64];
        assert!(matches!(e.write(&garbage), Err(SnapError::Io(_))));
    }

    #[test]
    fn free_resets_cursor_and_buffers() {
        let mut e = MemImageEngine::new(1);
        e.capture(0).unwrap();
        assert!(e.image_bytes() > 0);
        e.free();
        assert_eq!(e.image_bytes(), 0);
        assert!(!e.loaded());
        let mut buf = [0u8; 8];
        assert!(e.read(&mut buf).is_err());
    }
}
