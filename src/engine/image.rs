//! engine/image — сериализованный формат образа памяти (PFIMG001) с CRC.
//!
//! Формат (LE):
//! - Header (24 B):
//!   [magic8="PFIMG001"][ver u32=1][page_size u32][n_pages u64]
//! - Далее n_pages записей:
//!   [page_index u64][crc32 u32][payload page_size B]
//!
//! CRC32 считается по payload страницы; несовпадение на декоде — Io
//! (целостность потока нарушена, образ непригоден для восстановления).

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{IMAGE_HDR_SIZE, IMAGE_MAGIC, IMAGE_PAGE_HDR_SIZE, IMAGE_VER};
use crate::error::{Result, SnapError};

/// Полная длина образа для n_pages страниц размера page_size.
pub fn image_len(page_size: u32, n_pages: u64) -> u64 {
    IMAGE_HDR_SIZE as u64 + n_pages * (IMAGE_PAGE_HDR_SIZE as u64 + page_size as u64)
}

/// Закодировать снимок памяти в образ. Память дополняется нулями до границы страницы.
pub fn encode_image(memory: &[u8], page_size: u32) -> Vec<u8> {
    let ps = page_size as usize;
    let n_pages = ((memory.len() + ps - 1) / ps) as u64;

    let mut out = Vec::with_capacity(image_len(page_size, n_pages) as usize);
    out.extend_from_slice(IMAGE_MAGIC);
    let mut buf4 = [0u8; 4];
    LittleEndian::write_u32(&mut buf4, IMAGE_VER);
    out.extend_from_slice(&buf4);
    LittleEndian::write_u32(&mut buf4, page_size);
    out.extend_from_slice(&buf4);
    let mut buf8 = [0u8; 8];
    LittleEndian::write_u64(&mut buf8, n_pages);
    out.extend_from_slice(&buf8);

    let mut page = vec![0u8; ps];
    for idx in 0..n_pages {
        let start = (idx as usize) * ps;
        let end = (start + ps).min(memory.len());
        page.fill(0);
        page[..end - start].copy_from_slice(&memory[start..end]);

        LittleEndian::write_u64(&mut buf8, idx);
        out.extend_from_slice(&buf8);
        LittleEndian::write_u32(&mut buf4, crc32fast::hash(&page));
        out.extend_from_slice(&buf4);
        out.extend_from_slice(&page);
    }
    out
}

/// Распарсенный заголовок образа.
#[derive(Debug, Clone, Copy)]
pub struct ImageHeader {
    pub page_size: u32,
    pub n_pages: u64,
}

/// Полная длина образа с проверкой переполнения (для недоверенных заголовков).
fn image_len_checked(page_size: u32, n_pages: u64) -> Option<u64> {
    let per_page = (IMAGE_PAGE_HDR_SIZE as u64).checked_add(page_size as u64)?;
    n_pages
        .checked_mul(per_page)?
        .checked_add(IMAGE_HDR_SIZE as u64)
}

/// Проверить магию/версию и прочитать заголовок.
///
/// Заголовок приходит из недоверенного потока: n_pages валидируется так,
/// чтобы полная длина образа не переполняла u64 (иначе Io).
pub fn read_image_header(bytes: &[u8]) -> Result<ImageHeader> {
    if bytes.len() < IMAGE_HDR_SIZE {
        return Err(SnapError::Io("image shorter than header".into()));
    }
    if &bytes[0..8] != IMAGE_MAGIC {
        return Err(SnapError::Io("bad image magic".into()));
    }
    let ver = LittleEndian::read_u32(&bytes[8..12]);
    if ver != IMAGE_VER {
        return Err(SnapError::Io(format!("unsupported image version {}", ver)));
    }
    let page_size = LittleEndian::read_u32(&bytes[12..16]);
    if page_size == 0 {
        return Err(SnapError::Io("zero page_size in image header".into()));
    }
    let n_pages = LittleEndian::read_u64(&bytes[16..24]);
    if image_len_checked(page_size, n_pages).is_none() {
        return Err(SnapError::Io(format!(
            "implausible page count {} in image header",
            n_pages
        )));
    }
    Ok(ImageHeader { page_size, n_pages })
}

/// Декодировать образ обратно в линейную память, проверяя CRC каждой страницы.
pub fn decode_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let hdr = read_image_header(bytes)?;
    let ps = hdr.page_size as usize;
    let expected = image_len(hdr.page_size, hdr.n_pages);
    if bytes.len() as u64 != expected {
        return Err(SnapError::Io(format!(
            "image length mismatch: got {}, expected {}",
            bytes.len(),
            expected
        )));
    }

    let mut memory = vec![0u8; ps * hdr.n_pages as usize];
    let mut pos = IMAGE_HDR_SIZE;
    for i in 0..hdr.n_pages {
        let idx = LittleEndian::read_u64(&bytes[pos..pos + 8]);
        let stored_crc = LittleEndian::read_u32(&bytes[pos + 8..pos + 12]);
        pos += IMAGE_PAGE_HDR_SIZE;
        let payload = &bytes[pos..pos + ps];
        pos += ps;

        if idx != i {
            return Err(SnapError::Io(format!(
                "image page order violated: got index {}, expected {}",
                idx, i
            )));
        }
        if crc32fast::hash(payload) != stored_crc {
            return Err(SnapError::Io(format!("crc mismatch at page {}", idx)));
        }
        let off = (idx as usize) * ps;
        memory[off..off + ps].copy_from_slice(payload);
    }
    Ok(memory)
}
