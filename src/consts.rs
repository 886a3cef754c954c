//! Общие константы подсистемы снапшотов (образ, swap, команды).

// -------- Pages --------
/// Размер страницы (байты). Единый для памяти, образа и swap-областей.
pub const PAGE_SIZE: u64 = 4096;

// -------- Image format --------
/// Магия заголовка образа (LE-кодек, см. engine/image.rs).
pub const IMAGE_MAGIC: &[u8; 8] = b"PFIMG001";
/// Версия формата образа.
pub const IMAGE_VER: u32 = 1;
/// Заголовок образа: [magic8][ver u32][page_size u32][n_pages u64] = 24 B.
pub const IMAGE_HDR_SIZE: usize = 24;
/// Заголовок записи страницы: [page_index u64][crc32 u32] = 12 B.
pub const IMAGE_PAGE_HDR_SIZE: usize = 12;

// -------- Command surface --------
/// Верхняя граница пространства команд (см. ctl.rs). Коды выше — InvalidArgument.
pub const CMD_MAX: u32 = 11;
