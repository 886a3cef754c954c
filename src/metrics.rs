//! Lightweight global metrics for Permafrost.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Quiesce (freeze/thaw)
//! - Capture / Restore
//! - Swap page allocator
//! - Stream I/O
//! - Low-power transitions

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Quiesce -----
static FREEZES_TOTAL: AtomicU64 = AtomicU64::new(0);
static THAWS_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- Capture / Restore -----
static CAPTURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static RESTORES_TOTAL: AtomicU64 = AtomicU64::new(0);
static IMAGES_FREED: AtomicU64 = AtomicU64::new(0);

// ----- Swap allocator -----
static SWAP_PAGES_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static SWAP_PAGES_FREED: AtomicU64 = AtomicU64::new(0);

// ----- Stream I/O -----
static STREAM_BYTES_READ: AtomicU64 = AtomicU64::new(0);
static STREAM_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);

// ----- Low power -----
static LOWPOWER_CYCLES: AtomicU64 = AtomicU64::new(0);
static DEVICE_SUSPEND_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub freezes_total: u64,
    pub thaws_total: u64,

    pub captures_total: u64,
    pub restores_total: u64,
    pub images_freed: u64,

    pub swap_pages_allocated: u64,
    pub swap_pages_freed: u64,

    pub stream_bytes_read: u64,
    pub stream_bytes_written: u64,

    pub lowpower_cycles: u64,
    pub device_suspend_failures: u64,
}

// ----- Recorders (Quiesce) -----
pub fn record_freeze() {
    FREEZES_TOTAL.fetch_add(1, Ordering::Relaxed);
}
pub fn record_thaw() {
    THAWS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Capture / Restore) -----
pub fn record_capture() {
    CAPTURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}
pub fn record_restore() {
    RESTORES_TOTAL.fetch_add(1, Ordering::Relaxed);
}
pub fn record_image_freed() {
    IMAGES_FREED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Swap) -----
pub fn record_swap_alloc() {
    SWAP_PAGES_ALLOCATED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_swap_free(pages: u64) {
    SWAP_PAGES_FREED.fetch_add(pages, Ordering::Relaxed);
}

// ----- Recorders (Stream I/O) -----
pub fn record_stream_read(bytes: usize) {
    STREAM_BYTES_READ.fetch_add(bytes as u64, Ordering::Relaxed);
}
pub fn record_stream_write(bytes: usize) {
    STREAM_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

// ----- Recorders (Low power) -----
pub fn record_lowpower_cycle() {
    LOWPOWER_CYCLES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_device_suspend_failure() {
    DEVICE_SUSPEND_FAILURES.fetch_add(1, Ordering::Relaxed);
}

/// Снимок всех счётчиков (для CLI status / диагностики).
pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        freezes_total: FREEZES_TOTAL.load(Ordering::Relaxed),
        thaws_total: THAWS_TOTAL.load(Ordering::Relaxed),
        captures_total: CAPTURES_TOTAL.load(Ordering::Relaxed),
        restores_total: RESTORES_TOTAL.load(Ordering::Relaxed),
        images_freed: IMAGES_FREED.load(Ordering::Relaxed),
        swap_pages_allocated: SWAP_PAGES_ALLOCATED.load(Ordering::Relaxed),
        swap_pages_freed: SWAP_PAGES_FREED.load(Ordering::Relaxed),
        stream_bytes_read: STREAM_BYTES_READ.load(Ordering::Relaxed),
        stream_bytes_written: STREAM_BYTES_WRITTEN.load(Ordering::Relaxed),
        lowpower_cycles: LOWPOWER_CYCLES.load(Ordering::Relaxed),
        device_suspend_failures: DEVICE_SUSPEND_FAILURES.load(Ordering::Relaxed),
    }
}
