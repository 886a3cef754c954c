//! Centralized configuration and builder for Permafrost.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - SnapConfig::from_env() reads PF_* env vars; fluent with_* setters
//!   override specific fields.
//!
//! Compatibility flag:
//! - abort_on_suspend_failure: в эталонном поведении отказ suspend устройств
//!   на пути низкоэнергетического перехода логируется, но переход всё равно
//!   продолжается. Флаг позволяет вместо этого прервать переход.

use std::fmt;

/// Top-level configuration for the snapshot device endpoint.
#[derive(Clone, Debug)]
pub struct SnapConfig {
    /// Swap device the ReadOnly (capture) side derives its target from.
    /// Env: PF_RESUME_DEV (default None — target stays unset at open).
    pub resume_device: Option<u32>,

    /// Abort the low-power transition when device suspend fails.
    /// Env: PF_ABORT_ON_SUSPEND_FAIL (default false — report and proceed,
    /// matching the reference sequencing).
    pub abort_on_suspend_failure: bool,

    /// Mock physical memory size in pages for the in-process image engine.
    /// Env: PF_MEM_PAGES (default 64).
    pub mem_pages: u64,

    /// Default target size for the next capture, bytes (0 = unconstrained).
    /// Env: PF_IMAGE_SIZE (default 0).
    pub default_image_size_hint: u64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            resume_device: None,
            abort_on_suspend_failure: false,
            mem_pages: 64,
            default_image_size_hint: 0,
        }
    }
}

impl SnapConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PF_RESUME_DEV") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.resume_device = Some(n);
            }
        }

        if let Ok(v) = std::env::var("PF_ABORT_ON_SUSPEND_FAIL") {
            let s = v.trim().to_ascii_lowercase();
            cfg.abort_on_suspend_failure = s == "1" || s == "true" || s == "on" || s == "yes";
        }

        if let Ok(v) = std::env::var("PF_MEM_PAGES") {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.mem_pages = n;
                }
            }
        }

        if let Ok(v) = std::env::var("PF_IMAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.default_image_size_hint = n;
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_resume_device(mut self, dev: Option<u32>) -> Self {
        self.resume_device = dev;
        self
    }

    pub fn with_abort_on_suspend_failure(mut self, on: bool) -> Self {
        self.abort_on_suspend_failure = on;
        self
    }

    pub fn with_mem_pages(mut self, pages: u64) -> Self {
        self.mem_pages = pages;
        self
    }

    pub fn with_default_image_size_hint(mut self, bytes: u64) -> Self {
        self.default_image_size_hint = bytes;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for SnapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SnapConfig {{ resume_device: {}, abort_on_suspend_failure: {}, mem_pages: {}, default_image_size_hint: {} }}",
            self.resume_device
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.abort_on_suspend_failure,
            self.mem_pages,
            self.default_image_size_hint,
        )
    }
}
