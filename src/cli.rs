//! CLI подсистемы снапшотов: цикл захвата, восстановление из файла образа,
//! статус метрик и self-test протокола.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::config::SnapConfig;
use crate::device::{OpenMode, SnapshotDevice};
use crate::error::SnapError;
use crate::metrics::metrics_snapshot;

#[derive(Parser, Debug)]
#[command(
    name = "permafrost",
    version,
    about = "Hibernation snapshot session controller"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Полный цикл захвата: open(ro) → freeze → capture → образ в файл → thaw.
    Cycle {
        /// Куда писать образ.
        #[arg(long, default_value = "snapshot.img")]
        out: PathBuf,
    },
    /// Восстановление: open(wo) → образ из файла → freeze → restore.
    Restore {
        /// Файл образа (PFIMG001).
        image: PathBuf,
    },
    /// Счётчики подсистемы.
    Status {
        /// JSON вместо текста.
        #[arg(long)]
        json: bool,
    },
    /// Прогон протокольного сценария на приватном endpoint'е.
    Selftest,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Cycle { out } => cmd_cycle(&out),
        Command::Restore { image } => cmd_restore(&image),
        Command::Status { json } => cmd_status(json),
        Command::Selftest => cmd_selftest(),
    }
}

fn cmd_cycle(out: &PathBuf) -> Result<()> {
    let dev = SnapshotDevice::from_env();
    let mut s = dev.open(OpenMode::ReadOnly).context("open session (ro)")?;

    s.freeze().context("freeze")?;
    let cp = s.capture_atomic().context("capture")?;
    info!(
        "captured {} pages ({} B), restore_point={}",
        cp.pages, cp.bytes, cp.restore_point
    );

    let mut img = Vec::with_capacity(cp.bytes as usize);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = s.stream_read(&mut buf)?;
        if n == 0 {
            break;
        }
        img.extend_from_slice(&buf[..n]);
    }
    s.unfreeze().context("unfreeze")?;
    s.close();

    fs::write(out, &img).with_context(|| format!("write image {}", out.display()))?;
    println!("image written: {} ({} B)", out.display(), img.len());
    Ok(())
}

fn cmd_restore(image: &PathBuf) -> Result<()> {
    let img =
        fs::read(image).with_context(|| format!("read image {}", image.display()))?;

    let dev = SnapshotDevice::from_env();
    let mut s = dev.open(OpenMode::WriteOnly).context("open session (wo)")?;

    for chunk in img.chunks(64 * 1024) {
        let n = s.stream_write(chunk)?;
        if n != chunk.len() {
            return Err(anyhow!("short image write: {} of {}", n, chunk.len()));
        }
    }
    if !s.image_loaded() {
        return Err(anyhow!("image incomplete after {} B", s.offset()));
    }

    s.freeze().context("freeze")?;
    s.restore_atomic().context("restore")?;
    s.close();

    println!("image restored ({} B)", img.len());
    Ok(())
}

fn cmd_status(json: bool) -> Result<()> {
    let m = metrics_snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&m)?);
        return Ok(());
    }
    println!("freezes={} thaws={}", m.freezes_total, m.thaws_total);
    println!(
        "captures={} restores={} images_freed={}",
        m.captures_total, m.restores_total, m.images_freed
    );
    println!(
        "swap alloc={} freed={}",
        m.swap_pages_allocated, m.swap_pages_freed
    );
    println!(
        "stream read={}B written={}B",
        m.stream_bytes_read, m.stream_bytes_written
    );
    println!(
        "lowpower cycles={} suspend_failures={}",
        m.lowpower_cycles, m.device_suspend_failures
    );
    Ok(())
}

fn cmd_selftest() -> Result<()> {
    let dev = SnapshotDevice::new(SnapConfig::default().with_mem_pages(8));
    dev.register_swap(5, 16);

    // Двойное открытие → Busy
    let mut s = dev.open(OpenMode::ReadOnly)?;
    match dev.open(OpenMode::ReadOnly) {
        Err(SnapError::Busy) => {}
        other => return Err(anyhow!("expected Busy on second open, got {:?}", other.err())),
    }

    // Захват до freeze → PermissionDenied
    match s.capture_atomic() {
        Err(SnapError::PermissionDenied) => {}
        _ => return Err(anyhow!("capture before freeze must be denied")),
    }

    s.freeze()?;
    let cp = s.capture_atomic()?;
    if !s.image_ready() {
        return Err(anyhow!("image_ready must be set after capture"));
    }

    // Swap-протокол
    s.set_swap_target(5)
        .map_err(|e| anyhow!("set_swap_target: {}", e))?;
    let off1 = s.allocate_swap_page()?;
    let off2 = s.allocate_swap_page()?;
    if off1 == off2 {
        return Err(anyhow!("duplicate swap page handed out"));
    }
    s.free_swap_pages();

    s.close();
    if !dev.is_available() {
        return Err(anyhow!("slot must be released after close"));
    }

    println!(
        "selftest ok: captured {} pages ({} B), restore_point={}",
        cp.pages, cp.bytes, cp.restore_point
    );
    Ok(())
}
