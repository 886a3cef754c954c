#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;

// Коллабораторы контроллера
pub mod quiesce;  // src/quiesce.rs — остановка «всего остального»
pub mod platform; // src/platform.rs — устройства + low-power переходы
pub mod engine;   // src/engine/{mod,image}.rs — движок образа памяти
pub mod swap;     // src/swap/{mod,bitmap}.rs — аллокатор swap-страниц

// Контроллер и поверхность команд
pub mod device;   // endpoint: слот доступности + лок перехода
pub mod session;  // src/session/{mod,ops,stream}.rs — машина состояний
pub mod ctl;      // командная поверхность (ioctl-аналог)

// CLI
pub mod cli;

// Удобные реэкспорты
pub use config::SnapConfig;
pub use device::{AccessMode, OpenMode, SessionDeps, SnapshotDevice};
pub use engine::{CapturePoint, ImageEngine, MemImageEngine};
pub use error::{Result, SnapError};
pub use session::Session;
